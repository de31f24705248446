//! Test Utilities and Mocks
//!
//! Shared helpers for the stup integration tests. Each test binary pulls
//! this in with `#[path]`, so not every helper is used everywhere.

#![allow(dead_code, unused_imports)]

pub mod fixtures;

// Re-exports for convenience
pub use fixtures::{
    create_sh_config, create_test_config, create_test_options, create_test_project,
    create_test_target, git_repo_plan, stubegru_plan,
};
pub use scripted_channel::{ChannelCall, ScriptedChannel};

#[cfg(unix)]
pub use fixtures::write_fake_tool;
