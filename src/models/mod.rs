//! Core data models for stup
//!
//! Domain records shared by the shell layer and the deployment pipeline:
//! the shell process lifecycle and the project / target / repository
//! configuration a run is bound to.

pub mod project;
pub mod shell_process;

// Re-exports for convenience
pub use project::{repos_for, BranchRule, Project, ProjectType, Repo, SshConfig, Target};
pub use shell_process::{ShellProcess, ShellState};
