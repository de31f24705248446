//! stup - deploy git repositories to FTP targets with git-ftp
//!
//! All external tools (`git`, `git-ftp`, `ssh-agent`, `ssh-add`) are driven
//! through one long-lived shell instead of one process per command. The
//! library has two layers:
//!
//! - [`shell`] - the Shell Session Channel: spawns the shell, frames its
//!   output into lines and correlates them with the one outstanding request.
//!   [`shell::ShellSession::run`] wraps a command in unique BEGIN/END
//!   markers and returns its output together with the exit status.
//! - [`deploy`] - the pipeline: clean and branch checks, protection gate,
//!   key loading, version stamp, upload with output classification, commit
//!   history with hints, and tag update. The first unrecoverable failure
//!   aborts the run.
//!
//! Supporting modules:
//!
//! - [`config`] - TOML/JSON configuration and its loader
//! - [`models`] - projects, targets, repositories, shell process lifecycle
//! - [`prompt`] - confirmations and menus, scriptable for non-interactive runs
//! - [`mod@error`] - error type, error kinds and exit codes
//!
//! ## Quick Start
//!
//! ```no_run
//! use stup::config::ConfigLoader;
//! use stup::deploy::DeployPlan;
//! use stup::prompt::FixedPrompt;
//!
//! # async fn example() -> stup::Result<()> {
//! let config = ConfigLoader::new().load(None)?;
//! let project = config.project("homepage")?;
//! let target = project.target("live").ok_or("no live target")?;
//! let plan = DeployPlan::new("homepage", project, "live", target, &config.deploy.custom_folder);
//!
//! let report = stup::deploy(&config, &plan, true, &FixedPrompt::new(true)).await?;
//! for hint in report.hints() {
//!     println!("{}: {}", hint.repo, hint.text);
//! }
//! # Ok(())
//! # }
//! ```

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod deploy;
pub mod error;
pub mod models;
pub mod prompt;
pub mod shell;

// Re-exports for core functionality
pub use config::{Config, ConfigLoader, InitPolicy};
pub use deploy::{DeployOptions, DeployPlan, DeployReport, Deployment};
pub use error::{Error, ErrorKind, Result};
pub use shell::{CommandChannel, ShellSession};

use prompt::Prompt;

/// The current version of stup from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Tools a deployment shells out to
pub const REQUIRED_TOOLS: &[&str] = &["git", "git-ftp", "ssh-agent", "ssh-add"];

/// Required tools that cannot be found in `PATH`
pub fn missing_tools() -> Vec<&'static str> {
    REQUIRED_TOOLS
        .iter()
        .copied()
        .filter(|tool| shell::find_in_path(tool).is_none())
        .collect()
}

/// Deploy `plan` through a fresh shell session.
///
/// The session is shut down afterwards whether or not the deployment
/// succeeded. An ssh-agent started by the run is stopped before that, or by
/// the final command of the shutdown when the shell stopped answering.
pub async fn deploy(
    config: &Config,
    plan: &DeployPlan,
    assume_yes: bool,
    prompt: &dyn Prompt,
) -> Result<DeployReport> {
    info!("🚀 {} v{}", NAME, VERSION);

    let mut session = ShellSession::spawn(&config.shell).await?;
    let options = DeployOptions::new(config.deploy.clone(), assume_yes);

    let mut deployment = Deployment::new(&session, prompt, options);
    let result = deployment.execute(plan).await;
    let final_command = deployment.cleanup_command();

    match session.shutdown(final_command.as_deref()).await {
        Ok(Some(0)) | Ok(None) => {}
        Ok(Some(code)) => debug!("Shell exited with status {}", code),
        Err(e) => warn!("Failed to shut down shell session: {}", e),
    }

    result
}
