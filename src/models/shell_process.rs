//! Shell Process Model
//!
//! Lifecycle record of the one shell a deployment run drives. The I/O side
//! lives in [`crate::shell`]; this only tracks whether the shell is still
//! up and how it ended.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Where the shell is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    /// Spawned and accepting input
    Running,
    /// Gone; `code` is `None` when it was killed by a signal
    Exited { code: Option<i32> },
}

/// Lifecycle record of the shell subprocess
#[derive(Debug, Clone)]
pub struct ShellProcess {
    /// Shell program
    pub program: String,
    /// Arguments passed to the shell
    pub args: Vec<String>,
    /// OS process id, if the platform reported one
    pub pid: Option<u32>,
    /// Current state
    pub state: ShellState,
    /// When the shell was spawned
    pub started_at: DateTime<Utc>,
}

impl ShellProcess {
    /// Record a shell that has just been spawned
    pub fn started(program: &str, args: &[String], pid: Option<u32>) -> Self {
        Self {
            program: program.to_string(),
            args: args.to_vec(),
            pid,
            state: ShellState::Running,
            started_at: Utc::now(),
        }
    }

    pub fn mark_terminated(&mut self, code: Option<i32>) {
        self.state = ShellState::Exited { code };
    }

    pub fn is_running(&self) -> bool {
        self.state == ShellState::Running
    }

    pub fn is_terminated(&self) -> bool {
        !self.is_running()
    }

    /// Time since the shell was spawned
    pub fn uptime(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

impl std::fmt::Display for ShellProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        if let Some(pid) = self.pid {
            write!(f, " pid {}", pid)?;
        }
        match self.state {
            ShellState::Running => write!(f, ", running"),
            ShellState::Exited { code: Some(code) } => write!(f, ", exited with {}", code),
            ShellState::Exited { code: None } => write!(f, ", killed"),
        }
    }
}
