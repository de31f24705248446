//! Command Channel Abstraction
//!
//! Deployment steps talk to the shell only through [`CommandChannel`], so
//! they can be exercised against a scripted double instead of a real
//! subprocess.

use crate::error::Result;
use crate::shell::{CommandOutput, Response, ResponseMode, ResponsePattern, ShellSession};
use async_trait::async_trait;

/// Operations the deployment pipeline needs from a shell
///
/// Implementations keep at most one response outstanding at a time.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Write a command line without waiting for any output
    ///
    /// # Errors
    /// Returns an error if the shell input is closed
    fn send(&self, command: &str) -> Result<()>;

    /// Wait for the next output line matching `pattern`
    ///
    /// # Errors
    /// Fails with `RequestPending` if another response is awaited, with
    /// `ResponseTimeout` if nothing matches in time, and with
    /// `SessionClosed` if the shell goes away first
    async fn await_response(&self, pattern: ResponsePattern, mode: ResponseMode)
        -> Result<Response>;

    /// Run a command to completion and return its output and exit status
    ///
    /// # Errors
    /// Same as [`CommandChannel::await_response`], except that running out
    /// of time is `CommandTimeout` naming the command, plus
    /// `MalformedResponse` when the output cannot be delimited
    async fn run(&self, command: &str) -> Result<CommandOutput>;
}

#[async_trait]
impl CommandChannel for ShellSession {
    fn send(&self, command: &str) -> Result<()> {
        ShellSession::send(self, command)
    }

    async fn await_response(
        &self,
        pattern: ResponsePattern,
        mode: ResponseMode,
    ) -> Result<Response> {
        ShellSession::await_response(self, pattern, mode).await
    }

    async fn run(&self, command: &str) -> Result<CommandOutput> {
        ShellSession::run(self, command).await
    }
}
