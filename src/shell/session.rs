//! Shell session
//!
//! Owns the one interactive shell of a run. Commands go in through
//! [`ShellSession::send`]; a background pump frames the output into lines
//! and feeds them to the session's [`Correlator`], which resolves whatever
//! request is currently waiting.

use std::sync::Arc;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use super::correlator::{Correlator, Registration, Response, ResponseMode, ResponsePattern};
use super::framing::LineFramer;
use super::marker::{CommandMarker, CommandOutput};
use super::process::{spawn_shell_process, SpawnConfig, SpawnedShell};
use super::streams::{OutputChunk, StreamStats};
use crate::config::ShellConfig;
use crate::error::{Error, Result};
use crate::models::ShellProcess;

/// One long-lived shell with request/response correlation
pub struct ShellSession {
    input: Option<UnboundedSender<Vec<u8>>>,
    correlator: Arc<Mutex<Correlator>>,
    pump: Option<JoinHandle<StreamStats>>,
    child: Option<Child>,
    process: ShellProcess,
    response_timeout: Duration,
    shutdown_timeout: Duration,
}

impl ShellSession {
    /// Spawn the configured shell and start pumping its output
    pub async fn spawn(config: &ShellConfig) -> Result<Self> {
        let SpawnedShell {
            process,
            child,
            streams,
        } = spawn_shell_process(&SpawnConfig::from(config)).await?;
        let (output_rx, input_tx) = streams.into_parts();

        let correlator = Arc::new(Mutex::new(Correlator::new()));
        let framer = LineFramer::new(config.framing, config.max_line_bytes);
        let pump = tokio::spawn(pump_output(output_rx, framer, Arc::clone(&correlator)));

        info!("🐚 Shell session started ({})", process);

        Ok(Self {
            input: Some(input_tx),
            correlator,
            pump: Some(pump),
            child: Some(child),
            process,
            response_timeout: Duration::from_secs(config.response_timeout_secs),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        })
    }

    /// Write `command` plus a newline to the shell. Does not wait for anything.
    pub fn send(&self, command: &str) -> Result<()> {
        let input = self.input.as_ref().ok_or_else(|| Error::ShellInputSendFailed {
            reason: "session has been shut down".to_string(),
        })?;

        debug!("$ {}", command);
        let mut data = Vec::with_capacity(command.len() + 1);
        data.extend_from_slice(command.as_bytes());
        data.push(b'\n');
        input.send(data).map_err(|e| Error::ShellInputSendFailed {
            reason: e.to_string(),
        })
    }

    /// Wait for the next line matching `pattern`, bounded by the configured timeout
    pub async fn await_response(
        &self,
        pattern: ResponsePattern,
        mode: ResponseMode,
    ) -> Result<Response> {
        self.await_response_within(pattern, mode, self.response_timeout)
            .await
    }

    /// Wait for the next line matching `pattern`, bounded by `limit`
    pub async fn await_response_within(
        &self,
        pattern: ResponsePattern,
        mode: ResponseMode,
        limit: Duration,
    ) -> Result<Response> {
        let registration = self.correlator.lock().await.register(pattern, mode)?;
        self.wait(registration, limit).await
    }

    /// Register for a response, then send `command`, so the response cannot
    /// arrive before anyone is listening
    pub async fn request(
        &self,
        command: &str,
        pattern: ResponsePattern,
        mode: ResponseMode,
    ) -> Result<Response> {
        let registration = self.correlator.lock().await.register(pattern, mode)?;
        if let Err(e) = self.send(command) {
            self.correlator.lock().await.cancel(registration.id);
            return Err(e);
        }
        self.wait(registration, self.response_timeout).await
    }

    /// Run `command` framed by unique markers and collect its output and exit status
    pub async fn run(&self, command: &str) -> Result<CommandOutput> {
        if command.trim().is_empty() {
            return Err(Error::EmptyCommand);
        }

        let marker = CommandMarker::new();
        let response = self
            .request(&marker.wrap(command), marker.end_pattern(), ResponseMode::Collect)
            .await
            .map_err(|e| match e {
                Error::ResponseTimeout { duration, .. } => Error::CommandTimeout {
                    command: command.to_string(),
                    duration,
                },
                other => other,
            })?;
        let output = marker.parse(command, response.into_lines())?;
        debug!(
            "'{}' exited with {} ({} line(s))",
            command,
            output.status,
            output.lines.len()
        );
        Ok(output)
    }

    async fn wait(&self, registration: Registration, limit: Duration) -> Result<Response> {
        let Registration {
            id,
            pattern,
            receiver,
        } = registration;

        match timeout(limit, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::SessionClosed {
                pattern: pattern.to_string(),
            }),
            Err(_) => {
                self.correlator.lock().await.cancel(id);
                Err(Error::ResponseTimeout {
                    pattern: pattern.to_string(),
                    duration: limit,
                })
            }
        }
    }

    /// Lifecycle record of the shell process
    pub fn process(&self) -> &ShellProcess {
        &self.process
    }

    /// Number of output lines nobody was waiting for
    pub async fn discarded_lines(&self) -> u64 {
        self.correlator.lock().await.discarded()
    }

    /// Send an optional final command, close stdin and wait for the shell to
    /// exit, killing it after the shutdown timeout. Any request still waiting
    /// fails with [`Error::SessionClosed`].
    pub async fn shutdown(&mut self, final_command: Option<&str>) -> Result<Option<i32>> {
        if let Some(command) = final_command {
            if let Err(e) = self.send(command) {
                warn!("Could not send final command '{}': {}", command, e);
            }
        }

        // Dropping the sender ends the writer task, which closes stdin
        self.input = None;

        let mut exit_code = None;
        if let Some(mut child) = self.child.take() {
            match timeout(self.shutdown_timeout, child.wait()).await {
                Ok(Ok(status)) => exit_code = status.code(),
                Ok(Err(e)) => warn!("Failed to wait for shell: {}", e),
                Err(_) => {
                    warn!(
                        "Shell did not exit within {:?}, killing it",
                        self.shutdown_timeout
                    );
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill shell: {}", e);
                    }
                }
            }
            self.process.mark_terminated(exit_code);
        }

        if let Some(mut pump) = self.pump.take() {
            match timeout(self.shutdown_timeout, &mut pump).await {
                Ok(Ok(stats)) => debug!(
                    "Output pump finished: {} chunk(s), {} line(s), {} byte(s)",
                    stats.chunks,
                    stats.lines,
                    stats.total_bytes()
                ),
                Ok(Err(e)) => warn!("Output pump failed: {}", e),
                Err(_) => {
                    warn!("Output pump still busy after shutdown, aborting it");
                    pump.abort();
                }
            }
        }

        self.correlator.lock().await.close();
        info!(
            "🐚 Shell session ended ({}) after {:?}",
            self.process,
            self.process.uptime()
        );
        Ok(exit_code)
    }
}

/// Frame every chunk and offer the lines to the correlator; close it on EOF
async fn pump_output(
    mut output_rx: UnboundedReceiver<OutputChunk>,
    mut framer: LineFramer,
    correlator: Arc<Mutex<Correlator>>,
) -> StreamStats {
    let mut stats = StreamStats::default();

    while let Some(chunk) = output_rx.recv().await {
        stats.record_chunk(&chunk);
        let lines = framer.push(&chunk);
        deliver(&correlator, lines, &mut stats).await;
    }

    let rest = framer.finish();
    deliver(&correlator, rest, &mut stats).await;

    let mut correlator = correlator.lock().await;
    correlator.close();
    debug!(
        "Shell output closed after {} line(s), {} discarded",
        stats.lines,
        correlator.discarded()
    );
    stats
}

async fn deliver(correlator: &Mutex<Correlator>, lines: Vec<String>, stats: &mut StreamStats) {
    if lines.is_empty() {
        return;
    }
    let mut correlator = correlator.lock().await;
    for line in lines {
        stats.lines += 1;
        trace!("> {}", line);
        correlator.feed(&line);
    }
}
