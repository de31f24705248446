//! Shell Process Spawning
//!
//! Starts the long-lived shell with piped stdio and bridges its pipes to
//! async channels: one reader task per output pipe and one writer task
//! feeding stdin.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::streams::{OutputChunk, ShellStreams, StreamKind};
use crate::config::ShellConfig;
use crate::error::{Error, Result};
use crate::models::ShellProcess;

/// Process spawning configuration
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Shell program, resolved through `PATH` unless it contains a slash
    pub program: String,
    /// Arguments passed to the shell
    pub args: Vec<String>,
    /// Whether to inherit the parent environment
    pub inherit_env: bool,
    /// Extra environment variables
    pub env_vars: HashMap<String, String>,
    /// Working directory
    pub working_directory: Option<PathBuf>,
    /// Size of the buffer each reader task reads into
    pub read_buffer_size: usize,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            program: "bash".to_string(),
            args: Vec::new(),
            inherit_env: true,
            env_vars: HashMap::new(),
            working_directory: None,
            read_buffer_size: 4096,
        }
    }
}

impl From<&ShellConfig> for SpawnConfig {
    fn from(config: &ShellConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            inherit_env: true,
            env_vars: config.env.clone(),
            working_directory: config.working_directory.clone(),
            read_buffer_size: config.read_buffer_size,
        }
    }
}

/// A running shell with its async stream bridge
pub struct SpawnedShell {
    /// Lifecycle record
    pub process: ShellProcess,
    /// Child handle, killed on drop
    pub child: Child,
    /// Channel side of the stdio bridge
    pub streams: ShellStreams,
}

/// Spawn the shell described by `config`
pub async fn spawn_shell_process(config: &SpawnConfig) -> Result<SpawnedShell> {
    validate_program(&config.program)?;

    let mut command = Command::new(&config.program);
    command
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if !config.inherit_env {
        command.env_clear();
    }
    command.envs(&config.env_vars);

    if let Some(dir) = &config.working_directory {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|e| Error::ShellSpawnFailed {
        program: config.program.clone(),
        reason: e.to_string(),
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or(Error::ShellStreamUnavailable { stream: "stdin" })?;
    let stdout = child
        .stdout
        .take()
        .ok_or(Error::ShellStreamUnavailable { stream: "stdout" })?;
    let stderr = child
        .stderr
        .take()
        .ok_or(Error::ShellStreamUnavailable { stream: "stderr" })?;

    let process = ShellProcess::started(&config.program, &config.args, child.id());
    debug!("Spawned shell {}", process);

    // Channel: pipe readers -> async consumer. Closes once both readers hit EOF.
    let (tx_out, rx_out) = unbounded_channel::<OutputChunk>();
    // Channel: async producer -> stdin writer task
    let (tx_in, rx_in) = unbounded_channel::<Vec<u8>>();

    spawn_reader(stdout, StreamKind::Stdout, tx_out.clone(), config.read_buffer_size);
    spawn_reader(stderr, StreamKind::Stderr, tx_out, config.read_buffer_size);
    spawn_writer(stdin, rx_in);

    Ok(SpawnedShell {
        process,
        child,
        streams: ShellStreams::from_channels(rx_out, tx_in),
    })
}

/// Reader task: forward raw chunks from one pipe until EOF
fn spawn_reader<R>(
    mut reader: R,
    stream: StreamKind,
    tx: UnboundedSender<OutputChunk>,
    buffer_size: usize,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; buffer_size.max(1)];
        let mut consecutive_errors = 0;
        const MAX_CONSECUTIVE_ERRORS: u32 = 5;

        loop {
            match reader.read(&mut buf).await {
                Ok(0) => {
                    debug!("Shell {:?} reached EOF", stream);
                    break;
                }
                Ok(n) => {
                    consecutive_errors = 0;
                    let chunk = OutputChunk {
                        stream,
                        data: buf[..n].to_vec(),
                    };
                    if tx.send(chunk).is_err() {
                        debug!("Shell {:?}: receiver dropped, stopping reader", stream);
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    consecutive_errors += 1;
                    warn!(
                        "Shell {:?} read error ({}): {} (attempt {}/{})",
                        stream,
                        e.kind(),
                        e,
                        consecutive_errors,
                        MAX_CONSECUTIVE_ERRORS
                    );

                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("Shell {:?}: too many consecutive errors, stopping reader", stream);
                        break;
                    }

                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                }
            }
        }
    })
}

/// Writer task: write queued input to stdin; stdin closes when the sender side is dropped
fn spawn_writer(mut stdin: ChildStdin, mut rx: UnboundedReceiver<Vec<u8>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if let Err(e) = stdin.write_all(&data).await {
                warn!("Shell write error ({}): {}, stopping writer", e.kind(), e);
                return;
            }
            if let Err(e) = stdin.flush().await {
                debug!("Shell flush error: {}", e);
            }
        }
        debug!("Shell input closed");
    })
}

/// Validate the shell program before spawning
pub fn validate_program(program: &str) -> Result<()> {
    if program.trim().is_empty() {
        return Err(Error::EmptyCommand);
    }
    if find_in_path(program).is_some() {
        Ok(())
    } else {
        Err(Error::CommandNotFound {
            command: program.to_string(),
        })
    }
}

/// Resolve a program the way the shell would: as a path when it contains a
/// slash, otherwise through each `PATH` entry
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return path.is_file().then(|| path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
