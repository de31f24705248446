//! Error types and Result aliases for stup

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for stup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used for exit codes and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Dirty tree, wrong branch, unknown project/target, declined confirmation
    Precondition,
    /// A wrapped tool reported a failure it cannot recover from
    ToolFatal,
    /// No matching response arrived in time
    Timeout,
    /// The shell session itself misbehaved (spawn, stdin, closed, misuse)
    Channel,
    /// Configuration could not be found, parsed or validated
    Config,
    /// Everything else
    Internal,
}

impl ErrorKind {
    /// Process exit code used by the binary for this kind
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Internal => 1,
            ErrorKind::Precondition => 2,
            ErrorKind::ToolFatal => 3,
            ErrorKind::Timeout => 4,
            ErrorKind::Channel => 5,
            // EX_CONFIG from sysexits.h
            ErrorKind::Config => 78,
        }
    }
}

/// Main error type for stup
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // === Shell session errors ===
    /// Failed to spawn the shell process
    #[error("Failed to spawn shell '{program}': {reason}")]
    ShellSpawnFailed { program: String, reason: String },

    /// Shell program not found
    #[error("Command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    /// A piped stdio handle was not available after spawning
    #[error("Shell {stream} handle is not available")]
    ShellStreamUnavailable { stream: &'static str },

    /// Failed to send input to the shell
    #[error("Failed to send input to shell: {reason}")]
    ShellInputSendFailed { reason: String },

    /// The shell went away while a response was awaited
    #[error("Shell session closed while waiting for a line matching '{pattern}'")]
    SessionClosed { pattern: String },

    /// A second response was awaited while one is still outstanding
    #[error("A response matching '{pending}' is still pending, cannot wait for '{requested}'")]
    RequestPending { pending: String, requested: String },

    /// No matching line arrived in time
    #[error("Timed out after {duration:?} waiting for a line matching '{pattern}'")]
    ResponseTimeout { pattern: String, duration: Duration },

    /// A framed command did not finish in time
    #[error("Command '{command}' did not finish within {duration:?}")]
    CommandTimeout { command: String, duration: Duration },

    /// Empty command
    #[error("Command cannot be empty")]
    EmptyCommand,

    /// A framed command ended without the markers it was wrapped in
    #[error("Malformed response for command '{command}': {reason}")]
    MalformedResponse { command: String, reason: String },

    // === Deployment preconditions ===
    /// Working tree has uncommitted changes
    #[error("The {repo} repository is not clean. Please commit all changes before deploying")]
    DirtyWorkingTree { repo: String, changes: Vec<String> },

    /// Repository is not on the branch the target wants
    #[error("{repo} is currently on branch '{actual}', but target wants branch '{expected}'")]
    BranchMismatch {
        repo: String,
        actual: String,
        expected: String,
    },

    /// Unknown project id
    #[error("Project '{project_id}' not found")]
    ProjectNotFound { project_id: String },

    /// Unknown target id
    #[error("Target '{target_id}' not found in project '{project_id}'")]
    TargetNotFound {
        project_id: String,
        target_id: String,
    },

    /// Operator declined a confirmation
    #[error("Deployment canceled: {reason}")]
    DeploymentCanceled { reason: String },

    // === Tool-reported failures ===
    /// A framed command exited non-zero where success is required
    #[error("Command '{command}' exited with status {status}: {output}")]
    CommandFailed {
        command: String,
        status: i32,
        output: String,
    },

    /// ssh-add did not confirm the identity
    #[error("Failed to load private key '{key}': {output}")]
    KeyLoadFailed { key: String, output: String },

    /// git-ftp reported a fatal error
    #[error("git-ftp ran into a fatal error on repo {repo}: {line}")]
    UploadFailed { repo: String, line: String },

    /// Remote has no git-ftp state yet and initialization was not performed
    #[error("git-ftp is not initialized for repo {repo}. Initialize it with: {init_command}")]
    RemoteNotInitialized { repo: String, init_command: String },

    /// git-ftp init itself failed
    #[error("git-ftp init failed for repo {repo}: {line}")]
    InitializationFailed { repo: String, line: String },

    // === Configuration errors ===
    /// Failed to load configuration file
    #[error("Failed to load config from '{}': {reason}", .path.display())]
    ConfigLoadFailed { path: PathBuf, reason: String },

    /// Configuration file not found
    #[error("Configuration file not found")]
    ConfigNotFound,

    /// Configuration validation failed
    #[error("Configuration validation failed for '{field}': {reason}")]
    ConfigValidationFailed { field: String, reason: String },

    /// Failed to parse configuration
    #[error("Failed to parse {format} config: {reason}")]
    ConfigParseFailed { format: String, reason: String },

    // === Prompt errors ===
    /// Interactive prompt could not be shown or answered
    #[error("Interactive prompt failed: {reason}")]
    PromptFailed { reason: String },

    // === I/O and serialization errors ===
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Regex compilation errors
    #[error("Regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DirtyWorkingTree { .. }
            | Error::BranchMismatch { .. }
            | Error::ProjectNotFound { .. }
            | Error::TargetNotFound { .. }
            | Error::DeploymentCanceled { .. } => ErrorKind::Precondition,

            Error::CommandFailed { .. }
            | Error::KeyLoadFailed { .. }
            | Error::UploadFailed { .. }
            | Error::RemoteNotInitialized { .. }
            | Error::InitializationFailed { .. } => ErrorKind::ToolFatal,

            Error::ResponseTimeout { .. } | Error::CommandTimeout { .. } => ErrorKind::Timeout,

            Error::ShellSpawnFailed { .. }
            | Error::CommandNotFound { .. }
            | Error::ShellStreamUnavailable { .. }
            | Error::ShellInputSendFailed { .. }
            | Error::SessionClosed { .. }
            | Error::RequestPending { .. }
            | Error::EmptyCommand
            | Error::MalformedResponse { .. } => ErrorKind::Channel,

            Error::ConfigLoadFailed { .. }
            | Error::ConfigNotFound
            | Error::ConfigValidationFailed { .. }
            | Error::ConfigParseFailed { .. }
            | Error::Toml(_)
            | Error::Serde(_) => ErrorKind::Config,

            Error::PromptFailed { .. } | Error::Io(_) | Error::Regex(_) | Error::Other(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::PromptFailed {
            reason: err.to_string(),
        }
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
