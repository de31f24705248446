//! Shell Session Channel
//!
//! Request/response semantics on top of one persistent shell process:
//! spawning and stdio bridging, line framing, correlation of lines to the
//! one outstanding request, and marker-framed command execution.

pub mod correlator;
pub mod framing;
pub mod marker;
pub mod operations;
pub mod process;
pub mod session;
pub mod streams;

// Re-exports for convenience
pub use correlator::{Correlator, Registration, Response, ResponseMode, ResponsePattern};
pub use framing::{FramingMode, LineFramer, DEFAULT_MAX_LINE_BYTES};
pub use marker::{CommandMarker, CommandOutput};
pub use operations::CommandChannel;
pub use process::{find_in_path, spawn_shell_process, validate_program, SpawnConfig, SpawnedShell};
pub use session::ShellSession;
pub use streams::{OutputChunk, ShellStreams, StreamKind, StreamStats};
