//! Shell Streams
//!
//! Async-friendly access to the shell's stdin and its combined
//! stdout/stderr output. Reader and writer tasks sit on the other side of
//! these channels (see [`super::process`]).

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Which pipe a chunk was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// A raw chunk of output exactly as it was read from a pipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Source pipe
    pub stream: StreamKind,
    /// Raw bytes, not aligned to lines
    pub data: Vec<u8>,
}

impl OutputChunk {
    /// Convenience constructor for stdout data
    pub fn stdout(data: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            data: data.into(),
        }
    }

    /// Convenience constructor for stderr data
    pub fn stderr(data: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            data: data.into(),
        }
    }
}

/// Shell I/O streams wrapper
pub struct ShellStreams {
    /// Receiver for output chunks (stdout and stderr)
    output_rx: UnboundedReceiver<OutputChunk>,
    /// Sender for input bytes to the shell (stdin)
    input_tx: UnboundedSender<Vec<u8>>,
}

impl ShellStreams {
    /// Create new shell streams from channels
    pub fn from_channels(
        output_rx: UnboundedReceiver<OutputChunk>,
        input_tx: UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            output_rx,
            input_tx,
        }
    }

    /// Split into the output receiver and the input sender.
    ///
    /// Dropping the returned sender closes the shell's stdin.
    pub fn into_parts(self) -> (UnboundedReceiver<OutputChunk>, UnboundedSender<Vec<u8>>) {
        (self.output_rx, self.input_tx)
    }
}

/// Stream statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Total bytes read from stdout
    pub stdout_bytes: u64,
    /// Total bytes read from stderr
    pub stderr_bytes: u64,
    /// Number of chunks read
    pub chunks: u64,
    /// Number of framed lines handed to the correlator
    pub lines: u64,
}

impl StreamStats {
    /// Account for one chunk
    pub fn record_chunk(&mut self, chunk: &OutputChunk) {
        self.chunks += 1;
        match chunk.stream {
            StreamKind::Stdout => self.stdout_bytes += chunk.data.len() as u64,
            StreamKind::Stderr => self.stderr_bytes += chunk.data.len() as u64,
        }
    }

    /// Total bytes read from both pipes
    pub fn total_bytes(&self) -> u64 {
        self.stdout_bytes + self.stderr_bytes
    }
}
