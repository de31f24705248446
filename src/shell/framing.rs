//! Line framing
//!
//! Turns raw pipe chunks into the logical lines the correlator matches
//! against. Two modes exist: `Lines` splits on newlines and buffers partial
//! lines per pipe, so the result does not depend on how the bytes were
//! chunked; `Chunks` treats every chunk as one line with a single trailing
//! newline removed.

use serde::{Deserialize, Serialize};

use super::streams::{OutputChunk, StreamKind};

/// Default upper bound for one framed line
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

/// How output chunks become lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Split on `\n`, buffer partial lines per pipe
    #[default]
    Lines,
    /// One chunk is one line, minus a single trailing `\n`
    Chunks,
}

/// Stateful chunk-to-line splitter
#[derive(Debug, Clone)]
pub struct LineFramer {
    mode: FramingMode,
    max_line_bytes: usize,
    stdout_partial: Vec<u8>,
    stderr_partial: Vec<u8>,
}

impl LineFramer {
    /// Create a framer; `max_line_bytes` of zero is treated as one
    pub fn new(mode: FramingMode, max_line_bytes: usize) -> Self {
        Self {
            mode,
            max_line_bytes: max_line_bytes.max(1),
            stdout_partial: Vec::new(),
            stderr_partial: Vec::new(),
        }
    }

    /// Framing mode in use
    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Feed one chunk, returning every line it completed
    pub fn push(&mut self, chunk: &OutputChunk) -> Vec<String> {
        match self.mode {
            FramingMode::Chunks => {
                let data = chunk.data.strip_suffix(b"\n").unwrap_or(&chunk.data);
                vec![String::from_utf8_lossy(data).into_owned()]
            }
            FramingMode::Lines => {
                let max = self.max_line_bytes;
                let partial = match chunk.stream {
                    StreamKind::Stdout => &mut self.stdout_partial,
                    StreamKind::Stderr => &mut self.stderr_partial,
                };
                partial.extend_from_slice(&chunk.data);
                split_complete_lines(partial, max)
            }
        }
    }

    /// Flush whatever partial lines remain, stdout first
    pub fn finish(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        for partial in [&mut self.stdout_partial, &mut self.stderr_partial] {
            if !partial.is_empty() {
                let rest = std::mem::take(partial);
                lines.push(decode_line(&rest));
            }
        }
        lines
    }

    /// Bytes currently held back waiting for a newline
    pub fn pending_bytes(&self) -> usize {
        self.stdout_partial.len() + self.stderr_partial.len()
    }
}

/// Drain complete lines from `buf`. Over-long lines are cut every `max`
/// bytes; the cut points depend only on the content, never on chunking.
fn split_complete_lines(buf: &mut Vec<u8>, max: usize) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        match buf.iter().position(|&b| b == b'\n') {
            Some(pos) if pos <= max => {
                let mut line: Vec<u8> = buf.drain(..=pos).collect();
                line.pop();
                lines.push(decode_line(&line));
            }
            _ if buf.len() > max => {
                let piece: Vec<u8> = buf.drain(..max).collect();
                lines.push(String::from_utf8_lossy(&piece).into_owned());
            }
            _ => break,
        }
    }
    lines
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
