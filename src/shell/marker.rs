//! Delimiter-bounded command framing
//!
//! A command sent through [`super::ShellSession::run`] is wrapped between a
//! BEGIN and an END marker unique to that call. The END line carries the
//! command's exit status, so a response is complete exactly when its END
//! marker shows up, regardless of what the command itself printed.

use uuid::Uuid;

use super::correlator::ResponsePattern;
use crate::error::{Error, Result};

/// Output of one framed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The command as given by the caller
    pub command: String,
    /// Lines printed between the markers (stdout and stderr merged)
    pub lines: Vec<String>,
    /// Exit status of the command
    pub status: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// First line of output, if any
    pub fn first_line(&self) -> Option<&str> {
        self.lines.first().map(String::as_str)
    }

    /// Last line of output, if any
    pub fn last_line(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// All output joined with newlines
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Turn a non-zero status into [`Error::CommandFailed`]
    pub fn require_success(self) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: self.command.clone(),
                status: self.status,
                output: self.text(),
            })
        }
    }
}

/// BEGIN/END marker pair for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMarker {
    begin: String,
    end: String,
}

impl CommandMarker {
    /// Fresh marker pair with a random id
    pub fn new() -> Self {
        Self::with_id(&Uuid::new_v4().simple().to_string())
    }

    /// Marker pair for a fixed id
    pub fn with_id(id: &str) -> Self {
        Self {
            begin: format!("__STUP_BEGIN_{}__", id),
            end: format!("__STUP_END_{}__", id),
        }
    }

    pub fn begin(&self) -> &str {
        &self.begin
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Shell text running `command` between the markers.
    ///
    /// The command runs in a brace group, so `cd`, `eval` and exports still
    /// apply to the session. Its stderr is folded into stdout to keep
    /// diagnostics in order with regular output. Stdin is `/dev/null`: the
    /// shell's own stdin still holds the closing `printf`.
    pub fn wrap(&self, command: &str) -> String {
        format!(
            "printf '%s\\n' '{begin}'\n{{ {command}\n}} </dev/null 2>&1\nprintf '%s %s\\n' '{end}' \"$?\"",
            begin = self.begin,
            command = command,
            end = self.end,
        )
    }

    /// Completion pattern for the wrapped command
    pub fn end_pattern(&self) -> ResponsePattern {
        ResponsePattern::literal(self.end.clone())
    }

    /// Recover the command output from the collected response lines
    pub fn parse(&self, command: &str, raw_lines: Vec<String>) -> Result<CommandOutput> {
        let lines = self.normalize(raw_lines);
        let malformed = |reason: &str| Error::MalformedResponse {
            command: command.to_string(),
            reason: reason.to_string(),
        };

        let begin_at = lines
            .iter()
            .position(|line| line.trim_end() == self.begin)
            .ok_or_else(|| malformed("begin marker missing"))?;
        if begin_at > 0 {
            debug!("Dropped {} stale line(s) before '{}'", begin_at, command);
            for stale in &lines[..begin_at] {
                trace!("stale: {}", stale);
            }
        }

        let end_at = lines[begin_at + 1..]
            .iter()
            .position(|line| line.starts_with(&self.end))
            .map(|offset| begin_at + 1 + offset)
            .ok_or_else(|| malformed("end marker missing"))?;

        let status = lines[end_at][self.end.len()..]
            .trim()
            .parse::<i32>()
            .map_err(|_| malformed("end marker carries no exit status"))?;

        Ok(CommandOutput {
            command: command.to_string(),
            lines: lines[begin_at + 1..end_at].to_vec(),
            status,
        })
    }

    /// Split embedded newlines and move marker text that landed mid-line
    /// (after output without a trailing newline) onto its own line
    fn normalize(&self, raw_lines: Vec<String>) -> Vec<String> {
        let mut lines = Vec::with_capacity(raw_lines.len());
        for raw in raw_lines {
            for part in raw.split('\n') {
                let part = part.strip_suffix('\r').unwrap_or(part);
                self.split_marker(part, &mut lines);
            }
        }
        lines
    }

    fn split_marker(&self, line: &str, out: &mut Vec<String>) {
        for marker in [&self.begin, &self.end] {
            if let Some(at) = line.find(marker.as_str()) {
                if at > 0 {
                    out.push(line[..at].to_string());
                    out.push(line[at..].to_string());
                    return;
                }
            }
        }
        out.push(line.to_string());
    }
}

impl Default for CommandMarker {
    fn default() -> Self {
        Self::new()
    }
}
