//! Request/response correlation
//!
//! The shell produces an unstructured stream of lines. A [`Correlator`]
//! holds at most one outstanding request and resolves it with the first line
//! matching the request's [`ResponsePattern`]. Lines arriving while nothing
//! is pending are dropped.

use regex::Regex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};

/// What a resolved request hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Only the matching line
    #[default]
    Single,
    /// Every line since registration, the matching line last
    Collect,
}

/// A resolved response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The matching line ([`ResponseMode::Single`])
    Line(String),
    /// All lines up to and including the match ([`ResponseMode::Collect`])
    Lines(Vec<String>),
}

impl Response {
    /// Flatten into a list of lines
    pub fn into_lines(self) -> Vec<String> {
        match self {
            Response::Line(line) => vec![line],
            Response::Lines(lines) => lines,
        }
    }

    /// The line that completed the response
    pub fn last_line(&self) -> Option<&str> {
        match self {
            Response::Line(line) => Some(line),
            Response::Lines(lines) => lines.last().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Contains(String),
    Regex(Regex),
}

/// Completion rule for one response
#[derive(Debug, Clone)]
pub struct ResponsePattern {
    matcher: Matcher,
}

impl ResponsePattern {
    /// Matches any line, so the next line resolves the request
    pub fn any() -> Self {
        Self {
            matcher: Matcher::Any,
        }
    }

    /// Matches lines where `pattern` is found anywhere
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(Self {
            matcher: Matcher::Regex(Regex::new(pattern)?),
        })
    }

    /// Matches lines containing `text`
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            matcher: Matcher::Contains(text.into()),
        }
    }

    /// Does `line` complete the response?
    pub fn matches(&self, line: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Contains(text) => line.contains(text.as_str()),
            Matcher::Regex(regex) => regex.is_match(line),
        }
    }
}

impl Default for ResponsePattern {
    fn default() -> Self {
        Self::any()
    }
}

impl std::fmt::Display for ResponsePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.matcher {
            Matcher::Any => write!(f, "<any line>"),
            Matcher::Contains(text) => write!(f, "{}", text),
            Matcher::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Handle returned by [`Correlator::register`]
#[derive(Debug)]
pub struct Registration {
    /// Request id, used to cancel
    pub id: u64,
    /// Pattern the request waits for
    pub pattern: ResponsePattern,
    /// Resolves with the response or with [`Error::SessionClosed`]
    pub receiver: oneshot::Receiver<Result<Response>>,
}

#[derive(Debug)]
struct PendingRequest {
    id: u64,
    pattern: ResponsePattern,
    mode: ResponseMode,
    collected: Vec<String>,
    reply: oneshot::Sender<Result<Response>>,
}

impl PendingRequest {
    /// The awaiting side went away (timed out or dropped)
    fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }
}

/// Single-slot request correlator
#[derive(Debug, Default)]
pub struct Correlator {
    pending: Option<PendingRequest>,
    next_id: u64,
    discarded: u64,
    closed: bool,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the one outstanding request.
    ///
    /// Fails with [`Error::RequestPending`] while another live request
    /// exists and with [`Error::SessionClosed`] once the stream has ended.
    pub fn register(
        &mut self,
        pattern: ResponsePattern,
        mode: ResponseMode,
    ) -> Result<Registration> {
        if self.closed {
            return Err(Error::SessionClosed {
                pattern: pattern.to_string(),
            });
        }

        if let Some(pending) = &self.pending {
            if !pending.is_abandoned() {
                return Err(Error::RequestPending {
                    pending: pending.pattern.to_string(),
                    requested: pattern.to_string(),
                });
            }
            debug!("Reclaiming abandoned request #{} ({})", pending.id, pending.pattern);
        }

        self.next_id += 1;
        let (reply, receiver) = oneshot::channel();
        self.pending = Some(PendingRequest {
            id: self.next_id,
            pattern: pattern.clone(),
            mode,
            collected: Vec::new(),
            reply,
        });

        Ok(Registration {
            id: self.next_id,
            pattern,
            receiver,
        })
    }

    /// Offer one line. Returns `true` when it resolved the pending request.
    pub fn feed(&mut self, line: &str) -> bool {
        let Some(mut pending) = self.pending.take() else {
            self.discarded += 1;
            trace!("Dropping idle line: {}", line);
            return false;
        };

        if pending.is_abandoned() {
            self.discarded += 1;
            trace!("Dropping line for abandoned request #{}: {}", pending.id, line);
            return false;
        }

        if pending.mode == ResponseMode::Collect {
            pending.collected.push(line.to_string());
        }

        if !pending.pattern.matches(line) {
            self.pending = Some(pending);
            return false;
        }

        let response = match pending.mode {
            ResponseMode::Single => Response::Line(line.to_string()),
            ResponseMode::Collect => Response::Lines(pending.collected),
        };
        if pending.reply.send(Ok(response)).is_err() {
            debug!("Request #{} resolved after its caller left", pending.id);
        }
        true
    }

    /// Drop the request with `id` if it is still pending
    pub fn cancel(&mut self, id: u64) -> bool {
        match &self.pending {
            Some(pending) if pending.id == id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// The stream ended: fail the pending request and refuse new ones
    pub fn close(&mut self) {
        self.closed = true;
        if let Some(pending) = self.pending.take() {
            let error = Error::SessionClosed {
                pattern: pending.pattern.to_string(),
            };
            // Nobody listening is fine
            let _ = pending.reply.send(Err(error));
        }
    }

    /// Whether a live request is waiting
    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|p| !p.is_abandoned())
    }

    /// Lines dropped because nothing was waiting for them
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
