use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for one image in the media store.
pub type ImageId = u64;

/// Filter predicate selecting which images a batch job touches.
///
/// The contract between [`crate::MediaStore::count_matching`] and
/// [`crate::MediaStore::select_page`] is that both apply this predicate
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    MissingAlt,
    All,
}

/// Severity of one per-image log line returned to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Success,
    Error,
    Notice,
    Info,
}

/// One operator-visible line produced while processing a page.
///
/// Per-image failures travel exclusively through this channel; they never
/// escalate to a transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub kind: LogKind,
    pub message: String,
}

impl LogMessage {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of one batch round-trip as seen by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Images actually attempted in this page; less than the requested
    /// width only when the page ran off the end of the matching set.
    pub processed_count: u64,
    pub log: Vec<LogMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportFailure,
    pub message: String,
}

impl TransportError {
    pub(crate) fn new(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

/// Transport-level failure taxonomy. `Timeout` is the only recoverable
/// variant; the controller shrinks the batch and retries the same offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    HttpStatus(u16),
    /// The authenticity token was rejected.
    Auth,
    /// The worker answered `success: false`.
    Rejected,
    InvalidResponse,
    Network,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::HttpStatus(code) => write!(f, "http status {code}"),
            TransportFailure::Auth => write!(f, "authenticity token rejected"),
            TransportFailure::Rejected => write!(f, "request rejected by worker"),
            TransportFailure::InvalidResponse => write!(f, "invalid response"),
            TransportFailure::Network => write!(f, "network error"),
        }
    }
}
