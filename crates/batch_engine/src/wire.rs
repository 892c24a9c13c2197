//! JSON wire types shared by the transport client and the worker.
//!
//! The envelope keeps the `{success, data}` shape the original admin AJAX
//! protocol used, so existing dashboards can consume either end.

use serde::{Deserialize, Serialize};

use crate::{Criterion, LogKind, LogMessage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRequest {
    pub criterion: Criterion,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountData {
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub offset: u64,
    pub batch_size: u32,
    pub criterion: Criterion,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchData {
    pub processed_count: u64,
    #[serde(default)]
    pub log_messages: Vec<WireLogMessage>,
}

/// A log entry on the wire: either `{type, message}` or a bare string,
/// which is treated as `info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireLogMessage {
    Typed {
        #[serde(rename = "type")]
        kind: LogKind,
        message: String,
    },
    Plain(String),
}

impl From<WireLogMessage> for LogMessage {
    fn from(wire: WireLogMessage) -> Self {
        match wire {
            WireLogMessage::Typed { kind, message } => LogMessage { kind, message },
            WireLogMessage::Plain(message) => LogMessage {
                kind: LogKind::Info,
                message,
            },
        }
    }
}

impl From<LogMessage> for WireLogMessage {
    fn from(entry: LogMessage) -> Self {
        WireLogMessage::Typed {
            kind: entry.kind,
            message: entry.message,
        }
    }
}

/// Response envelope: `{success: true, data}` or `{success: false,
/// data: {message}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    /// Error message the worker attached, if any.
    pub(crate) fn rejection_message(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        data.get("message")
            .and_then(|value| value.as_str())
            .map(ToOwned::to_owned)
    }
}
