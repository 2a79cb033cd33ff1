use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eval::message::NativeMessage;

/// How the call site consumes a native call: by awaiting its value, or by
/// registering a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum CallMode {
    Blocking,
    Callback,
}

/// Execution modes an action supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionModes {
    pub blocking: bool,
    pub callback: bool,
}

impl ExecutionModes {
    pub const BOTH: Self = Self {
        blocking: true,
        callback: true,
    };
    pub const BLOCKING_ONLY: Self = Self {
        blocking: true,
        callback: false,
    };
    pub const CALLBACK_ONLY: Self = Self {
        blocking: false,
        callback: true,
    };
    pub const NONE: Self = Self {
        blocking: false,
        callback: false,
    };

    pub fn supports(&self, mode: CallMode) -> bool {
        match mode {
            CallMode::Blocking => self.blocking,
            CallMode::Callback => self.callback,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.blocking && !self.callback
    }
}

/// Outbound message kinds of the messaging connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
pub enum MessageKind {
    #[strum(to_string = "TextMessage")]
    Text,
    #[strum(to_string = "BytesMessage")]
    Bytes,
    #[strum(to_string = "ObjectMessage")]
    Object,
    #[strum(to_string = "MapMessage")]
    Map,
    #[strum(to_string = "Message")]
    Generic,
}

impl MessageKind {
    /// Case-insensitive; anything unrecognised is a generic message.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "textmessage" => MessageKind::Text,
            "bytesmessage" => MessageKind::Bytes,
            "objectmessage" => MessageKind::Object,
            "mapmessage" => MessageKind::Map,
            _ => MessageKind::Generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Text(String),
    Map(IndexMap<String, String>),
    Object(Vec<u8>),
    Native(NativeMessage),
}

/// Protocol-level message handed to a [`Transport`](super::Transport).
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub kind: MessageKind,
    pub body: EnvelopeBody,
    pub headers: IndexMap<String, String>,
}

/// Receives replies for request/response style sends.
pub trait ReplyHandler: Send + Sync {
    fn on_reply(&self, reply: Envelope);
}

/// What an action asks the runtime to send.
#[derive(Clone)]
pub struct OutboundRequest {
    pub envelope: Envelope,
    pub properties: IndexMap<String, String>,
    pub reply_handler: Option<Arc<dyn ReplyHandler>>,
}

impl OutboundRequest {
    pub fn new(envelope: Envelope) -> Self {
        Self {
            envelope,
            properties: IndexMap::new(),
            reply_handler: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

impl std::fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("envelope", &self.envelope)
            .field("properties", &self.properties)
            .field("reply_handler", &self.reply_handler.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportReply {
    pub accepted: bool,
    pub message_id: Option<String>,
    pub body: Option<NativeMessage>,
}

impl TransportReply {
    pub fn accepted(message_id: impl Into<String>) -> Self {
        Self {
            accepted: true,
            message_id: Some(message_id.into()),
            body: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("rejected by broker: {0}")]
    Rejected(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport is closed")]
    Closed,
    #[error("no transport registered for '{0}'")]
    Unavailable(String),
    #[error("transport task panicked")]
    Panicked,
}
