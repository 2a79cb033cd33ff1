//! Structured message values.
//!
//! A message is shared by reference (`Arc<Message>`) between the frame that owns
//! it and the native calls it is passed to. Native calls may rewrite its header
//! map and data source in place; the native representation it arrived with is
//! fixed at construction.

use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use super::value::Value;

/// Protocol-level body a message carries when it was received from, or is
/// forwarded untouched to, a transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NativeMessage {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Map(IndexMap<String, String>),
    Object(Vec<u8>),
}

impl NativeMessage {
    pub fn describe(&self) -> &'static str {
        match self {
            NativeMessage::Empty => "empty",
            NativeMessage::Text(_) => "text",
            NativeMessage::Bytes(_) => "bytes",
            NativeMessage::Map(_) => "map",
            NativeMessage::Object(_) => "object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MessageOrigin {
    /// Received from a transport.
    Network,
    /// Built by the program.
    Program,
}

#[derive(Debug)]
pub struct Message {
    id: Uuid,
    origin: MessageOrigin,
    headers: RwLock<IndexMap<String, String>>,
    data_source: RwLock<Option<Value>>,
    native: NativeMessage,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            origin: MessageOrigin::Program,
            headers: RwLock::new(IndexMap::new()),
            data_source: RwLock::new(None),
            native: NativeMessage::Empty,
        }
    }

    pub fn with_payload(payload: Value) -> Self {
        let message = Self::new();
        message.set_data_source(payload);
        message
    }

    pub fn received(native: NativeMessage, headers: IndexMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin: MessageOrigin::Network,
            headers: RwLock::new(headers),
            data_source: RwLock::new(None),
            native,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> MessageOrigin {
        self.origin
    }

    pub fn native(&self) -> &NativeMessage {
        &self.native
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.read().get(name).cloned()
    }

    /// Appends or replaces a header, returning the previous value.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.headers.write().insert(name.into(), value.into())
    }

    /// Removes exactly `name`; the order of the remaining headers is kept.
    pub fn remove_header(&self, name: &str) -> Option<String> {
        self.headers.write().shift_remove(name)
    }

    pub fn headers(&self) -> IndexMap<String, String> {
        self.headers.read().clone()
    }

    pub fn data_source(&self) -> Option<Value> {
        self.data_source.read().clone()
    }

    pub fn set_data_source(&self, payload: Value) {
        *self.data_source.write() = Some(payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Message {
        let message = Message::with_payload(Value::from("body"));
        message.set_header("Content-Type", "text/plain");
        message.set_header("X-Trace", "abc");
        message.set_header("X-Retry", "2");
        message
    }

    #[test]
    fn test_remove_present_header() {
        let message = sample();
        assert_eq!(message.remove_header("X-Trace"), Some("abc".to_string()));

        let remaining: Vec<_> = message.headers().into_iter().collect();
        assert_eq!(
            remaining,
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("X-Retry".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(message.data_source(), Some(Value::from("body")));
    }

    #[test]
    fn test_remove_absent_header_is_noop() {
        let message = sample();
        let before = message.headers();
        assert_eq!(message.remove_header("Missing"), None);
        assert_eq!(message.headers(), before);
        assert_eq!(message.data_source(), Some(Value::from("body")));
    }

    #[test]
    fn test_received_message() {
        let message = Message::received(NativeMessage::Text("hi".into()), IndexMap::new());
        assert_eq!(message.origin(), MessageOrigin::Network);
        assert_eq!(message.native(), &NativeMessage::Text("hi".into()));
        assert!(message.data_source().is_none());
    }
}
