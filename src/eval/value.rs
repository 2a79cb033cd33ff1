use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::handle::ConnectorHandle;
use super::message::Message;
use crate::error::{NativeResult, RuntimeError};

/// Insertion-ordered map used by [`Value::Map`].
pub type ValueMap = IndexMap<String, Value>;

/// Tag of a [`Value`]. Descriptors declare parameter and return types with
/// these names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum ValueType {
    #[strum(to_string = "int", serialize = "integer")]
    Integer,
    #[strum(to_string = "float")]
    Float,
    #[strum(to_string = "boolean", serialize = "bool")]
    Boolean,
    #[strum(to_string = "string")]
    String,
    #[strum(to_string = "map")]
    Map,
    #[strum(to_string = "message")]
    Message,
    #[strum(to_string = "connector")]
    Connector,
}

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Map(ValueMap),
    Message(Arc<Message>),
    Connector(ConnectorHandle),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn message(message: Message) -> Self {
        Value::Message(Arc::new(message))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
            Value::String(_) => ValueType::String,
            Value::Map(_) => ValueType::Map,
            Value::Message(_) => ValueType::Message,
            Value::Connector(_) => ValueType::Connector,
        }
    }

    fn mismatch(&self, expected: ValueType) -> RuntimeError {
        RuntimeError::TypeMismatch {
            expected,
            found: self.value_type(),
        }
    }

    pub fn as_integer(&self) -> NativeResult<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            _ => Err(self.mismatch(ValueType::Integer)),
        }
    }

    pub fn as_float(&self) -> NativeResult<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            _ => Err(self.mismatch(ValueType::Float)),
        }
    }

    pub fn as_boolean(&self) -> NativeResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            _ => Err(self.mismatch(ValueType::Boolean)),
        }
    }

    pub fn as_str(&self) -> NativeResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.mismatch(ValueType::String)),
        }
    }

    pub fn as_map(&self) -> NativeResult<&ValueMap> {
        match self {
            Value::Map(m) => Ok(m),
            _ => Err(self.mismatch(ValueType::Map)),
        }
    }

    pub fn as_message(&self) -> NativeResult<&Arc<Message>> {
        match self {
            Value::Message(m) => Ok(m),
            _ => Err(self.mismatch(ValueType::Message)),
        }
    }

    pub fn as_connector(&self) -> NativeResult<&ConnectorHandle> {
        match self {
            Value::Connector(c) => Ok(c),
            _ => Err(self.mismatch(ValueType::Connector)),
        }
    }

    /// JSON form of primitive and map values. Non-finite floats become `null`.
    pub fn to_json(&self) -> NativeResult<serde_json::Value> {
        Ok(match self {
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Map(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key.clone(), value.to_json()?);
                }
                serde_json::Value::Object(object)
            }
            Value::Message(_) | Value::Connector(_) => {
                return Err(RuntimeError::TypeMismatch {
                    expected: ValueType::Map,
                    found: self.value_type(),
                })
            }
        })
    }
}

/// Primitives, strings and maps compare by value; messages and connectors by
/// identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Message(a), Value::Message(b)) => Arc::ptr_eq(a, b),
            (Value::Connector(a), Value::Connector(b)) => a.same(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Message(m) => write!(f, "message({})", m.id()),
            Value::Connector(c) => write!(f, "connector({}:{})", c.family(), c.name()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<ConnectorHandle> for Value {
    fn from(value: ConnectorHandle) -> Self {
        Value::Connector(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_accessor_type_mismatch() {
        let value = Value::from("text");
        assert_eq!(value.as_str().unwrap(), "text");
        match value.as_integer() {
            Err(RuntimeError::TypeMismatch { expected, found }) => {
                assert_eq!(expected, ValueType::Integer);
                assert_eq!(found, ValueType::String);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(ValueType::Integer.to_string(), "int");
        assert_eq!(ValueType::from_str("integer").unwrap(), ValueType::Integer);
        assert_eq!(ValueType::from_str("INT").unwrap(), ValueType::Integer);
        assert_eq!(ValueType::from_str("bool").unwrap(), ValueType::Boolean);
        assert_eq!(ValueType::from_str("message").unwrap(), ValueType::Message);
        assert!(ValueType::from_str("xml").is_err());
    }

    #[test]
    fn test_equality_semantics() {
        let a = Value::map([("k", Value::from(1)), ("j", Value::from("v"))]);
        let b = Value::map([("k", Value::from(1)), ("j", Value::from("v"))]);
        assert_eq!(a, b);

        let m1 = Value::message(Message::new());
        let m2 = Value::message(Message::new());
        assert_eq!(m1, m1.clone());
        assert_ne!(m1, m2);

        let c1 = ConnectorHandle::new("broker", "jms", IndexMap::new());
        let c2 = ConnectorHandle::new("broker", "jms", IndexMap::new());
        let c3 = ConnectorHandle::new("broker", "jms", IndexMap::new());
        assert_eq!(Value::from(c1.clone()), Value::from(c1));
        assert_ne!(Value::from(c2.clone()), Value::from(c3));

        assert_ne!(Value::from(1), Value::from(1.0));
    }

    #[test]
    fn test_map_preserves_insertion_order() {
        let value = Value::map([("z", Value::from(1)), ("a", Value::from(2))]);
        assert_eq!(value.to_string(), "{z: 1, a: 2}");
    }

    #[test]
    fn test_to_json() {
        let value = Value::map([
            ("n", Value::from(1)),
            ("s", Value::from("x")),
            ("inner", Value::map([("b", Value::from(true))])),
        ]);
        assert_eq!(
            value.to_json().unwrap(),
            serde_json::json!({"n": 1, "s": "x", "inner": {"b": true}})
        );
        assert!(Value::message(Message::new()).to_json().is_err());
    }
}
