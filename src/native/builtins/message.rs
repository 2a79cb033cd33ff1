//! `lang.message`: header and payload manipulation.

use tracing::debug;

use super::Builtin;
use crate::error::NativeResult;
use crate::eval::message::Message;
use crate::eval::value::Value;
use crate::native::registry::Implementation;
use crate::native::types::NativeSpec;

const PACKAGE: &str = "lang.message";

static REMOVE_HEADER: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "removeHeader",
    params: &[("message", "message"), ("key", "string")],
    returns: None,
    public: true,
};

static ADD_HEADER: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "addHeader",
    params: &[("message", "message"), ("key", "string"), ("value", "string")],
    returns: None,
    public: true,
};

static SET_HEADER: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "setHeader",
    params: &[("message", "message"), ("key", "string"), ("value", "string")],
    returns: None,
    public: true,
};

static GET_HEADER: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "getHeader",
    params: &[("message", "message"), ("key", "string")],
    returns: Some("string"),
    public: true,
};

static GET_STRING_PAYLOAD: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "getStringPayload",
    params: &[("message", "message")],
    returns: Some("string"),
    public: true,
};

static SET_STRING_PAYLOAD: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "setStringPayload",
    params: &[("message", "message"), ("payload", "string")],
    returns: None,
    public: true,
};

static SET_MAP_PAYLOAD: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "setMapPayload",
    params: &[("message", "message"), ("payload", "map")],
    returns: None,
    public: true,
};

static FROM_STRING: NativeSpec = NativeSpec {
    package: PACKAGE,
    name: "fromString",
    params: &[("payload", "string")],
    returns: Some("message"),
    public: true,
};

pub fn contributions() -> Vec<Implementation> {
    vec![
        Builtin::contribution(&REMOVE_HEADER, remove_header),
        Builtin::contribution(&ADD_HEADER, add_header),
        Builtin::contribution(&SET_HEADER, set_header),
        Builtin::contribution(&GET_HEADER, get_header),
        Builtin::contribution(&GET_STRING_PAYLOAD, get_string_payload),
        Builtin::contribution(&SET_STRING_PAYLOAD, set_string_payload),
        Builtin::contribution(&SET_MAP_PAYLOAD, set_map_payload),
        Builtin::contribution(&FROM_STRING, from_string),
    ]
}

/// Removes exactly the named header. Removing an absent header does nothing.
fn remove_header(args: &[Value]) -> NativeResult<Option<Value>> {
    let message = args[0].as_message()?;
    let key = args[1].as_str()?;
    let removed = message.remove_header(key);
    debug!(header = key, removed = removed.is_some(), "remove header");
    Ok(None)
}

/// Adds a header unless one with the same name exists.
fn add_header(args: &[Value]) -> NativeResult<Option<Value>> {
    let message = args[0].as_message()?;
    let key = args[1].as_str()?;
    if message.header(key).is_none() {
        message.set_header(key, args[2].as_str()?);
    }
    Ok(None)
}

fn set_header(args: &[Value]) -> NativeResult<Option<Value>> {
    args[0]
        .as_message()?
        .set_header(args[1].as_str()?, args[2].as_str()?);
    Ok(None)
}

/// Empty string when the header is absent.
fn get_header(args: &[Value]) -> NativeResult<Option<Value>> {
    let value = args[0]
        .as_message()?
        .header(args[1].as_str()?)
        .unwrap_or_default();
    Ok(Some(Value::String(value)))
}

fn get_string_payload(args: &[Value]) -> NativeResult<Option<Value>> {
    let message = args[0].as_message()?;
    let payload = match message.data_source() {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Ok(Some(Value::String(payload)))
}

fn set_string_payload(args: &[Value]) -> NativeResult<Option<Value>> {
    args[0].as_message()?.set_data_source(args[1].clone());
    Ok(None)
}

fn set_map_payload(args: &[Value]) -> NativeResult<Option<Value>> {
    args[0].as_message()?.set_data_source(args[1].clone());
    Ok(None)
}

fn from_string(args: &[Value]) -> NativeResult<Option<Value>> {
    Ok(Some(Value::message(Message::with_payload(args[0].clone()))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn message_with_headers() -> Value {
        let message = Message::new();
        message.set_header("a", "1");
        message.set_header("b", "2");
        Value::message(message)
    }

    #[test]
    fn test_remove_header() {
        let message = message_with_headers();
        remove_header(&[message.clone(), Value::from("a")]).unwrap();
        remove_header(&[message.clone(), Value::from("zzz")]).unwrap();

        let headers = message.as_message().unwrap().headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("b"), Some(&"2".to_string()));
    }

    #[test]
    fn test_add_and_set_header() {
        let message = message_with_headers();
        add_header(&[message.clone(), Value::from("a"), Value::from("x")]).unwrap();
        assert_eq!(
            get_header(&[message.clone(), Value::from("a")]).unwrap(),
            Some(Value::from("1"))
        );

        set_header(&[message.clone(), Value::from("a"), Value::from("x")]).unwrap();
        assert_eq!(
            get_header(&[message.clone(), Value::from("a")]).unwrap(),
            Some(Value::from("x"))
        );
        assert_eq!(
            get_header(&[message, Value::from("missing")]).unwrap(),
            Some(Value::from(""))
        );
    }

    #[test]
    fn test_payloads() {
        let message = from_string(&[Value::from("hello")]).unwrap().unwrap();
        assert_eq!(
            get_string_payload(&[message.clone()]).unwrap(),
            Some(Value::from("hello"))
        );

        let map = Value::map([("k", Value::from(1))]);
        set_map_payload(&[message.clone(), map.clone()]).unwrap();
        assert_eq!(message.as_message().unwrap().data_source(), Some(map));
    }
}
