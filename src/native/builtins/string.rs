//! `lang.string`

use super::Builtin;
use crate::error::NativeResult;
use crate::eval::value::Value;
use crate::native::registry::Implementation;
use crate::native::types::NativeSpec;

static LENGTH: NativeSpec = NativeSpec {
    package: "lang.string",
    name: "length",
    params: &[("s", "string")],
    returns: Some("int"),
    public: true,
};

static TO_UPPER_CASE: NativeSpec = NativeSpec {
    package: "lang.string",
    name: "toUpperCase",
    params: &[("s", "string")],
    returns: Some("string"),
    public: true,
};

static CONTAINS: NativeSpec = NativeSpec {
    package: "lang.string",
    name: "contains",
    params: &[("s", "string"), ("needle", "string")],
    returns: Some("boolean"),
    public: true,
};

pub fn contributions() -> Vec<Implementation> {
    vec![
        Builtin::contribution(&LENGTH, length),
        Builtin::contribution(&TO_UPPER_CASE, to_upper_case),
        Builtin::contribution(&CONTAINS, contains),
    ]
}

/// Length in characters.
fn length(args: &[Value]) -> NativeResult<Option<Value>> {
    let count = args[0].as_str()?.chars().count();
    Ok(Some(Value::Integer(count as i64)))
}

fn to_upper_case(args: &[Value]) -> NativeResult<Option<Value>> {
    Ok(Some(Value::String(args[0].as_str()?.to_uppercase())))
}

fn contains(args: &[Value]) -> NativeResult<Option<Value>> {
    let haystack = args[0].as_str()?;
    let needle = args[1].as_str()?;
    Ok(Some(Value::Boolean(haystack.contains(needle))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings() {
        assert_eq!(length(&[Value::from("héllo")]).unwrap(), Some(Value::Integer(5)));
        assert_eq!(
            to_upper_case(&[Value::from("abc")]).unwrap(),
            Some(Value::from("ABC"))
        );
        assert_eq!(
            contains(&[Value::from("orders.eu"), Value::from(".eu")]).unwrap(),
            Some(Value::Boolean(true))
        );
    }
}
