//! `lang.math`

use super::Builtin;
use crate::error::NativeResult;
use crate::eval::value::Value;
use crate::native::registry::Implementation;
use crate::native::types::NativeSpec;

static ABS: NativeSpec = NativeSpec {
    package: "lang.math",
    name: "abs",
    params: &[("x", "float")],
    returns: Some("float"),
    public: true,
};

static POW: NativeSpec = NativeSpec {
    package: "lang.math",
    name: "pow",
    params: &[("base", "float"), ("exponent", "float")],
    returns: Some("float"),
    public: true,
};

pub fn contributions() -> Vec<Implementation> {
    vec![
        Builtin::contribution(&ABS, abs),
        Builtin::contribution(&POW, pow),
    ]
}

fn abs(args: &[Value]) -> NativeResult<Option<Value>> {
    Ok(Some(Value::Float(args[0].as_float()?.abs())))
}

fn pow(args: &[Value]) -> NativeResult<Option<Value>> {
    let base = args[0].as_float()?;
    let exponent = args[1].as_float()?;
    Ok(Some(Value::Float(base.powf(exponent))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math() {
        assert_eq!(abs(&[Value::from(-2.5)]).unwrap(), Some(Value::Float(2.5)));
        assert_eq!(
            pow(&[Value::from(2.0), Value::from(10.0)]).unwrap(),
            Some(Value::Float(1024.0))
        );
    }
}
