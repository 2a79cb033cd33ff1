//! Binary operator table.
//!
//! Every supported `(operator, operand pair)` maps to a pure reducer. The table
//! is built once and shared read-only; reducers never see a pair they were not
//! registered for.

use std::collections::HashMap;

use strum::IntoEnumIterator;

use super::value::Value;
use crate::ast::BinaryOperator;
use crate::error::{NativeResult, RuntimeError};

pub type Reducer = fn(&Value, &Value) -> NativeResult<Value>;

/// Operand pair after numeric promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum OperandPair {
    Integer,
    Float,
    Boolean,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperatorKey {
    pub op: BinaryOperator,
    pub operands: OperandPair,
}

#[derive(Debug, Clone)]
pub struct OperatorTable {
    reducers: HashMap<OperatorKey, Reducer>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl OperatorTable {
    pub fn empty() -> Self {
        Self {
            reducers: HashMap::new(),
        }
    }

    /// Arithmetic on integers and floats, comparisons on numbers and strings,
    /// equality and logic on booleans.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for op in BinaryOperator::iter() {
            if let Some(reducer) = integer_reducer(op) {
                table.register(op, OperandPair::Integer, reducer);
            }
            if let Some(reducer) = float_reducer(op) {
                table.register(op, OperandPair::Float, reducer);
            }
            if let Some(reducer) = string_reducer(op) {
                table.register(op, OperandPair::String, reducer);
            }
            if let Some(reducer) = boolean_reducer(op) {
                table.register(op, OperandPair::Boolean, reducer);
            }
        }
        table
    }

    pub fn register(&mut self, op: BinaryOperator, operands: OperandPair, reducer: Reducer) {
        self.reducers.insert(OperatorKey { op, operands }, reducer);
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    pub fn lookup(&self, op: BinaryOperator, operands: OperandPair) -> Option<Reducer> {
        self.reducers.get(&OperatorKey { op, operands }).copied()
    }

    /// Applies `op` to already evaluated operands. Integer pairs use the
    /// integer reducer; a Float on either side promotes the other side.
    pub fn apply(&self, op: BinaryOperator, left: &Value, right: &Value) -> NativeResult<Value> {
        let mismatch = || RuntimeError::OperandTypeMismatch {
            operator: op,
            left: left.value_type(),
            right: right.value_type(),
        };

        match (left, right) {
            (Value::Integer(_), Value::Integer(_)) => {
                let reducer = self.lookup(op, OperandPair::Integer).ok_or_else(mismatch)?;
                reducer(left, right)
            }
            (Value::Float(_) | Value::Integer(_), Value::Float(_) | Value::Integer(_)) => {
                let reducer = self.lookup(op, OperandPair::Float).ok_or_else(mismatch)?;
                reducer(&promote(left), &promote(right))
            }
            (Value::Boolean(_), Value::Boolean(_)) => {
                let reducer = self.lookup(op, OperandPair::Boolean).ok_or_else(mismatch)?;
                reducer(left, right)
            }
            (Value::String(_), Value::String(_)) => {
                let reducer = self.lookup(op, OperandPair::String).ok_or_else(mismatch)?;
                reducer(left, right)
            }
            _ => Err(mismatch()),
        }
    }
}

fn promote(value: &Value) -> Value {
    match value {
        Value::Integer(i) => Value::Float(*i as f64),
        other => other.clone(),
    }
}

fn ints(left: &Value, right: &Value) -> NativeResult<(i64, i64)> {
    Ok((left.as_integer()?, right.as_integer()?))
}

fn floats(left: &Value, right: &Value) -> NativeResult<(f64, f64)> {
    Ok((left.as_float()?, right.as_float()?))
}

fn strs<'a>(left: &'a Value, right: &'a Value) -> NativeResult<(&'a str, &'a str)> {
    Ok((left.as_str()?, right.as_str()?))
}

fn bools(left: &Value, right: &Value) -> NativeResult<(bool, bool)> {
    Ok((left.as_boolean()?, right.as_boolean()?))
}

fn integer_reducer(op: BinaryOperator) -> Option<Reducer> {
    use BinaryOperator::*;
    let reducer: Reducer = match op {
        Add => |l, r| ints(l, r).map(|(a, b)| Value::Integer(a.wrapping_add(b))),
        Subtract => |l, r| ints(l, r).map(|(a, b)| Value::Integer(a.wrapping_sub(b))),
        Multiply => |l, r| ints(l, r).map(|(a, b)| Value::Integer(a.wrapping_mul(b))),
        Divide => |l, r| {
            let (a, b) = ints(l, r)?;
            if b == 0 {
                return Err(RuntimeError::DivisionByZero { operator: Divide });
            }
            Ok(Value::Integer(a.wrapping_div(b)))
        },
        Modulo => |l, r| {
            let (a, b) = ints(l, r)?;
            if b == 0 {
                return Err(RuntimeError::DivisionByZero { operator: Modulo });
            }
            Ok(Value::Integer(a.wrapping_rem(b)))
        },
        Equal => |l, r| ints(l, r).map(|(a, b)| Value::Boolean(a == b)),
        NotEqual => |l, r| ints(l, r).map(|(a, b)| Value::Boolean(a != b)),
        LessThan => |l, r| ints(l, r).map(|(a, b)| Value::Boolean(a < b)),
        GreaterThan => |l, r| ints(l, r).map(|(a, b)| Value::Boolean(a > b)),
        LessThanEqual => |l, r| ints(l, r).map(|(a, b)| Value::Boolean(a <= b)),
        GreaterThanEqual => |l, r| ints(l, r).map(|(a, b)| Value::Boolean(a >= b)),
        And | Or => return None,
    };
    Some(reducer)
}

fn float_reducer(op: BinaryOperator) -> Option<Reducer> {
    use BinaryOperator::*;
    let reducer: Reducer = match op {
        Add => |l, r| floats(l, r).map(|(a, b)| Value::Float(a + b)),
        Subtract => |l, r| floats(l, r).map(|(a, b)| Value::Float(a - b)),
        Multiply => |l, r| floats(l, r).map(|(a, b)| Value::Float(a * b)),
        Divide => |l, r| floats(l, r).map(|(a, b)| Value::Float(a / b)),
        Modulo => |l, r| floats(l, r).map(|(a, b)| Value::Float(a % b)),
        Equal => |l, r| floats(l, r).map(|(a, b)| Value::Boolean(a == b)),
        NotEqual => |l, r| floats(l, r).map(|(a, b)| Value::Boolean(a != b)),
        LessThan => |l, r| floats(l, r).map(|(a, b)| Value::Boolean(a < b)),
        GreaterThan => |l, r| floats(l, r).map(|(a, b)| Value::Boolean(a > b)),
        LessThanEqual => |l, r| floats(l, r).map(|(a, b)| Value::Boolean(a <= b)),
        GreaterThanEqual => |l, r| floats(l, r).map(|(a, b)| Value::Boolean(a >= b)),
        And | Or => return None,
    };
    Some(reducer)
}

fn string_reducer(op: BinaryOperator) -> Option<Reducer> {
    use BinaryOperator::*;
    let reducer: Reducer = match op {
        Equal => |l, r| strs(l, r).map(|(a, b)| Value::Boolean(a == b)),
        NotEqual => |l, r| strs(l, r).map(|(a, b)| Value::Boolean(a != b)),
        LessThan => |l, r| strs(l, r).map(|(a, b)| Value::Boolean(a < b)),
        GreaterThan => |l, r| strs(l, r).map(|(a, b)| Value::Boolean(a > b)),
        LessThanEqual => |l, r| strs(l, r).map(|(a, b)| Value::Boolean(a <= b)),
        GreaterThanEqual => |l, r| strs(l, r).map(|(a, b)| Value::Boolean(a >= b)),
        _ => return None,
    };
    Some(reducer)
}

fn boolean_reducer(op: BinaryOperator) -> Option<Reducer> {
    use BinaryOperator::*;
    let reducer: Reducer = match op {
        Equal => |l, r| bools(l, r).map(|(a, b)| Value::Boolean(a == b)),
        NotEqual => |l, r| bools(l, r).map(|(a, b)| Value::Boolean(a != b)),
        And => |l, r| bools(l, r).map(|(a, b)| Value::Boolean(a && b)),
        Or => |l, r| bools(l, r).map(|(a, b)| Value::Boolean(a || b)),
        _ => return None,
    };
    Some(reducer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::eval::value::ValueType;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn apply(op: BinaryOperator, l: Value, r: Value) -> NativeResult<Value> {
        OperatorTable::standard().apply(op, &l, &r)
    }

    #[test]
    fn test_integer_subtraction() {
        assert_eq!(
            apply(BinaryOperator::Subtract, Value::from(10), Value::from(4)).unwrap(),
            Value::Integer(6)
        );
        assert_eq!(
            apply(BinaryOperator::Subtract, Value::from(i64::MIN), Value::from(1)).unwrap(),
            Value::Integer(i64::MAX)
        );
        assert_eq!(
            apply(BinaryOperator::Subtract, Value::from(7), Value::from(0)).unwrap(),
            Value::Integer(7)
        );
    }

    #[test]
    fn test_mixed_pair_promotes_to_float() {
        assert_eq!(
            apply(BinaryOperator::Subtract, Value::from(3), Value::from(2.0)).unwrap(),
            Value::Float(1.0)
        );
        assert_eq!(
            apply(BinaryOperator::Multiply, Value::from(1.5), Value::from(2)).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            apply(BinaryOperator::LessThan, Value::from(1), Value::from(1.5)).unwrap(),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_integer_division_by_zero() {
        for op in [BinaryOperator::Divide, BinaryOperator::Modulo] {
            let err = apply(op, Value::from(1), Value::from(0)).unwrap_err();
            assert_eq!(err.kind(), FailureKind::DivisionByZero);
        }
    }

    #[test]
    fn test_min_divided_by_minus_one_wraps() {
        assert_eq!(
            apply(BinaryOperator::Divide, Value::from(i64::MIN), Value::from(-1)).unwrap(),
            Value::Integer(i64::MIN)
        );
        assert_eq!(
            apply(BinaryOperator::Modulo, Value::from(i64::MIN), Value::from(-1)).unwrap(),
            Value::Integer(0)
        );
    }

    #[test]
    fn test_float_division_by_zero() {
        assert_eq!(
            apply(BinaryOperator::Divide, Value::from(1.0), Value::from(0.0)).unwrap(),
            Value::Float(f64::INFINITY)
        );
        assert_eq!(
            apply(BinaryOperator::Divide, Value::from(-1.0), Value::from(0)).unwrap(),
            Value::Float(f64::NEG_INFINITY)
        );
        match apply(BinaryOperator::Divide, Value::from(0.0), Value::from(0.0)).unwrap() {
            Value::Float(f) => assert!(f.is_nan()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_operand_type_mismatch() {
        let err = apply(BinaryOperator::Subtract, Value::from("a"), Value::from(1)).unwrap_err();
        match err {
            RuntimeError::OperandTypeMismatch {
                operator,
                left,
                right,
            } => {
                assert_eq!(operator, BinaryOperator::Subtract);
                assert_eq!(left, ValueType::String);
                assert_eq!(right, ValueType::Integer);
            }
            other => panic!("unexpected: {:?}", other),
        }

        let err = apply(BinaryOperator::Add, Value::from(true), Value::from(false)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::TypeMismatch);
    }

    #[test]
    fn test_string_and_boolean_operators() {
        assert_eq!(
            apply(BinaryOperator::Equal, Value::from("a"), Value::from("a")).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            apply(BinaryOperator::LessThan, Value::from("a"), Value::from("b")).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            apply(BinaryOperator::Or, Value::from(false), Value::from(true)).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            apply(BinaryOperator::And, Value::from(true), Value::from(false)).unwrap(),
            Value::Boolean(false)
        );
    }

    proptest! {
        #[test]
        fn prop_integer_subtraction_wraps(a in any::<i64>(), b in any::<i64>()) {
            let result = apply(BinaryOperator::Subtract, Value::from(a), Value::from(b)).unwrap();
            prop_assert_eq!(result, Value::Integer(a.wrapping_sub(b)));
        }

        #[test]
        fn prop_integer_division_matches_wrapping(a in any::<i64>(), b in any::<i64>()) {
            let result = apply(BinaryOperator::Divide, Value::from(a), Value::from(b));
            if b == 0 {
                prop_assert!(result.is_err());
            } else {
                prop_assert_eq!(result.unwrap(), Value::Integer(a.wrapping_div(b)));
            }
        }
    }
}
