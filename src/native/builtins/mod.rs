//! Built-in native library.

pub mod math;
pub mod message;
pub mod string;

use std::sync::Arc;

use async_trait::async_trait;

use super::registry::Implementation;
use super::types::{NativeFunction, NativeSpec};
use crate::error::NativeResult;
use crate::eval::context::ExecutionContext;
use crate::eval::value::Value;

pub type BuiltinBody = fn(&[Value]) -> NativeResult<Option<Value>>;

/// A native function that needs nothing but its arguments.
pub struct Builtin {
    spec: &'static NativeSpec,
    body: BuiltinBody,
}

impl Builtin {
    pub const fn new(spec: &'static NativeSpec, body: BuiltinBody) -> Self {
        Self { spec, body }
    }

    pub fn contribution(spec: &'static NativeSpec, body: BuiltinBody) -> Implementation {
        Implementation::Function(Arc::new(Self::new(spec, body)))
    }
}

#[async_trait]
impl NativeFunction for Builtin {
    fn spec(&self) -> &'static NativeSpec {
        self.spec
    }

    async fn execute(
        &self,
        _context: &mut ExecutionContext,
        args: &[Value],
    ) -> NativeResult<Option<Value>> {
        (self.body)(args)
    }
}

/// Every built-in function, in registration order.
pub fn standard_library() -> Vec<Implementation> {
    let mut library = message::contributions();
    library.extend(math::contributions());
    library.extend(string::contributions());
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::registry::NativeRegistry;

    #[test]
    fn test_standard_library_registers() {
        let registry = NativeRegistry::build(standard_library()).unwrap();
        assert!(registry.contains("lang.message:removeHeader"));
        assert!(registry.contains("lang.math:pow"));
        assert!(registry.contains("lang.string:toUpperCase"));
    }
}
