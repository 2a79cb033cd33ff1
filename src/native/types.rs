use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use crate::connector::types::ExecutionModes;
use crate::error::{NativeResult, RegistryError};
use crate::eval::context::ExecutionContext;
use crate::eval::value::{Value, ValueType};

/// Self-description a native contribution registers with. Types are given by
/// name and resolved when the registry is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSpec {
    pub package: &'static str,
    pub name: &'static str,
    pub params: &'static [(&'static str, &'static str)],
    pub returns: Option<&'static str>,
    pub public: bool,
}

impl NativeSpec {
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(self.package, self.name)
    }
}

/// `package:name`, e.g. `net.jms:send`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QualifiedName {
    pub package: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.name)
    }
}

impl FromStr for QualifiedName {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((package, name)) if !package.is_empty() && !name.is_empty() => {
                Ok(QualifiedName::new(package, name))
            }
            _ => Err(RegistryError::MalformedName(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DescriptorKind {
    Function,
    Action {
        connector_family: String,
        modes: ExecutionModes,
    },
}

/// Resolved, validated form of a [`NativeSpec`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDescriptor {
    pub qualified_name: QualifiedName,
    pub params: Vec<ParamSpec>,
    pub returns: Option<ValueType>,
    pub visibility: Visibility,
    pub kind: DescriptorKind,
}

impl FunctionDescriptor {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_action(&self) -> bool {
        matches!(self.kind, DescriptorKind::Action { .. })
    }

    /// `pkg:name(a: int, b: string) -> boolean`
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| format!("{}: {}", p.name, p.value_type))
            .collect::<Vec<_>>()
            .join(", ");
        match self.returns {
            Some(returns) => format!("{}({}) -> {}", self.qualified_name, params, returns),
            None => format!("{}({})", self.qualified_name, params),
        }
    }
}

/// A built-in implemented in Rust. Argument tags are checked by the dispatcher
/// before `execute` runs.
#[async_trait]
pub trait NativeFunction: Send + Sync {
    fn spec(&self) -> &'static NativeSpec;

    async fn execute(
        &self,
        context: &mut ExecutionContext,
        args: &[Value],
    ) -> NativeResult<Option<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_qualified_name_parse() {
        let name: QualifiedName = "lang.message:removeHeader".parse().unwrap();
        assert_eq!(name, QualifiedName::new("lang.message", "removeHeader"));
        assert_eq!(name.to_string(), "lang.message:removeHeader");
        assert!("removeHeader".parse::<QualifiedName>().is_err());
        assert!(":x".parse::<QualifiedName>().is_err());
    }

    #[test]
    fn test_signature() {
        let descriptor = FunctionDescriptor {
            qualified_name: QualifiedName::new("lang.string", "length"),
            params: vec![ParamSpec {
                name: "s".into(),
                value_type: ValueType::String,
            }],
            returns: Some(ValueType::Integer),
            visibility: Visibility::Public,
            kind: DescriptorKind::Function,
        };
        assert_eq!(descriptor.signature(), "lang.string:length(s: string) -> int");
    }
}
