use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use super::types::{
    DescriptorKind, FunctionDescriptor, NativeFunction, NativeSpec, ParamSpec, Visibility,
};
use crate::connector::action::ConnectorAction;
use crate::error::RegistryError;
use crate::eval::value::ValueType;

lazy_static! {
    static ref PACKAGE_PATTERN: Regex =
        Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z][a-z0-9_]*)*$").expect("valid package pattern");
    static ref NAME_PATTERN: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name pattern");
}

/// What a registered name runs.
#[derive(Clone)]
pub enum Implementation {
    Function(Arc<dyn NativeFunction>),
    Action(Arc<dyn ConnectorAction>),
}

impl Implementation {
    pub fn spec(&self) -> &'static NativeSpec {
        match self {
            Implementation::Function(f) => f.spec(),
            Implementation::Action(a) => a.spec(),
        }
    }
}

impl From<Arc<dyn NativeFunction>> for Implementation {
    fn from(function: Arc<dyn NativeFunction>) -> Self {
        Implementation::Function(function)
    }
}

impl From<Arc<dyn ConnectorAction>> for Implementation {
    fn from(action: Arc<dyn ConnectorAction>) -> Self {
        Implementation::Action(action)
    }
}

pub struct RegistryEntry {
    pub descriptor: FunctionDescriptor,
    pub implementation: Implementation,
}

/// Qualified name to descriptor and implementation. Built once from a static
/// contribution list and immutable afterwards.
#[derive(Default)]
pub struct NativeRegistry {
    entries: HashMap<String, Arc<RegistryEntry>>,
}

impl NativeRegistry {
    /// Registers every contribution, failing on the first invalid one.
    pub fn build<I>(contributions: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Implementation>,
    {
        let mut entries = HashMap::new();
        for implementation in contributions {
            let descriptor = describe(&implementation)?;
            let key = descriptor.qualified_name.to_string();
            if entries.contains_key(&key) {
                return Err(RegistryError::DuplicateName(key));
            }
            debug!(name = %key, "registered native");
            entries.insert(
                key,
                Arc::new(RegistryEntry {
                    descriptor,
                    implementation,
                }),
            );
        }
        info!(count = entries.len(), "native registry built");
        Ok(Self { entries })
    }

    pub fn lookup(&self, qualified_name: &str) -> Option<Arc<RegistryEntry>> {
        self.entries.get(qualified_name).cloned()
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.entries.contains_key(qualified_name)
    }

    /// Descriptors sorted by qualified name.
    pub fn descriptors(&self) -> Vec<&FunctionDescriptor> {
        let mut descriptors: Vec<_> = self.entries.values().map(|e| &e.descriptor).collect();
        descriptors.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn resolve_type(function: &str, type_name: &str) -> Result<ValueType, RegistryError> {
    ValueType::from_str(type_name).map_err(|_| RegistryError::UnknownType {
        function: function.to_string(),
        type_name: type_name.to_string(),
    })
}

fn describe(implementation: &Implementation) -> Result<FunctionDescriptor, RegistryError> {
    let spec = implementation.spec();
    let qualified_name = spec.qualified_name();
    let display = qualified_name.to_string();
    if !PACKAGE_PATTERN.is_match(spec.package) || !NAME_PATTERN.is_match(spec.name) {
        return Err(RegistryError::MalformedName(display));
    }

    let params = spec
        .params
        .iter()
        .map(|(name, type_name)| {
            Ok(ParamSpec {
                name: name.to_string(),
                value_type: resolve_type(&display, type_name)?,
            })
        })
        .collect::<Result<Vec<_>, RegistryError>>()?;
    let returns = spec
        .returns
        .map(|type_name| resolve_type(&display, type_name))
        .transpose()?;

    let kind = match implementation {
        Implementation::Function(_) => DescriptorKind::Function,
        Implementation::Action(action) => {
            if params.first().map(|p| p.value_type) != Some(ValueType::Connector) {
                return Err(RegistryError::MissingConnectorParameter(display));
            }
            let modes = action.modes();
            if modes.is_empty() {
                return Err(RegistryError::NoExecutionMode(display));
            }
            DescriptorKind::Action {
                connector_family: action.connector_family().to_string(),
                modes,
            }
        }
    };

    Ok(FunctionDescriptor {
        qualified_name,
        params,
        returns,
        visibility: if spec.public {
            Visibility::Public
        } else {
            Visibility::Private
        },
        kind,
    })
}
