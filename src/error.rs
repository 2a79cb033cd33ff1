use std::fmt;

use thiserror::Error;

use crate::ast::{BinaryOperator, SourceLocation};
use crate::config::ConfigError;
use crate::parser::ParseError;
use crate::connector::types::{CallMode, MessageKind, TransportError};
use crate::eval::value::ValueType;

/// Discriminant of [`RuntimeError`], used by diagnostics records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, serde::Serialize)]
pub enum FailureKind {
    TypeMismatch,
    ArityMismatch,
    UnknownFunction,
    DivisionByZero,
    ConnectorTypeMismatch,
    PayloadKindMismatch,
    ConnectorExecutionFailure,
    ValidationFailure,
    UndefinedVariable,
    NoValue,
    ReturnTypeMismatch,
    UnsupportedCallMode,
    UnknownConnector,
    Native,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: ValueType, found: ValueType },

    #[error("operator '{operator}' is not defined for {left} and {right}")]
    OperandTypeMismatch {
        operator: BinaryOperator,
        left: ValueType,
        right: ValueType,
    },

    #[error("argument {index} of '{function}': expected {expected}, found {found}")]
    ArgumentTypeMismatch {
        function: String,
        index: usize,
        expected: ValueType,
        found: ValueType,
    },

    #[error("'{function}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{operator} by zero")]
    DivisionByZero { operator: BinaryOperator },

    #[error("'{action}' needs a {expected} connector as its first argument, found {found}")]
    ConnectorTypeMismatch {
        action: String,
        expected: String,
        found: String,
    },

    #[error("if the message type is {kind}, {requirement}")]
    PayloadKindMismatch {
        kind: MessageKind,
        requirement: String,
    },

    #[error("'{action}' failed while talking to the transport: {source}")]
    ConnectorExecutionFailure {
        action: String,
        #[source]
        source: TransportError,
    },

    #[error("'{action}' rejected by validation: {reason}")]
    ValidationFailure { action: String, reason: String },

    #[error("undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("'{0}' returns no value")]
    NoValue(String),

    #[error("'{function}' declared to return {expected}, returned {found}")]
    ReturnTypeMismatch {
        function: String,
        expected: String,
        found: String,
    },

    #[error("'{function}' cannot be called in {mode} mode")]
    UnsupportedCallMode { function: String, mode: CallMode },

    #[error("unknown connector: {0}")]
    UnknownConnector(String),

    #[error("{function}: {message}")]
    Native { function: String, message: String },
}

impl RuntimeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RuntimeError::TypeMismatch { .. }
            | RuntimeError::OperandTypeMismatch { .. }
            | RuntimeError::ArgumentTypeMismatch { .. } => FailureKind::TypeMismatch,
            RuntimeError::ArityMismatch { .. } => FailureKind::ArityMismatch,
            RuntimeError::UnknownFunction(_) => FailureKind::UnknownFunction,
            RuntimeError::DivisionByZero { .. } => FailureKind::DivisionByZero,
            RuntimeError::ConnectorTypeMismatch { .. } => FailureKind::ConnectorTypeMismatch,
            RuntimeError::PayloadKindMismatch { .. } => FailureKind::PayloadKindMismatch,
            RuntimeError::ConnectorExecutionFailure { .. } => {
                FailureKind::ConnectorExecutionFailure
            }
            RuntimeError::ValidationFailure { .. } => FailureKind::ValidationFailure,
            RuntimeError::UndefinedVariable(_) => FailureKind::UndefinedVariable,
            RuntimeError::NoValue(_) => FailureKind::NoValue,
            RuntimeError::ReturnTypeMismatch { .. } => FailureKind::ReturnTypeMismatch,
            RuntimeError::UnsupportedCallMode { .. } => FailureKind::UnsupportedCallMode,
            RuntimeError::UnknownConnector(_) => FailureKind::UnknownConnector,
            RuntimeError::Native { .. } => FailureKind::Native,
        }
    }

    pub fn native(function: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Native {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// A [`RuntimeError`] as seen by the caller: the location that was current on
/// the context when it surfaced, and the qualified name being dispatched.
#[derive(Debug)]
pub struct Failure {
    pub error: RuntimeError,
    pub location: Option<SourceLocation>,
    pub qualified_name: Option<String>,
}

impl Failure {
    pub fn new(error: RuntimeError) -> Self {
        Self {
            error,
            location: None,
            qualified_name: None,
        }
    }

    pub fn at(mut self, location: Option<&SourceLocation>) -> Self {
        if self.location.is_none() {
            self.location = location.cloned();
        }
        self
    }

    pub fn in_function(mut self, name: &str) -> Self {
        if self.qualified_name.is_none() {
            self.qualified_name = Some(name.to_string());
        }
        self
    }

    pub fn kind(&self) -> FailureKind {
        self.error.kind()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<RuntimeError> for Failure {
    fn from(error: RuntimeError) -> Self {
        Failure::new(error)
    }
}

/// Startup-time registration failures. Always fatal to initialization.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("duplicate registration of {0}")]
    DuplicateName(String),
    #[error("{function}: '{type_name}' is not a value type")]
    UnknownType { function: String, type_name: String },
    #[error("malformed qualified name: {0}")]
    MalformedName(String),
    #[error("{0}: connector actions take the connector as their first parameter")]
    MissingConnectorParameter(String),
    #[error("{0}: connector action supports no execution mode")]
    NoExecutionMode(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Runtime failure: {0}")]
    Failure(#[from] Failure),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RuntimeError> for Error {
    fn from(error: RuntimeError) -> Self {
        Error::Failure(Failure::new(error))
    }
}

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}

/// Result of a native implementation or value-model operation.
pub type NativeResult<T> = Result<T, RuntimeError>;
/// Result surfaced to callers of the evaluator and dispatcher.
pub type RuntimeResult<T> = Result<T, Failure>;
pub type InternalResult<T> = Result<T, Error>;
