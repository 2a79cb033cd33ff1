use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use uuid::Uuid;

use super::value::Value;
use crate::ast::SourceLocation;
use crate::error::{Failure, NativeResult, RuntimeError};

/// Correlates an asynchronous action with the context that started it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionHandle {
    pub correlation_id: Uuid,
    pub action: String,
}

impl CompletionHandle {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            action: action.into(),
        }
    }
}

/// 実行コンテキスト
///
/// Owned by exactly one language-level call chain. Asynchronous actions take it
/// by value and hand it back through their callback, so it is never reachable
/// from two executions at once.
#[derive(Debug)]
pub struct ExecutionContext {
    trace_id: String,
    scopes: Vec<HashMap<String, Value>>,
    locations: Vec<SourceLocation>,
    completion: Option<CompletionHandle>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        let current_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::with_trace_id(format!("trace-{}-{}", current_time, Uuid::new_v4().simple()))
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            scopes: vec![HashMap::new()],
            locations: Vec::new(),
            completion: None,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// 変数アクセス（スコープチェーンを遡って検索）
    pub fn get_variable(&self, name: &str) -> NativeResult<Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
    }

    /// Binds `name` in the innermost scope.
    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        debug!(trace_id = %self.trace_id, variable = %name, "bind");
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// The outermost scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn push_location(&mut self, location: SourceLocation) {
        self.locations.push(location);
    }

    pub fn pop_location(&mut self) -> Option<SourceLocation> {
        self.locations.pop()
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.locations.last()
    }

    pub fn location_stack(&self) -> &[SourceLocation] {
        &self.locations
    }

    /// Attaches the current location to `error`.
    pub fn fail(&self, error: RuntimeError) -> Failure {
        Failure::new(error).at(self.location())
    }

    pub fn completion(&self) -> Option<&CompletionHandle> {
        self.completion.as_ref()
    }

    pub fn set_completion(&mut self, handle: CompletionHandle) {
        self.completion = Some(handle);
    }

    pub fn take_completion(&mut self) -> Option<CompletionHandle> {
        self.completion.take()
    }
}
