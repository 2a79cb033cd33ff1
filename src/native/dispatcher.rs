//! Single entry point for every native call.
//!
//! The dispatcher checks a call against its descriptor before any
//! implementation code runs, picks blocking or callback execution, and checks
//! the returned value against the declared return type. Failures leave here
//! with the caller's location and the qualified name attached.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::registry::{Implementation, NativeRegistry, RegistryEntry};
use super::types::{DescriptorKind, FunctionDescriptor, NativeFunction};
use crate::connector::action::{ActionCallback, ConnectorAction};
use crate::connector::runtime::ConnectorActionRuntime;
use crate::connector::types::CallMode;
use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::error::{Failure, NativeResult, RuntimeError, RuntimeResult};
use crate::eval::context::ExecutionContext;
use crate::eval::handle::ConnectorHandle;
use crate::eval::value::Value;

/// What a checked call runs. Actions carry the connector resolved from their
/// first argument.
enum Target {
    Function(Arc<dyn NativeFunction>),
    Action(Arc<dyn ConnectorAction>, ConnectorHandle),
}

pub struct Dispatcher {
    registry: Arc<NativeRegistry>,
    connectors: Arc<ConnectorActionRuntime>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<NativeRegistry>,
        connectors: Arc<ConnectorActionRuntime>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            registry,
            connectors,
            diagnostics,
        }
    }

    pub fn registry(&self) -> &Arc<NativeRegistry> {
        &self.registry
    }

    /// Calls `name` and awaits its result in the caller's task.
    #[tracing::instrument(skip(self, context, args), level = "debug")]
    pub async fn invoke(
        &self,
        name: &str,
        context: &mut ExecutionContext,
        args: Vec<Value>,
    ) -> RuntimeResult<Option<Value>> {
        match self.invoke_blocking(name, context, &args).await {
            Ok(value) => Ok(value),
            Err(error) => Err(report(self.diagnostics.as_ref(), context, name, error)),
        }
    }

    async fn invoke_blocking(
        &self,
        name: &str,
        context: &mut ExecutionContext,
        args: &[Value],
    ) -> NativeResult<Option<Value>> {
        let (entry, target) = self.check_call(name, CallMode::Blocking, args)?;
        self.diagnostics
            .emit(&Diagnostic::dispatch(name, context.location()));

        let result = match &target {
            Target::Function(function) => function.execute(context, args).await?,
            Target::Action(action, connector) => {
                self.connectors
                    .execute(action.as_ref(), connector, context, args)
                    .await?
            }
        };
        check_return(&entry.descriptor, result)
    }

    /// Calls `name` without blocking the caller. The context travels with the
    /// call and comes back through `callback`, which fires exactly once with
    /// the outcome, a panicking implementation included. Returns the spawned
    /// task when one was started; failures detected before that are delivered
    /// to the callback immediately.
    #[tracing::instrument(skip(self, context, args, callback), level = "debug")]
    pub fn invoke_with_callback(
        &self,
        name: &str,
        mut context: ExecutionContext,
        args: Vec<Value>,
        callback: ActionCallback,
    ) -> Option<JoinHandle<()>> {
        let (entry, target) = match self.check_call(name, CallMode::Callback, &args) {
            Ok(checked) => checked,
            Err(error) => {
                let failure = report(self.diagnostics.as_ref(), &context, name, error);
                callback.complete(context, Err(failure));
                return None;
            }
        };
        self.diagnostics
            .emit(&Diagnostic::dispatch(name, context.location()));

        let callback = {
            let entry = entry.clone();
            let diagnostics = self.diagnostics.clone();
            let name = name.to_string();
            ActionCallback::new(move |context, result| {
                let result = result.and_then(|value| {
                    check_return(&entry.descriptor, value)
                        .map_err(|error| report(diagnostics.as_ref(), &context, &name, error))
                });
                callback.complete(context, result)
            })
        };

        match target {
            Target::Action(action, connector) => {
                self.connectors
                    .execute_async(action, connector, context, args, callback)
            }
            Target::Function(function) => {
                let diagnostics = self.diagnostics.clone();
                let name = name.to_string();
                Some(tokio::spawn(async move {
                    let outcome = AssertUnwindSafe(function.execute(&mut context, &args))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            warn!(function = %name, "native function panicked");
                            Err(RuntimeError::native(name.as_str(), "panicked"))
                        });
                    let result = outcome
                        .map_err(|error| report(diagnostics.as_ref(), &context, &name, error));
                    callback.complete(context, result);
                }))
            }
        }
    }

    /// Lookup, mode, connector, arity and argument tags, in that order.
    fn check_call(
        &self,
        name: &str,
        mode: CallMode,
        args: &[Value],
    ) -> NativeResult<(Arc<RegistryEntry>, Target)> {
        let entry = self
            .registry
            .lookup(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
        let descriptor = &entry.descriptor;

        let target = match &entry.implementation {
            Implementation::Action(action) => {
                if let DescriptorKind::Action { modes, .. } = &descriptor.kind {
                    if !modes.supports(mode) {
                        return Err(RuntimeError::UnsupportedCallMode {
                            function: name.to_string(),
                            mode,
                        });
                    }
                }
                let connector = self.connectors.resolve_connector(action.as_ref(), args)?;
                Target::Action(action.clone(), connector.clone())
            }
            Implementation::Function(function) => Target::Function(function.clone()),
        };

        if args.len() != descriptor.arity() {
            return Err(RuntimeError::ArityMismatch {
                function: name.to_string(),
                expected: descriptor.arity(),
                found: args.len(),
            });
        }

        for (index, (param, arg)) in descriptor.params.iter().zip(args).enumerate() {
            if arg.value_type() != param.value_type {
                return Err(RuntimeError::ArgumentTypeMismatch {
                    function: name.to_string(),
                    index,
                    expected: param.value_type,
                    found: arg.value_type(),
                });
            }
        }

        debug!(function = name, %mode, "call checked");
        Ok((entry, target))
    }
}

fn check_return(
    descriptor: &FunctionDescriptor,
    value: Option<Value>,
) -> NativeResult<Option<Value>> {
    match (&descriptor.returns, &value) {
        (Some(expected), Some(found)) if found.value_type() != *expected => {
            Err(RuntimeError::ReturnTypeMismatch {
                function: descriptor.qualified_name.to_string(),
                expected: expected.to_string(),
                found: found.value_type().to_string(),
            })
        }
        (None, Some(found)) => Err(RuntimeError::ReturnTypeMismatch {
            function: descriptor.qualified_name.to_string(),
            expected: "nothing".to_string(),
            found: found.value_type().to_string(),
        }),
        _ => Ok(value),
    }
}

fn report(
    diagnostics: &dyn DiagnosticsSink,
    context: &ExecutionContext,
    name: &str,
    error: RuntimeError,
) -> Failure {
    let failure = context.fail(error).in_function(name);
    diagnostics.emit(&Diagnostic::failure(&failure));
    failure
}
