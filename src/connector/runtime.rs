//! Execution of connector actions.
//!
//! Both modes share the same front half: resolve the connector handle, build
//! the outbound request, merge properties. Blocking mode awaits the transport
//! in the caller's task; callback mode moves the context into a spawned task
//! and hands it back through the callback exactly once.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use indexmap::IndexMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::action::{ActionCallback, ConnectorAction};
use super::manager::ConnectorManager;
use super::types::{OutboundRequest, TransportError, TransportReply};
use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::error::{NativeResult, RuntimeError, RuntimeResult};
use crate::eval::context::{CompletionHandle, ExecutionContext};
use crate::eval::handle::ConnectorHandle;
use crate::eval::value::Value;

pub struct ConnectorActionRuntime {
    manager: Arc<ConnectorManager>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    timeout: Duration,
}

impl ConnectorActionRuntime {
    pub fn new(
        manager: Arc<ConnectorManager>,
        diagnostics: Arc<dyn DiagnosticsSink>,
        timeout: Duration,
    ) -> Self {
        Self {
            manager,
            diagnostics,
            timeout,
        }
    }

    pub fn manager(&self) -> &Arc<ConnectorManager> {
        &self.manager
    }

    /// The first argument must be a connector of the action's family.
    pub fn resolve_connector<'a>(
        &self,
        action: &dyn ConnectorAction,
        args: &'a [Value],
    ) -> NativeResult<&'a ConnectorHandle> {
        let expected = action.connector_family();
        let mismatch = |found: String| RuntimeError::ConnectorTypeMismatch {
            action: action.spec().qualified_name().to_string(),
            expected: expected.to_string(),
            found,
        };
        match args.first() {
            Some(Value::Connector(handle)) if handle.family() == expected => Ok(handle),
            Some(Value::Connector(handle)) => Err(mismatch(format!(
                "{} connector '{}'",
                handle.family(),
                handle.name()
            ))),
            Some(other) => Err(mismatch(other.value_type().to_string())),
            None => Err(mismatch("nothing".to_string())),
        }
    }

    /// Builds the outbound request for an already resolved connector and
    /// merges its properties.
    fn build_request(
        &self,
        action: &dyn ConnectorAction,
        connector: &ConnectorHandle,
        context: &ExecutionContext,
        args: &[Value],
    ) -> NativeResult<OutboundRequest> {
        let mut request = action.prepare(context, args)?;
        request.properties = merge_properties(connector.properties(), request.properties);
        Ok(request)
    }

    async fn send(
        manager: &ConnectorManager,
        limit: Duration,
        family: &str,
        request: OutboundRequest,
    ) -> Result<TransportReply, TransportError> {
        let transport = manager.transport(family)?;
        let send = transport.send(request.envelope, request.reply_handler, request.properties);
        match tokio::time::timeout(limit, send).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(limit)),
        }
    }

    fn wrap(action: &str, source: TransportError) -> RuntimeError {
        RuntimeError::ConnectorExecutionFailure {
            action: action.to_string(),
            source,
        }
    }

    /// Runs the action in the caller's task. `connector` is the handle the
    /// dispatcher resolved from the first argument.
    #[tracing::instrument(
        skip(self, action, connector, context, args),
        level = "debug",
        fields(action = %action.spec().qualified_name(), connector = connector.name())
    )]
    pub async fn execute(
        &self,
        action: &dyn ConnectorAction,
        connector: &ConnectorHandle,
        context: &mut ExecutionContext,
        args: &[Value],
    ) -> NativeResult<Option<Value>> {
        let name = action.spec().qualified_name().to_string();
        let request = self.build_request(action, connector, context, args)?;
        debug!(family = connector.family(), properties = request.properties.len(), "sending");

        let reply = Self::send(&self.manager, self.timeout, connector.family(), request)
            .await
            .map_err(|e| Self::wrap(&name, e))?;
        action.complete(reply)
    }

    /// Validates and prepares in the caller's task, then sends on a spawned
    /// task. `callback` receives the context back together with the outcome,
    /// also when the transport or `complete` panics. Returns the task handle
    /// when a send was started.
    pub fn execute_async(
        &self,
        action: Arc<dyn ConnectorAction>,
        connector: ConnectorHandle,
        mut context: ExecutionContext,
        args: Vec<Value>,
        callback: ActionCallback,
    ) -> Option<JoinHandle<()>> {
        let name = action.spec().qualified_name().to_string();
        let prepared = action
            .validate(&args)
            .and_then(|_| self.build_request(action.as_ref(), &connector, &context, &args));

        let request = match prepared {
            Ok(request) => request,
            Err(error) => {
                let failure = context.fail(error).in_function(&name);
                self.diagnostics.emit(&Diagnostic::failure(&failure));
                callback.complete(context, Err(failure));
                return None;
            }
        };

        let handle = CompletionHandle::new(name.clone());
        debug!(
            action = %name,
            correlation_id = %handle.correlation_id,
            family = connector.family(),
            "spawning send"
        );
        context.set_completion(handle);

        let manager = self.manager.clone();
        let diagnostics = self.diagnostics.clone();
        let limit = self.timeout;
        Some(tokio::spawn(async move {
            // コンテキストは外側に残し、パニックしてもコールバックに戻す
            let outcome = AssertUnwindSafe(async {
                match Self::send(&manager, limit, connector.family(), request).await {
                    Ok(reply) => action.complete(reply),
                    Err(e) => Err(Self::wrap(&name, e)),
                }
            })
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                warn!(action = %name, "connector send panicked");
                Err(Self::wrap(&name, TransportError::Panicked))
            });

            let result: RuntimeResult<Option<Value>> = outcome.map_err(|error| {
                let failure = context.fail(error).in_function(&name);
                diagnostics.emit(&Diagnostic::failure(&failure));
                failure
            });
            callback.complete(context, result);
        }))
    }
}

/// Connector properties first, then the action's; the action wins on
/// collision.
pub fn merge_properties(
    connector: &IndexMap<String, String>,
    action: IndexMap<String, String>,
) -> IndexMap<String, String> {
    let mut merged = connector.clone();
    merged.extend(action);
    merged
}
