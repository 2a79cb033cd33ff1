use std::fmt;

use tokio::sync::oneshot;

use super::types::{ExecutionModes, OutboundRequest, TransportReply};
use crate::error::{NativeResult, RuntimeResult};
use crate::eval::context::ExecutionContext;
use crate::eval::value::Value;
use crate::native::types::NativeSpec;

/// A native call that talks to an external service through a connector.
///
/// The runtime owns the protocol: it resolves the connector, calls
/// [`prepare`](Self::prepare) to build the outbound request, sends it, and
/// hands the reply to [`complete`](Self::complete).
pub trait ConnectorAction: Send + Sync {
    fn spec(&self) -> &'static NativeSpec;

    /// Family of the connector expected as the first argument.
    fn connector_family(&self) -> &'static str;

    fn modes(&self) -> ExecutionModes;

    /// Pre-flight check run before an asynchronous send. A failure here never
    /// reaches the transport.
    fn validate(&self, _args: &[Value]) -> NativeResult<()> {
        Ok(())
    }

    fn prepare(&self, context: &ExecutionContext, args: &[Value]) -> NativeResult<OutboundRequest>;

    fn complete(&self, reply: TransportReply) -> NativeResult<Option<Value>>;
}

pub type CompletionResult = (ExecutionContext, RuntimeResult<Option<Value>>);

/// One-shot completion for a callback-mode call. Consumed on invocation, so it
/// can fire at most once.
pub struct ActionCallback {
    inner: Box<dyn FnOnce(ExecutionContext, RuntimeResult<Option<Value>>) + Send>,
}

impl ActionCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(ExecutionContext, RuntimeResult<Option<Value>>) + Send + 'static,
    {
        Self { inner: Box::new(f) }
    }

    /// Callback that forwards its completion to a oneshot receiver.
    pub fn channel() -> (Self, oneshot::Receiver<CompletionResult>) {
        let (tx, rx) = oneshot::channel();
        let callback = Self::new(move |context, result| {
            let _ = tx.send((context, result));
        });
        (callback, rx)
    }

    pub fn complete(self, context: ExecutionContext, result: RuntimeResult<Option<Value>>) {
        (self.inner)(context, result)
    }
}

impl fmt::Debug for ActionCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActionCallback")
    }
}
