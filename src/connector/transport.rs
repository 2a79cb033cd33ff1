use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use super::types::{Envelope, ReplyHandler, TransportError, TransportReply};

/// Wire client for one protocol family. Implementations live outside the core;
/// [`LoopbackTransport`](super::loopback::LoopbackTransport) records sends in
/// memory.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Protocol family served, matched against connector handles.
    fn protocol(&self) -> &str;

    async fn send(
        &self,
        envelope: Envelope,
        reply_handler: Option<Arc<dyn ReplyHandler>>,
        properties: IndexMap<String, String>,
    ) -> Result<TransportReply, TransportError>;

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
