use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::transport::Transport;
use super::types::{Envelope, ReplyHandler, TransportError, TransportReply};

/// A send as the loopback transport saw it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSend {
    pub message_id: String,
    pub envelope: Envelope,
    pub properties: IndexMap<String, String>,
}

/// In-memory transport. Records every send and, when a reply handler is given,
/// echoes the envelope back to it. Can be told to fail, stall or panic.
pub struct LoopbackTransport {
    protocol: String,
    sent: Mutex<Vec<RecordedSend>>,
    calls: AtomicUsize,
    failure: Mutex<Option<TransportError>>,
    delay: Mutex<Option<Duration>>,
    panicking: AtomicBool,
    closed: AtomicBool,
}

impl LoopbackTransport {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            sent: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
            delay: Mutex::new(None),
            panicking: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Every following send fails with `error`.
    pub fn fail_with(&self, error: TransportError) {
        *self.failure.lock() = Some(error);
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Every following send sleeps for `delay` first.
    pub fn stall(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Every following send panics.
    pub fn panic_on_send(&self) {
        self.panicking.store(true, Ordering::SeqCst);
    }

    /// Number of `send` calls, failed ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<RecordedSend> {
        self.sent.lock().clone()
    }

    pub fn last_sent(&self) -> Option<RecordedSend> {
        self.sent.lock().last().cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn protocol(&self) -> &str {
        &self.protocol
    }

    async fn send(
        &self,
        envelope: Envelope,
        reply_handler: Option<Arc<dyn ReplyHandler>>,
        properties: IndexMap<String, String>,
    ) -> Result<TransportReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if self.panicking.load(Ordering::SeqCst) {
            panic!("loopback transport {} panicked on send", self.protocol);
        }

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let message_id = format!("ID:{}", Uuid::new_v4());
        debug!(protocol = %self.protocol, %message_id, kind = %envelope.kind, "loopback send");
        self.sent.lock().push(RecordedSend {
            message_id: message_id.clone(),
            envelope: envelope.clone(),
            properties,
        });

        if let Some(handler) = reply_handler {
            handler.on_reply(envelope);
        }
        Ok(TransportReply::accepted(message_id))
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::types::{EnvelopeBody, MessageKind};
    use pretty_assertions::assert_eq;

    fn envelope() -> Envelope {
        Envelope {
            kind: MessageKind::Text,
            body: EnvelopeBody::Text("hello".into()),
            headers: IndexMap::new(),
        }
    }

    struct Collect(Mutex<Vec<Envelope>>);

    impl ReplyHandler for Collect {
        fn on_reply(&self, reply: Envelope) {
            self.0.lock().push(reply);
        }
    }

    #[tokio::test]
    async fn test_records_and_replies() {
        let transport = LoopbackTransport::new("jms");
        let handler = Arc::new(Collect(Mutex::new(Vec::new())));

        let reply = transport
            .send(envelope(), Some(handler.clone()), IndexMap::new())
            .await
            .unwrap();

        assert!(reply.accepted);
        assert_eq!(transport.calls(), 1);
        assert_eq!(transport.last_sent().unwrap().envelope, envelope());
        assert_eq!(handler.0.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_and_close() {
        let transport = LoopbackTransport::new("jms");
        transport.fail_with(TransportError::Rejected("queue full".into()));
        assert_eq!(
            transport.send(envelope(), None, IndexMap::new()).await,
            Err(TransportError::Rejected("queue full".into()))
        );
        assert!(transport.sent().is_empty());

        transport.recover();
        transport.shutdown().await.unwrap();
        assert_eq!(
            transport.send(envelope(), None, IndexMap::new()).await,
            Err(TransportError::Closed)
        );
        assert_eq!(transport.calls(), 2);
    }
}
