//! Structured records for failures and dispatch activity.
//!
//! Every failure path in the dispatcher and connector runtime emits a
//! [`Diagnostic`]. Where records go is up to the [`DiagnosticsSink`]: the
//! default setup logs them through `tracing` and fans them out over a
//! broadcast channel for anything that subscribed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::ast::SourceLocation;
use crate::error::{Failure, FailureKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum::Display, Serialize)]
#[strum(serialize_all = "lowercase")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub location: Option<SourceLocation>,
    pub qualified_name: Option<String>,
    pub kind: Option<FailureKind>,
    pub message: String,
    pub level: DiagnosticLevel,
    pub timestamp: DateTime<Utc>,
}

impl Diagnostic {
    pub fn failure(failure: &Failure) -> Self {
        Self {
            location: failure.location.clone(),
            qualified_name: failure.qualified_name.clone(),
            kind: Some(failure.kind()),
            message: failure.error.to_string(),
            level: DiagnosticLevel::Error,
            timestamp: Utc::now(),
        }
    }

    pub fn dispatch(qualified_name: &str, location: Option<&SourceLocation>) -> Self {
        Self {
            location: location.cloned(),
            qualified_name: Some(qualified_name.to_string()),
            kind: None,
            message: format!("dispatch {}", qualified_name),
            level: DiagnosticLevel::Debug,
            timestamp: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.kind.is_some()
    }
}

#[mockall::automock]
pub trait DiagnosticsSink: Send + Sync {
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Logs each record at its level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        let location = diagnostic
            .location
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_default();
        let function = diagnostic.qualified_name.as_deref().unwrap_or_default();
        match diagnostic.level {
            DiagnosticLevel::Debug => debug!(%location, function, "{}", diagnostic.message),
            DiagnosticLevel::Info => info!(%location, function, "{}", diagnostic.message),
            DiagnosticLevel::Warn => warn!(%location, function, "{}", diagnostic.message),
            DiagnosticLevel::Error => error!(
                %location,
                function,
                kind = ?diagnostic.kind,
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Fans records out to every subscriber. Records sent while nobody listens are
/// dropped.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<Diagnostic>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> DiagnosticsReceiver {
        DiagnosticsReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Failure records only, skipping lagged gaps.
    pub fn failures(&self) -> impl tokio_stream::Stream<Item = Diagnostic> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(|item| item.ok())
            .filter(|diagnostic| diagnostic.is_failure())
    }
}

impl DiagnosticsSink for BroadcastSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        let _ = self.sender.send(diagnostic.clone());
    }
}

pub struct DiagnosticsReceiver {
    receiver: broadcast::Receiver<Diagnostic>,
}

impl DiagnosticsReceiver {
    /// 受信する。Laggedの場合はresubscribeして次の記録から再開する。
    pub async fn recv(&mut self) -> Option<Diagnostic> {
        loop {
            match self.receiver.recv().await {
                Ok(diagnostic) => return Some(diagnostic),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "diagnostics receiver lagged");
                    self.receiver = self.receiver.resubscribe();
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Diagnostic> {
        self.receiver.try_recv().ok()
    }
}

/// Forwards every record to each inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn DiagnosticsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl DiagnosticsSink for FanoutSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        for sink in &self.sinks {
            sink.emit(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use pretty_assertions::assert_eq;

    fn sample_failure() -> Failure {
        Failure::new(RuntimeError::UnknownFunction("x:y".into()))
            .at(Some(&SourceLocation::new("main.bal", 1, 1)))
            .in_function("x:y")
    }

    #[test]
    fn test_failure_record() {
        let diagnostic = Diagnostic::failure(&sample_failure());
        assert_eq!(diagnostic.kind, Some(FailureKind::UnknownFunction));
        assert_eq!(diagnostic.qualified_name.as_deref(), Some("x:y"));
        assert_eq!(diagnostic.level, DiagnosticLevel::Error);
        assert!(diagnostic.is_failure());
        assert!(!Diagnostic::dispatch("x:y", None).is_failure());
    }

    #[test]
    fn test_failure_record_serializes() {
        let json = serde_json::to_value(Diagnostic::failure(&sample_failure())).unwrap();
        assert_eq!(
            json["location"],
            serde_json::json!({"file": "main.bal", "line": 1, "column": 1})
        );
        assert_eq!(json["kind"], "UnknownFunction");
        assert_eq!(json["level"], "Error");
    }

    #[tokio::test]
    async fn test_broadcast_sink() {
        let sink = BroadcastSink::new(8);
        let mut rx1 = sink.subscribe();
        let mut rx2 = sink.subscribe();

        sink.emit(&Diagnostic::dispatch("a:b", None));

        assert_eq!(rx1.recv().await.unwrap().qualified_name.as_deref(), Some("a:b"));
        assert_eq!(rx2.recv().await.unwrap().qualified_name.as_deref(), Some("a:b"));
        assert!(rx1.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_failures_stream_skips_dispatch_records() {
        let sink = BroadcastSink::new(8);
        let stream = sink.failures();
        tokio::pin!(stream);

        sink.emit(&Diagnostic::dispatch("a:b", None));
        sink.emit(&Diagnostic::failure(&sample_failure()));

        let first = stream.next().await.unwrap();
        assert_eq!(first.kind, Some(FailureKind::UnknownFunction));
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let mut first = MockDiagnosticsSink::new();
        first.expect_emit().times(1).return_const(());
        let mut second = MockDiagnosticsSink::new();
        second
            .expect_emit()
            .withf(|d| d.qualified_name.as_deref() == Some("a:b"))
            .times(1)
            .return_const(());

        let fanout = FanoutSink::new()
            .with(Arc::new(first))
            .with(Arc::new(second));
        fanout.emit(&Diagnostic::dispatch("a:b", None));
    }
}
