use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::time::timeout;
use tracing::{error, info};

use super::transport::Transport;
use super::types::TransportError;
use crate::config::RuntimeConfig;
use crate::error::{Error, InternalResult, NativeResult, RuntimeError};
use crate::eval::handle::ConnectorHandle;

/// Owns the transports (one per protocol family) and the connectors declared
/// at startup.
#[derive(Default)]
pub struct ConnectorManager {
    transports: DashMap<String, Arc<dyn Transport>>,
    connectors: DashMap<String, ConnectorHandle>,
}

impl ConnectorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares every connector in `config`.
    pub fn initialize(&self, config: &RuntimeConfig) -> InternalResult<()> {
        for (name, connector) in &config.connectors {
            self.declare(name, &connector.family, connector.properties.clone())?;
        }
        info!(
            transports = self.transports.len(),
            connectors = self.connectors.len(),
            "connector manager initialized"
        );
        Ok(())
    }

    pub fn register_transport(&self, transport: Arc<dyn Transport>) -> InternalResult<()> {
        let family = transport.protocol().to_string();
        if self.transports.contains_key(&family) {
            return Err(Error::internal(format!(
                "transport already registered: {}",
                family
            )));
        }
        self.transports.insert(family, transport);
        Ok(())
    }

    pub fn transport(&self, family: &str) -> Result<Arc<dyn Transport>, TransportError> {
        self.transports
            .get(family)
            .map(|t| t.value().clone())
            .ok_or_else(|| TransportError::Unavailable(family.to_string()))
    }

    pub fn declare(
        &self,
        name: &str,
        family: &str,
        properties: IndexMap<String, String>,
    ) -> InternalResult<ConnectorHandle> {
        if self.connectors.contains_key(name) {
            return Err(Error::internal(format!(
                "connector already declared: {}",
                name
            )));
        }
        let handle = ConnectorHandle::new(name, family, properties);
        self.connectors.insert(name.to_string(), handle.clone());
        Ok(handle)
    }

    pub fn connector(&self, name: &str) -> NativeResult<ConnectorHandle> {
        self.connectors
            .get(name)
            .map(|c| c.value().clone())
            .ok_or_else(|| RuntimeError::UnknownConnector(name.to_string()))
    }

    /// Declared connectors, sorted by name.
    pub fn connectors(&self) -> Vec<ConnectorHandle> {
        let mut handles: Vec<_> = self.connectors.iter().map(|c| c.value().clone()).collect();
        handles.sort_by(|a, b| a.name().cmp(b.name()));
        handles
    }

    /// Shuts every transport down, giving each at most `limit`. A failing or
    /// slow transport does not stop the others.
    pub async fn shutdown(&self, limit: Duration) -> InternalResult<()> {
        info!("Starting ConnectorManager shutdown");
        let transports: Vec<_> = self
            .transports
            .iter()
            .map(|t| (t.key().clone(), t.value().clone()))
            .collect();

        let mut failed = Vec::new();
        for (family, transport) in transports {
            match timeout(limit, transport.shutdown()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Error stopping transport {}: {}", family, e);
                    failed.push(family);
                }
                Err(_) => {
                    error!("Timed out stopping transport {}", family);
                    failed.push(family);
                }
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "transports failed to shut down: {}",
                failed.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectorConfig;
    use crate::connector::loopback::LoopbackTransport;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_initialize_declares_connectors() {
        let manager = ConnectorManager::new();
        let config = RuntimeConfig::default()
            .with_connector("orders", ConnectorConfig::new("jms").with_property("priority", "4"));
        manager.initialize(&config).unwrap();

        let orders = manager.connector("orders").unwrap();
        assert_eq!(orders.family(), "jms");
        assert_eq!(orders.properties().get("priority"), Some(&"4".to_string()));
        assert!(orders.same(&manager.connector("orders").unwrap()));
        assert!(matches!(
            manager.connector("missing"),
            Err(RuntimeError::UnknownConnector(_))
        ));
    }

    #[test]
    fn test_duplicate_declarations_rejected() {
        let manager = ConnectorManager::new();
        manager.declare("a", "jms", IndexMap::new()).unwrap();
        assert!(manager.declare("a", "jms", IndexMap::new()).is_err());

        manager
            .register_transport(Arc::new(LoopbackTransport::new("jms")))
            .unwrap();
        assert!(manager
            .register_transport(Arc::new(LoopbackTransport::new("jms")))
            .is_err());
    }

    #[tokio::test]
    async fn test_shutdown_closes_transports() {
        let manager = ConnectorManager::new();
        let transport = Arc::new(LoopbackTransport::new("jms"));
        manager.register_transport(transport.clone()).unwrap();
        assert!(matches!(
            manager.transport("mqtt"),
            Err(TransportError::Unavailable(_))
        ));

        manager.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(transport.is_closed());
    }
}
