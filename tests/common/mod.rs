#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use conduit::config::{ConnectorConfig, RuntimeConfig};
use conduit::connector::jms;
use conduit::connector::loopback::LoopbackTransport;
use conduit::system::System;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// `broker` is a jms connector, `web` belongs to another family.
pub fn test_config() -> RuntimeConfig {
    let mut config = RuntimeConfig::default()
        .with_connector(
            "broker",
            ConnectorConfig::new(jms::FAMILY)
                .with_property("priority", "4")
                .with_property(jms::DESTINATION_PROPERTY, "fallback"),
        )
        .with_connector("web", ConnectorConfig::new("http"));
    config.transport_timeout = Duration::from_millis(200);
    config.shutdown_timeout = Duration::from_millis(200);
    config
}

pub fn loopback_system() -> (System, Arc<LoopbackTransport>) {
    let transport = Arc::new(LoopbackTransport::new(jms::FAMILY));
    let system = System::builder(test_config())
        .transport(transport.clone())
        .build()
        .expect("system builds");
    (system, transport)
}
