//! Connectors: stateful handles onto external services, and the actions that
//! use them.

pub mod action;
pub mod jms;
pub mod loopback;
pub mod manager;
pub mod runtime;
pub mod transport;
pub mod types;

pub use action::{ActionCallback, ConnectorAction};
pub use manager::ConnectorManager;
pub use runtime::ConnectorActionRuntime;
pub use transport::Transport;
