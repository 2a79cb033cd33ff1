//! Typed evaluation and native dispatch core.
//!
//! Expressions are evaluated over a small typed value model. Every call goes
//! through the [`native::Dispatcher`], which checks it against the registered
//! descriptor before running either a plain native function or a connector
//! action. Connector actions reach external services through a
//! [`connector::Transport`], awaited in the caller's task or completed
//! through a callback.

pub mod ast;
pub mod config;
pub mod connector;
pub mod diagnostics;
pub mod error;
pub mod eval;
pub mod native;
pub mod parser;
pub mod system;

// Re-exports
pub use ast::*;
pub use error::*;
pub use eval::context::ExecutionContext;
pub use eval::value::{Value, ValueType};
pub use parser::*;
pub use system::{System, SystemBuilder};

#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    // テスト用のtracing初期化
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
