use std::sync::Arc;

use tracing::info;

use crate::ast::Expression;
use crate::config::RuntimeConfig;
use crate::connector::action::{ActionCallback, ConnectorAction};
use crate::connector::jms::JmsSendAction;
use crate::connector::manager::ConnectorManager;
use crate::connector::runtime::ConnectorActionRuntime;
use crate::connector::transport::Transport;
use crate::diagnostics::{BroadcastSink, DiagnosticsReceiver, DiagnosticsSink, FanoutSink, TracingSink};
use crate::error::{InternalResult, RuntimeResult};
use crate::eval::context::ExecutionContext;
use crate::eval::expression::ExpressionEvaluator;
use crate::eval::operators::OperatorTable;
use crate::eval::value::Value;
use crate::native::builtins::standard_library;
use crate::native::dispatcher::Dispatcher;
use crate::native::registry::{Implementation, NativeRegistry};
use crate::parser::parse_expression;

/// Every contribution shipped with the crate: the built-in library and the
/// messaging connector actions.
pub fn default_contributions() -> Vec<Implementation> {
    let mut contributions = standard_library();
    let send: Arc<dyn ConnectorAction> = Arc::new(JmsSendAction::new());
    contributions.push(Implementation::Action(send));
    contributions
}

pub struct SystemBuilder {
    config: RuntimeConfig,
    contributions: Vec<Implementation>,
    transports: Vec<Arc<dyn Transport>>,
    sinks: Vec<Arc<dyn DiagnosticsSink>>,
}

impl SystemBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            contributions: default_contributions(),
            transports: Vec::new(),
            sinks: Vec::new(),
        }
    }

    pub fn contribution(mut self, implementation: Implementation) -> Self {
        self.contributions.push(implementation);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Extra sink receiving every diagnostic alongside the defaults.
    pub fn sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Builds the registry and wires the runtime. Any registration or
    /// configuration problem fails here.
    pub fn build(self) -> InternalResult<System> {
        self.config.validate()?;
        let registry = Arc::new(NativeRegistry::build(self.contributions)?);

        let connectors = Arc::new(ConnectorManager::new());
        for transport in self.transports {
            connectors.register_transport(transport)?;
        }
        connectors.initialize(&self.config)?;

        let broadcast = BroadcastSink::new(self.config.diagnostics_buffer_size);
        let mut fanout = FanoutSink::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(broadcast.clone()));
        for sink in self.sinks {
            fanout = fanout.with(sink);
        }
        let diagnostics: Arc<dyn DiagnosticsSink> = Arc::new(fanout);

        let runtime = Arc::new(ConnectorActionRuntime::new(
            connectors.clone(),
            diagnostics.clone(),
            self.config.transport_timeout,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            runtime,
            diagnostics.clone(),
        ));
        let evaluator = Arc::new(ExpressionEvaluator::new(
            Arc::new(OperatorTable::standard()),
            dispatcher.clone(),
            diagnostics,
        ));

        info!(
            natives = registry.len(),
            connectors = self.config.connectors.len(),
            "system initialized"
        );
        Ok(System {
            config: self.config,
            registry,
            connectors,
            dispatcher,
            evaluator,
            broadcast,
        })
    }
}

pub struct System {
    config: RuntimeConfig,
    registry: Arc<NativeRegistry>,
    connectors: Arc<ConnectorManager>,
    dispatcher: Arc<Dispatcher>,
    evaluator: Arc<ExpressionEvaluator>,
    broadcast: BroadcastSink,
}

impl System {
    pub fn builder(config: RuntimeConfig) -> SystemBuilder {
        SystemBuilder::new(config)
    }

    pub fn new(config: RuntimeConfig) -> InternalResult<Self> {
        SystemBuilder::new(config).build()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<NativeRegistry> {
        &self.registry
    }

    pub fn connectors(&self) -> &Arc<ConnectorManager> {
        &self.connectors
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn evaluator(&self) -> &Arc<ExpressionEvaluator> {
        &self.evaluator
    }

    /// Fresh context with every declared connector bound under its name.
    pub fn new_context(&self) -> ExecutionContext {
        let mut context = ExecutionContext::new();
        for handle in self.connectors.connectors() {
            context.set_variable(handle.name().to_string(), Value::Connector(handle));
        }
        context
    }

    pub async fn evaluate(
        &self,
        expr: &Expression,
        context: &mut ExecutionContext,
    ) -> RuntimeResult<Value> {
        self.evaluator.eval_expression(expr, context).await
    }

    /// Parses and evaluates `source`.
    pub async fn evaluate_str(
        &self,
        source: &str,
        file: &str,
        context: &mut ExecutionContext,
    ) -> InternalResult<Value> {
        let expr = parse_expression(source, file)?;
        Ok(self.evaluate(&expr, context).await?)
    }

    /// Evaluates the call in `source` in callback mode.
    pub async fn evaluate_with_callback(
        &self,
        source: &str,
        file: &str,
        context: ExecutionContext,
        callback: ActionCallback,
    ) -> InternalResult<Option<tokio::task::JoinHandle<()>>> {
        let expr = parse_expression(source, file)?;
        Ok(self
            .evaluator
            .eval_call_with_callback(&expr, context, callback)
            .await)
    }

    pub fn subscribe_diagnostics(&self) -> DiagnosticsReceiver {
        self.broadcast.subscribe()
    }

    pub fn diagnostics(&self) -> &BroadcastSink {
        &self.broadcast
    }

    pub async fn shutdown(&self) -> InternalResult<()> {
        info!("Starting System shutdown");
        self.connectors.shutdown(self.config.shutdown_timeout).await
    }
}
