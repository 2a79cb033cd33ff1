use std::sync::Arc;

use async_recursion::async_recursion;
use tokio::task::JoinHandle;
use tracing::debug;

use super::context::ExecutionContext;
use super::operators::OperatorTable;
use super::value::Value;
use crate::ast::{BinaryOperator, Expression, Literal, SourceLocation};
use crate::connector::action::ActionCallback;
use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::error::{Failure, RuntimeError, RuntimeResult};
use crate::native::dispatcher::Dispatcher;

pub struct ExpressionEvaluator {
    operators: Arc<OperatorTable>,
    dispatcher: Arc<Dispatcher>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl ExpressionEvaluator {
    pub fn new(
        operators: Arc<OperatorTable>,
        dispatcher: Arc<Dispatcher>,
        diagnostics: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        Self {
            operators,
            dispatcher,
            diagnostics,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[async_recursion]
    pub async fn eval_expression(
        &self,
        expr: &Expression,
        context: &mut ExecutionContext,
    ) -> RuntimeResult<Value> {
        match expr {
            Expression::Literal(literal) => Ok(self.eval_literal(literal)),
            Expression::Variable { name, location } => {
                context.get_variable(name).map_err(|error| {
                    self.fail_at(context, Some(location), error)
                })
            }
            Expression::Binary {
                op,
                left,
                right,
                location,
            } => {
                self.eval_binary_op(*op, left, right, Some(location), context)
                    .await
            }
            Expression::Call {
                function,
                arguments,
                location,
            } => {
                let value = self
                    .eval_call(function, arguments, Some(location), context)
                    .await?;
                value.ok_or_else(|| {
                    self.fail_at(
                        context,
                        Some(location),
                        RuntimeError::NoValue(function.clone()),
                    )
                })
            }
        }
    }

    fn eval_literal(&self, literal: &Literal) -> Value {
        match literal {
            Literal::Integer(i) => Value::Integer(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Boolean(*b),
        }
    }

    /// Both operands are always evaluated, left first.
    async fn eval_binary_op(
        &self,
        op: BinaryOperator,
        left: &Expression,
        right: &Expression,
        location: Option<&SourceLocation>,
        context: &mut ExecutionContext,
    ) -> RuntimeResult<Value> {
        let left_val = self.eval_expression(left, context).await?;
        let right_val = self.eval_expression(right, context).await?;

        self.operators
            .apply(op, &left_val, &right_val)
            .map_err(|error| self.fail_at(context, location, error))
    }

    /// Evaluates a call whose result may be empty.
    #[tracing::instrument(skip(self, arguments, location, context), level = "debug")]
    pub async fn eval_call(
        &self,
        function: &str,
        arguments: &[Expression],
        location: Option<&SourceLocation>,
        context: &mut ExecutionContext,
    ) -> RuntimeResult<Option<Value>> {
        let args = self.eval_arguments(arguments, context).await?;
        debug!(function, args = args.len(), "call");

        let pushed = Self::enter(context, location);
        let result = self.dispatcher.invoke(function, context, args).await;
        if pushed {
            context.pop_location();
        }
        result
    }

    /// Evaluates the arguments of `expr`, which must be a call, and hands the
    /// call to the dispatcher in callback mode. The context is moved along and
    /// returned through `callback`.
    pub async fn eval_call_with_callback(
        &self,
        expr: &Expression,
        mut context: ExecutionContext,
        callback: ActionCallback,
    ) -> Option<JoinHandle<()>> {
        let Expression::Call {
            function,
            arguments,
            location,
        } = expr
        else {
            let failure = self.fail_at(
                &context,
                expr.location(),
                RuntimeError::native("callback", "only calls can complete through a callback"),
            );
            callback.complete(context, Err(failure));
            return None;
        };

        let args = match self.eval_arguments(arguments, &mut context).await {
            Ok(args) => args,
            Err(failure) => {
                callback.complete(context, Err(failure));
                return None;
            }
        };

        // The location stays pushed: the context leaves with the call and the
        // callback owns it from here on.
        Self::enter(&mut context, Some(location));
        self.dispatcher
            .invoke_with_callback(function, context, args, callback)
    }

    async fn eval_arguments(
        &self,
        arguments: &[Expression],
        context: &mut ExecutionContext,
    ) -> RuntimeResult<Vec<Value>> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            values.push(self.eval_expression(argument, context).await?);
        }
        Ok(values)
    }

    fn enter(context: &mut ExecutionContext, location: Option<&SourceLocation>) -> bool {
        match location {
            Some(location) => {
                context.push_location(location.clone());
                true
            }
            None => false,
        }
    }

    fn fail_at(
        &self,
        context: &ExecutionContext,
        location: Option<&SourceLocation>,
        error: RuntimeError,
    ) -> Failure {
        let failure = Failure::new(error).at(location.or(context.location()));
        self.diagnostics.emit(&Diagnostic::failure(&failure));
        failure
    }
}
