// Custom Operation Dispatcher
//
// Registry of operation kind -> handler. A handler gets the first chance at
// an operation before the default engine path; when no handler is registered
// or the registered one declines, the caller falls back to the engine.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Column, Operation, OperationKind, ResultKind, Row};
use crate::services::error::StatementError;

/// Rows produced by a handler, pulled lazily by the result assembler
pub type RowStream = BoxStream<'static, Result<Row, StatementError>>;

/// Output of a handler that accepted an operation
pub struct HandlerResult {
    pub kind: ResultKind,
    pub columns: Vec<Column>,
    pub rows: RowStream,
}

impl HandlerResult {
    /// Plain "OK" acknowledgement with no content
    pub fn ok() -> Self {
        Self {
            kind: ResultKind::Success,
            columns: vec![Column::new("result", "Utf8")],
            rows: stream::iter(vec![Ok(vec![serde_json::json!("OK")])]).boxed(),
        }
    }

    pub fn with_rows(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            kind: ResultKind::SuccessWithContent,
            columns,
            rows: stream::iter(rows.into_iter().map(Ok)).boxed(),
        }
    }
}

impl std::fmt::Debug for HandlerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerResult")
            .field("kind", &self.kind)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Handles one operation kind outside the engine's built-in logic
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Handle an operation of the kind this handler is registered for
    ///
    /// Returns `Ok(None)` when the handler recognizes the kind but not this
    /// particular instance; that is a decline, not a failure.
    async fn handle(&self, operation: &Operation) -> Result<Option<HandlerResult>, StatementError>;
}

/// Immutable registry of operation handlers
///
/// Built once at startup; lookups need no locking because nothing can be
/// registered after `build`.
#[derive(Clone, Default)]
pub struct OperationDispatcher {
    handlers: Arc<HashMap<OperationKind, Arc<dyn OperationHandler>>>,
}

impl OperationDispatcher {
    pub fn builder() -> OperationDispatcherBuilder {
        OperationDispatcherBuilder::default()
    }

    /// Dispatcher with no handlers; every operation falls through
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_handler(&self, kind: &OperationKind) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn registered_kinds(&self) -> Vec<OperationKind> {
        self.handlers.keys().cloned().collect()
    }

    /// Try to intercept an operation
    ///
    /// At most one handler is invoked. `Ok(None)` means the caller must take
    /// the default engine path; the dispatcher never does that itself.
    pub async fn dispatch(
        &self,
        operation: &Operation,
    ) -> Result<Option<HandlerResult>, StatementError> {
        let kind = operation.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            return Ok(None);
        };

        let result = handler.handle(operation).await?;
        match &result {
            Some(_) => tracing::debug!("Operation {} handled by {}", kind, handler.name()),
            None => tracing::debug!("Handler {} declined operation {}", handler.name(), kind),
        }
        Ok(result)
    }
}

#[derive(Default)]
pub struct OperationDispatcherBuilder {
    handlers: HashMap<OperationKind, Arc<dyn OperationHandler>>,
}

impl OperationDispatcherBuilder {
    /// Register a handler for an operation kind
    ///
    /// # Errors
    /// Returns error if a handler is already registered for the kind
    pub fn register(
        mut self,
        kind: OperationKind,
        handler: Arc<dyn OperationHandler>,
    ) -> Result<Self> {
        if self.handlers.contains_key(&kind) {
            return Err(anyhow!("A handler is already registered for {}", kind));
        }
        self.handlers.insert(kind, handler);
        Ok(self)
    }

    pub fn build(self) -> OperationDispatcher {
        OperationDispatcher {
            handlers: Arc::new(self.handlers),
        }
    }
}
