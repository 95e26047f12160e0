// Engine-facing contracts
//
// The pipeline never parses SQL or plans jobs itself. It talks to a parser,
// an execution engine and a lineage analyzer through these traits; the
// DataFusion-backed implementations live in `services::datafusion`.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::models::{
    DefinitionOperation, ExplainDetail, LineageEdge, ModifyOperation, Operation, ResultSet,
};
use crate::services::error::StatementError;

/// Turns raw SQL text into an ordered sequence of operations
pub trait StatementParser: Send + Sync {
    /// Parse SQL text into operations, preserving statement order
    ///
    /// # Errors
    /// Returns `StatementError::Parse` when the text is malformed or unsupported
    fn parse(&self, sql: &str) -> Result<Vec<Operation>, StatementError>;
}

/// Extracts relation-level data dependencies from SQL text
pub trait LineageAnalyzer: Send + Sync {
    fn analyze(&self, sql: &str) -> Result<Vec<LineageEdge>, StatementError>;
}

/// Executable job graph produced by an engine
///
/// The inner graph is opaque to the pipeline. Apart from the optional job
/// name it is never touched after translation, and it is consumed by exactly
/// one of `run` or `to_display_format`'s caller.
#[derive(Debug)]
pub struct JobGraph<G> {
    name: Option<String>,
    inner: G,
}

impl<G> JobGraph<G> {
    pub fn new(inner: G) -> Self {
        Self { name: None, inner }
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

/// Distributed execution engine the pipeline delegates to
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Engine-specific graph representation
    type Graph: Send + Sync;

    /// Translate all modifications into one graph in a single call
    ///
    /// Implementations may merge or co-optimize sink writes, which is why the
    /// pipeline never translates statements one by one.
    async fn translate(
        &self,
        modifications: &[ModifyOperation],
    ) -> Result<Self::Graph, StatementError>;

    /// Execute a graph and materialize its result rows
    async fn run(&self, graph: JobGraph<Self::Graph>) -> Result<ResultSet, StatementError>;

    /// Produce one combined explanation for all operations
    async fn explain(
        &self,
        operations: &[Operation],
        details: &[ExplainDetail],
    ) -> Result<String, StatementError>;

    /// JSON description of a graph
    ///
    /// Best effort: implementations return an empty object rather than an
    /// error when the graph cannot be rendered.
    fn to_display_format(&self, graph: &JobGraph<Self::Graph>) -> JsonValue;

    /// Run a definition (DDL) statement through the default path
    async fn execute_definition(
        &self,
        definition: &DefinitionOperation,
    ) -> Result<ResultSet, StatementError>;

    /// Effective engine configuration as a flat key/value map
    fn effective_configuration(&self) -> BTreeMap<String, String>;
}
