// Operation Model
//
// Parsed semantic representation of one SQL statement. Operations are produced
// by a `StatementParser`; the pipeline only ever constructs one itself when it
// wraps a bare query into a collect modification.

use serde::Serialize;
use std::fmt;

/// Discriminator used to key the dispatcher registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Modify,
    Definition,
    /// Extension kind, identified by its lower-case name (e.g. "set", "add_jar")
    Custom(String),
}

impl OperationKind {
    pub fn custom(name: impl Into<String>) -> Self {
        OperationKind::Custom(name.into().to_lowercase())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Modify => write!(f, "modify"),
            OperationKind::Definition => write!(f, "definition"),
            OperationKind::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// Read-only query producing rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryOperation {
    pub sql: String,
}

impl QueryOperation {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }
}

/// Operation that writes to a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModifyOperation {
    /// INSERT / UPDATE / DELETE / MERGE against a table
    Sink { target: Option<String>, sql: String },
    /// Synthetic sink that collects the rows of a bare query
    Collect(QueryOperation),
}

impl ModifyOperation {
    /// Wrap a query so its rows can be executed and collected
    pub fn collect(query: QueryOperation) -> Self {
        ModifyOperation::Collect(query)
    }

    /// SQL text the engine has to plan for this modification
    pub fn sql(&self) -> &str {
        match self {
            ModifyOperation::Sink { sql, .. } => sql,
            ModifyOperation::Collect(query) => &query.sql,
        }
    }

    pub fn is_collect(&self) -> bool {
        matches!(self, ModifyOperation::Collect(_))
    }
}

/// DDL and other catalog-level statements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefinitionOperation {
    pub sql: String,
    pub summary: String,
}

/// Engine-specific extension statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomOperation {
    pub kind: String,
    pub payload: String,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
pub enum Operation {
    Query(QueryOperation),
    Modify(ModifyOperation),
    Definition(DefinitionOperation),
    Custom(CustomOperation),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Query(_) => OperationKind::Query,
            Operation::Modify(_) => OperationKind::Modify,
            Operation::Definition(_) => OperationKind::Definition,
            Operation::Custom(custom) => OperationKind::custom(custom.kind.as_str()),
        }
    }

    /// SQL text this operation was parsed from
    pub fn sql(&self) -> &str {
        match self {
            Operation::Query(query) => &query.sql,
            Operation::Modify(modify) => modify.sql(),
            Operation::Definition(definition) => &definition.sql,
            Operation::Custom(custom) => &custom.sql,
        }
    }

    /// Short human-readable description
    pub fn summary(&self) -> String {
        match self {
            Operation::Query(query) => format!("Query: {}", query.sql),
            Operation::Modify(ModifyOperation::Sink { target: Some(target), .. }) => {
                format!("Modify [{}]", target)
            }
            Operation::Modify(ModifyOperation::Sink { sql, .. }) => format!("Modify: {}", sql),
            Operation::Modify(ModifyOperation::Collect(query)) => {
                format!("Collect: {}", query.sql)
            }
            Operation::Definition(definition) => definition.summary.clone(),
            Operation::Custom(custom) => {
                format!("{} {}", custom.kind.to_uppercase(), custom.payload)
                    .trim_end()
                    .to_string()
            }
        }
    }
}
