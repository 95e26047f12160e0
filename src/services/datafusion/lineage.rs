// Table-level lineage
//
// Walks the statement AST and links every relation an INSERT or CTAS reads
// from to the table it writes.

use std::collections::HashSet;
use std::ops::ControlFlow;

use sqlparser::ast::{ObjectName, Query, Statement, TableObject, Visit, Visitor};
use sqlparser::dialect::{dialect_from_str, GenericDialect};
use sqlparser::parser::Parser;

use crate::models::LineageEdge;
use crate::services::datafusion::parser::split_statements;
use crate::services::engine::LineageAnalyzer;
use crate::services::error::StatementError;

/// Relations referenced by a statement, in discovery order
#[derive(Default)]
struct RelationCollector {
    ctes: HashSet<String>,
    relations: Vec<String>,
}

impl Visitor for RelationCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.ctes.insert(cte.alias.name.value.to_lowercase());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let name = relation.to_string();
        if !self.relations.contains(&name) {
            self.relations.push(name);
        }
        ControlFlow::Continue(())
    }
}

impl RelationCollector {
    fn sources(self, target: &str) -> Vec<String> {
        let ctes = self.ctes;
        self.relations
            .into_iter()
            .filter(|name| name != target && !ctes.contains(&name.to_lowercase()))
            .collect()
    }
}

fn sink_target(statement: &Statement) -> Option<String> {
    match statement {
        Statement::Insert(insert) => match &insert.table {
            TableObject::TableName(name) => Some(name.to_string()),
            _ => None,
        },
        Statement::CreateTable(create) if create.query.is_some() => Some(create.name.to_string()),
        _ => None,
    }
}

/// `LineageAnalyzer` producing one edge per source table of each sink
pub struct SqlLineageAnalyzer {
    dialect: String,
}

impl SqlLineageAnalyzer {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into().to_lowercase(),
        }
    }
}

impl LineageAnalyzer for SqlLineageAnalyzer {
    fn analyze(&self, sql: &str) -> Result<Vec<LineageEdge>, StatementError> {
        let dialect = dialect_from_str(&self.dialect).unwrap_or_else(|| Box::new(GenericDialect {}));
        let mut edges = Vec::new();

        for text in split_statements(sql) {
            let statements = Parser::parse_sql(dialect.as_ref(), text)
                .map_err(|e| StatementError::parse(text, e))?;

            for statement in statements {
                let Some(target) = sink_target(&statement) else {
                    continue;
                };
                let mut collector = RelationCollector::default();
                let _ = statement.visit(&mut collector);
                edges.extend(
                    collector
                        .sources(&target)
                        .into_iter()
                        .map(|source| LineageEdge::new(source, target.clone())),
                );
            }
        }

        tracing::debug!("Lineage analysis found {} edge(s)", edges.len());
        Ok(edges)
    }
}
