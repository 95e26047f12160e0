// SQL statement parser
//
// Turns SQL text into operations with `sqlparser`. Extension statements that
// the SQL grammar does not carry (SET, RESET, ADD JAR, ADD FILE, PRINT) are
// recognized by their leading keywords before the grammar sees them.

use anyhow::{anyhow, Result};
use sqlparser::ast::{Statement, TableObject};
use sqlparser::dialect::{dialect_from_str, Dialect, GenericDialect};
use sqlparser::parser::Parser;

use crate::models::{
    CustomOperation, DefinitionOperation, ModifyOperation, Operation, QueryOperation,
};
use crate::services::engine::StatementParser;
use crate::services::error::StatementError;

#[derive(Clone, Copy)]
enum Scan {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Split SQL text on top-level semicolons, ignoring quoted and commented ones
pub fn split_statements(sql: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut state = Scan::Code;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        let next = chars.peek().map(|&(_, c)| c);
        state = match (state, ch) {
            (Scan::Quoted(q), _) if ch == q => Scan::Code,
            (Scan::Quoted(q), _) => Scan::Quoted(q),
            (Scan::LineComment, '\n') => Scan::Code,
            (Scan::LineComment, _) => Scan::LineComment,
            (Scan::BlockComment, '*') if next == Some('/') => {
                chars.next();
                Scan::Code
            }
            (Scan::BlockComment, _) => Scan::BlockComment,
            (Scan::Code, '\'' | '"' | '`') => Scan::Quoted(ch),
            (Scan::Code, '-') if next == Some('-') => {
                chars.next();
                Scan::LineComment
            }
            (Scan::Code, '/') if next == Some('*') => {
                chars.next();
                Scan::BlockComment
            }
            (Scan::Code, ';') => {
                parts.push(&sql[start..idx]);
                start = idx + 1;
                Scan::Code
            }
            (Scan::Code, _) => Scan::Code,
        };
    }
    parts.push(&sql[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Skip whitespace and comments in front of the first keyword
fn skip_leading_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.find('\n').map_or("", |end| &rest[end..]);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.find("*/").map_or("", |end| &rest[end + 2..]);
        } else {
            return sql;
        }
    }
}

/// Drop the first `count` whitespace-separated words
fn strip_keywords(statement: &str, count: usize) -> &str {
    let mut rest = statement.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest.trim_end()
}

fn custom_operation(statement: &str) -> Option<Operation> {
    let body = skip_leading_comments(statement);
    let mut words = body.split_whitespace();
    let first = words.next()?.to_uppercase();
    let (kind, keywords) = match first.as_str() {
        "SET" => ("set", 1),
        "RESET" => ("reset", 1),
        "PRINT" => ("print", 1),
        "ADD" => match words.next()?.to_uppercase().as_str() {
            "JAR" => ("add_jar", 2),
            "FILE" => ("add_file", 2),
            _ => return None,
        },
        _ => return None,
    };

    Some(Operation::Custom(CustomOperation {
        kind: kind.to_string(),
        payload: strip_keywords(body, keywords).to_string(),
        sql: statement.to_string(),
    }))
}

fn to_operation(statement: Statement) -> Operation {
    let sql = statement.to_string();
    match statement {
        Statement::Query(_) => Operation::Query(QueryOperation::new(sql)),
        Statement::Insert(insert) => {
            let target = match &insert.table {
                TableObject::TableName(name) => Some(name.to_string()),
                _ => None,
            };
            Operation::Modify(ModifyOperation::Sink { target, sql })
        }
        Statement::Update { .. } | Statement::Delete { .. } | Statement::Merge { .. } => {
            Operation::Modify(ModifyOperation::Sink { target: None, sql })
        }
        _ => Operation::Definition(DefinitionOperation {
            summary: sql.clone(),
            sql,
        }),
    }
}

/// `StatementParser` backed by `sqlparser`
pub struct SqlStatementParser {
    dialect: String,
}

impl SqlStatementParser {
    /// Create a parser for a named dialect ("generic", "postgresql", "mysql", ...)
    pub fn new(dialect: &str) -> Result<Self> {
        let dialect = dialect.trim().to_lowercase();
        if dialect_from_str(&dialect).is_none() {
            return Err(anyhow!("Unknown SQL dialect: {}", dialect));
        }
        Ok(Self { dialect })
    }

    pub fn generic() -> Self {
        Self {
            dialect: "generic".to_string(),
        }
    }

    pub fn dialect_name(&self) -> &str {
        &self.dialect
    }

    fn dialect(&self) -> Box<dyn Dialect> {
        dialect_from_str(&self.dialect).unwrap_or_else(|| Box::new(GenericDialect {}))
    }
}

impl StatementParser for SqlStatementParser {
    fn parse(&self, sql: &str) -> Result<Vec<Operation>, StatementError> {
        let dialect = self.dialect();
        let mut operations = Vec::new();

        for statement in split_statements(sql) {
            if let Some(custom) = custom_operation(statement) {
                operations.push(custom);
                continue;
            }

            let parsed = Parser::parse_sql(dialect.as_ref(), statement)
                .map_err(|e| StatementError::parse(statement, e))?;
            operations.extend(parsed.into_iter().map(to_operation));
        }

        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperationKind;

    #[test]
    fn test_split_statements_respects_quotes() {
        assert_eq!(
            split_statements("SELECT ';' ; SELECT 2;\n"),
            vec!["SELECT ';'", "SELECT 2"]
        );
        assert!(split_statements(" ; ;").is_empty());
    }

    #[test]
    fn test_split_statements_ignores_comments() {
        assert_eq!(
            split_statements("SELECT 1 -- it's; fine\n; SET 'a' = 'b'"),
            vec!["SELECT 1 -- it's; fine", "SET 'a' = 'b'"]
        );
        assert_eq!(
            split_statements("/* don't; split */ SELECT 1; SELECT 2"),
            vec!["/* don't; split */ SELECT 1", "SELECT 2"]
        );
    }

    #[test]
    fn test_extension_statement_after_comment() {
        let parser = SqlStatementParser::generic();
        let operations = parser
            .parse("SELECT 1 -- the user's query\n; /* jars */ ADD JAR '/opt/udf.jar'")
            .unwrap();

        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0].kind(), OperationKind::Query);
        match &operations[1] {
            Operation::Custom(custom) => {
                assert_eq!(custom.kind, "add_jar");
                assert_eq!(custom.payload, "'/opt/udf.jar'");
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_parse_preserves_order_and_kinds() {
        let parser = SqlStatementParser::generic();
        let operations = parser
            .parse("CREATE TABLE t (a INT); INSERT INTO t SELECT 1; SELECT * FROM t")
            .unwrap();

        let kinds: Vec<OperationKind> = operations.iter().map(Operation::kind).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::Definition, OperationKind::Modify, OperationKind::Query]
        );
        match &operations[1] {
            Operation::Modify(ModifyOperation::Sink { target, .. }) => {
                assert_eq!(target.as_deref(), Some("t"))
            }
            other => panic!("unexpected operation {:?}", other),
        }
        assert_eq!(operations[0].summary(), "CREATE TABLE t (a INT)");
    }

    #[test]
    fn test_update_and_delete_are_modifications() {
        let parser = SqlStatementParser::generic();
        let operations = parser
            .parse("UPDATE t SET a = 1; DELETE FROM t WHERE a = 2")
            .unwrap();
        assert!(operations.iter().all(|op| op.kind() == OperationKind::Modify));
    }

    #[test]
    fn test_extension_statements() {
        let parser = SqlStatementParser::generic();
        let operations = parser
            .parse("SET 'pipeline.name' = 'Nightly'; ADD JAR '/opt/udf.jar'; RESET; PRINT orders")
            .unwrap();

        let kinds: Vec<OperationKind> = operations.iter().map(Operation::kind).collect();
        assert_eq!(
            kinds,
            vec![
                OperationKind::custom("set"),
                OperationKind::custom("add_jar"),
                OperationKind::custom("reset"),
                OperationKind::custom("print"),
            ]
        );
        match &operations[0] {
            Operation::Custom(custom) => assert_eq!(custom.payload, "'pipeline.name' = 'Nightly'"),
            other => panic!("unexpected operation {:?}", other),
        }
        match &operations[1] {
            Operation::Custom(custom) => assert_eq!(custom.payload, "'/opt/udf.jar'"),
            other => panic!("unexpected operation {:?}", other),
        }
    }

    #[test]
    fn test_add_without_resource_kind_is_plain_sql() {
        let parser = SqlStatementParser::generic();
        assert!(parser.parse("ADD something").is_err());
    }

    #[test]
    fn test_parse_error() {
        let parser = SqlStatementParser::generic();
        match parser.parse("SELEC 1").unwrap_err() {
            StatementError::Parse {
                statement,
                position,
                ..
            } => {
                assert_eq!(statement, "SELEC 1");
                assert_eq!(position, None);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_dialects() {
        assert_eq!(SqlStatementParser::new("PostgreSQL").unwrap().dialect_name(), "postgresql");
        assert!(SqlStatementParser::new("nonsense").is_err());
    }
}
