// Built-in operation handlers
//
// Administrative statements that never reach the execution engine. Each one
// mutates `SessionProperties` directly.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Column, Operation, OperationKind};
use crate::services::dispatcher::{HandlerResult, OperationDispatcher, OperationHandler};
use crate::services::error::StatementError;
use crate::services::properties::{SessionProperties, PIPELINE_FILES, PIPELINE_JARS};

/// Strip one layer of matching single, double or back quotes
fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['\'', '"', '`'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn custom_payload(operation: &Operation) -> Option<&str> {
    match operation {
        Operation::Custom(custom) => Some(custom.payload.trim().trim_end_matches(';').trim()),
        _ => None,
    }
}

fn property_rows(columns: Vec<Column>, entries: impl IntoIterator<Item = (String, String)>) -> HandlerResult {
    let rows = entries
        .into_iter()
        .map(|(key, value)| vec![serde_json::json!(key), serde_json::json!(value)])
        .collect();
    HandlerResult::with_rows(columns, rows)
}

/// `SET key = value` and bare `SET`
pub struct SetOperationHandler {
    properties: SessionProperties,
}

impl SetOperationHandler {
    pub fn new(properties: SessionProperties) -> Self {
        Self { properties }
    }
}

#[async_trait]
impl OperationHandler for SetOperationHandler {
    fn name(&self) -> &str {
        "set"
    }

    async fn handle(&self, operation: &Operation) -> Result<Option<HandlerResult>, StatementError> {
        let Some(payload) = custom_payload(operation) else {
            return Ok(None);
        };

        if payload.is_empty() {
            let snapshot = self.properties.snapshot().await;
            return Ok(Some(property_rows(
                vec![Column::new("key", "Utf8"), Column::new("value", "Utf8")],
                snapshot,
            )));
        }

        let Some((key, value)) = payload.split_once('=') else {
            return Ok(None);
        };
        let key = unquote(key);
        if key.is_empty() {
            return Ok(None);
        }

        self.properties.set(key, unquote(value)).await;
        Ok(Some(HandlerResult::ok()))
    }
}

/// `RESET key` and bare `RESET`
pub struct ResetOperationHandler {
    properties: SessionProperties,
}

impl ResetOperationHandler {
    pub fn new(properties: SessionProperties) -> Self {
        Self { properties }
    }
}

#[async_trait]
impl OperationHandler for ResetOperationHandler {
    fn name(&self) -> &str {
        "reset"
    }

    async fn handle(&self, operation: &Operation) -> Result<Option<HandlerResult>, StatementError> {
        let Some(payload) = custom_payload(operation) else {
            return Ok(None);
        };

        if payload.is_empty() {
            self.properties.clear().await;
        } else {
            self.properties.remove(unquote(payload)).await;
        }
        Ok(Some(HandlerResult::ok()))
    }
}

/// `ADD JAR 'path'` / `ADD FILE 'path'`
pub struct AddResourceHandler {
    properties: SessionProperties,
    property_key: &'static str,
    name: &'static str,
}

impl AddResourceHandler {
    pub fn jars(properties: SessionProperties) -> Self {
        Self {
            properties,
            property_key: PIPELINE_JARS,
            name: "add_jar",
        }
    }

    pub fn files(properties: SessionProperties) -> Self {
        Self {
            properties,
            property_key: PIPELINE_FILES,
            name: "add_file",
        }
    }
}

#[async_trait]
impl OperationHandler for AddResourceHandler {
    fn name(&self) -> &str {
        self.name
    }

    async fn handle(&self, operation: &Operation) -> Result<Option<HandlerResult>, StatementError> {
        let Some(path) = custom_payload(operation).map(unquote) else {
            return Ok(None);
        };
        if path.is_empty() {
            return Ok(None);
        }
        // Resource lists are ';'-separated
        if path.contains(';') {
            return Err(StatementError::handler(
                self.name,
                format!("Resource path must not contain ';': {}", path),
            ));
        }

        self.properties.append(self.property_key, path).await;
        tracing::info!("Added resource {} to {}", path, self.property_key);
        Ok(Some(HandlerResult::ok()))
    }
}

/// Dispatcher with every built-in handler registered
pub fn builtin_dispatcher(properties: &SessionProperties) -> Result<OperationDispatcher> {
    let dispatcher = OperationDispatcher::builder()
        .register(
            OperationKind::custom("set"),
            Arc::new(SetOperationHandler::new(properties.clone())),
        )?
        .register(
            OperationKind::custom("reset"),
            Arc::new(ResetOperationHandler::new(properties.clone())),
        )?
        .register(
            OperationKind::custom("add_jar"),
            Arc::new(AddResourceHandler::jars(properties.clone())),
        )?
        .register(
            OperationKind::custom("add_file"),
            Arc::new(AddResourceHandler::files(properties.clone())),
        )?
        .build();

    Ok(dispatcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CustomOperation, QueryOperation, Row};
    use futures::TryStreamExt;

    fn custom(kind: &str, payload: &str) -> Operation {
        Operation::Custom(CustomOperation {
            kind: kind.to_string(),
            payload: payload.to_string(),
            sql: format!("{} {}", kind, payload),
        })
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'pipeline.name'"), "pipeline.name");
        assert_eq!(unquote(" \"a\" "), "a");
        assert_eq!(unquote("`x`"), "x");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("'"), "'");
    }

    #[tokio::test]
    async fn test_set_and_list_properties() {
        let props = SessionProperties::new();
        let dispatcher = builtin_dispatcher(&props).unwrap();

        let result = dispatcher
            .dispatch(&custom("set", "'pipeline.name' = 'nightly';"))
            .await
            .unwrap();
        assert!(result.is_some());
        assert_eq!(props.get("pipeline.name").await.as_deref(), Some("nightly"));

        let listing = dispatcher.dispatch(&custom("set", "")).await.unwrap().unwrap();
        let rows: Vec<Row> = listing.rows.try_collect().await.unwrap();
        assert_eq!(
            rows,
            vec![vec![serde_json::json!("pipeline.name"), serde_json::json!("nightly")]]
        );
    }

    #[tokio::test]
    async fn test_malformed_set_declines() {
        let props = SessionProperties::new();
        let handler = SetOperationHandler::new(props.clone());

        assert!(handler.handle(&custom("set", "no_equals_sign")).await.unwrap().is_none());
        assert!(handler.handle(&custom("set", " = value")).await.unwrap().is_none());
        // Not a custom operation at all
        let query = Operation::Query(QueryOperation::new("SELECT 1"));
        assert!(handler.handle(&query).await.unwrap().is_none());
        assert!(props.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_single_and_all() {
        let props = SessionProperties::new();
        props.set("a", "1").await;
        props.set("b", "2").await;
        let dispatcher = builtin_dispatcher(&props).unwrap();

        dispatcher.dispatch(&custom("reset", "'a'")).await.unwrap();
        assert!(props.get("a").await.is_none());
        assert_eq!(props.get("b").await.as_deref(), Some("2"));

        dispatcher.dispatch(&custom("reset", "")).await.unwrap();
        assert!(props.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_jar_appends_path() {
        let props = SessionProperties::new();
        let dispatcher = builtin_dispatcher(&props).unwrap();

        dispatcher.dispatch(&custom("add_jar", "'/opt/udf.jar'")).await.unwrap();
        dispatcher.dispatch(&custom("add_jar", "/opt/more.jar")).await.unwrap();
        assert_eq!(
            props.get(PIPELINE_JARS).await.as_deref(),
            Some("/opt/udf.jar;/opt/more.jar")
        );

        // Empty path declines
        assert!(dispatcher.dispatch(&custom("add_file", "''")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_path_with_separator_fails() {
        let props = SessionProperties::new();
        let dispatcher = builtin_dispatcher(&props).unwrap();

        let err = dispatcher
            .dispatch(&custom("add_file", "'/tmp/a;b.txt'"))
            .await
            .unwrap_err();
        assert!(matches!(err, StatementError::Handler { ref kind, .. } if kind == "add_file"));
        assert!(props.get(PIPELINE_FILES).await.is_none());
    }
}
