use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::{statement, statement_set, AppState};
use crate::config::Config;
use crate::services::datafusion::{
    DataFusionEngine, DataFusionSessionManager, SqlLineageAnalyzer, SqlStatementParser,
};
use crate::services::{builtin_dispatcher, SessionProperties, StatementService, PIPELINE_NAME};

/// Wire the DataFusion engine, parser, dispatcher and session properties
pub fn create_app_state(config: Config) -> anyhow::Result<AppState> {
    let session = DataFusionSessionManager::new(config.session_config()).create_session()?;
    let engine = Arc::new(DataFusionEngine::new(session));
    let parser = Arc::new(SqlStatementParser::new(&config.engine.dialect)?);
    let lineage = Arc::new(SqlLineageAnalyzer::new(parser.dialect_name()));

    let properties = SessionProperties::with_defaults(
        config
            .engine
            .pipeline_name
            .iter()
            .map(|name| (PIPELINE_NAME.to_string(), name.clone()))
            .collect(),
    );
    let dispatcher = builtin_dispatcher(&properties)?;
    tracing::info!(
        "Registered operation handlers: {:?}",
        dispatcher.registered_kinds()
    );

    let service = StatementService::new(parser, engine, lineage, dispatcher, properties);

    Ok(AppState {
        service: Arc::new(service),
        config,
    })
}

/// Create router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/statements/execute", post(statement::execute_statement))
        .route("/api/statements/explain", post(statement::explain_statement))
        .route("/api/statements/graph", post(statement::statement_graph))
        .route("/api/statements/lineage", post(statement::statement_lineage))
        .route(
            "/api/statement-sets/execute",
            post(statement_set::execute_statement_set),
        )
        .route(
            "/api/statement-sets/explain",
            post(statement_set::explain_statement_set),
        )
        .route(
            "/api/statement-sets/plan",
            post(statement_set::statement_set_plan),
        )
        .route("/api/configuration", get(statement::get_configuration))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "dialect": state.config.engine.dialect,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::AppError;
    use crate::models::{ExplainDetail, StatementEntry, StatementRequest, StatementSetRequest};

    fn state() -> AppState {
        let config = Config::load(None, |_| None).unwrap();
        create_app_state(config).unwrap()
    }

    fn entries(statements: &[&str]) -> Vec<StatementEntry> {
        statements
            .iter()
            .map(|s| StatementEntry {
                statement: s.to_string(),
                sql_type: None,
            })
            .collect()
    }

    #[test]
    fn test_router_builds() {
        let _router = create_router_with_state(state());
    }

    #[test]
    fn test_unknown_dialect_fails_bootstrap() {
        let config = Config::load(None, |key| {
            (key == "SQL_DIALECT").then(|| "klingon".to_string())
        })
        .unwrap();
        assert!(create_app_state(config).is_err());
    }

    #[tokio::test]
    async fn test_statement_roundtrip_through_handlers() {
        let state = state();

        statement::execute_statement(
            State(state.clone()),
            Json(StatementRequest::new("CREATE TABLE t (a INT)")),
        )
        .await
        .unwrap();

        let Json(body) = statement_set::execute_statement_set(
            State(state.clone()),
            Json(StatementSetRequest {
                statements: entries(&["INSERT INTO t VALUES (1)", "SHOW TABLES", "INSERT INTO t VALUES (2)"]),
                details: vec![],
            }),
        )
        .await
        .unwrap();
        assert_eq!(body["result"]["row_count"], 2);

        let Json(body) = statement::execute_statement(
            State(state.clone()),
            Json(StatementRequest::new("SELECT sum(a) AS total FROM t")),
        )
        .await
        .unwrap();
        assert_eq!(body["result"]["rows"][0][0], 3);
        assert_eq!(body["result"]["source"], "engine");
    }

    #[tokio::test]
    async fn test_set_then_read_configuration() {
        let state = state();

        let Json(body) = statement::execute_statement(
            State(state.clone()),
            Json(StatementRequest::new("SET 'pipeline.name' = 'nightly'")),
        )
        .await
        .unwrap();
        assert_eq!(body["result"]["source"], "dispatcher");

        let Json(body) = statement::get_configuration(State(state)).await.unwrap();
        assert_eq!(body["configuration"]["pipeline.name"], "nightly");
        assert!(body["configuration"]["datafusion.execution.batch_size"].is_string());
    }

    #[tokio::test]
    async fn test_print_without_handler_is_unsupported() {
        let result = statement::execute_statement(
            State(state()),
            Json(StatementRequest::new("PRINT orders")),
        )
        .await;
        assert!(matches!(result, Err(AppError::UnsupportedStatement(_))));
    }

    #[tokio::test]
    async fn test_explain_statement_set_with_ctas_is_rejected() {
        let Json(body) = statement_set::explain_statement_set(
            State(state()),
            Json(StatementSetRequest {
                statements: entries(&["INSERT INTO t SELECT 1", "CREATE TABLE c AS SELECT 1"]),
                details: vec![ExplainDetail::JsonExecutionPlan],
            }),
        )
        .await
        .unwrap();

        assert_eq!(body["explain"]["type"], "CTAS");
        assert_eq!(body["explain"]["parse_succeeded"], false);
    }

    #[tokio::test]
    async fn test_empty_statement_set_is_validation_error() {
        let result = statement_set::statement_set_plan(
            State(state()),
            Json(StatementSetRequest {
                statements: vec![],
                details: vec![],
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_lineage_handler() {
        let Json(body) = statement::statement_lineage(
            State(state()),
            Json(StatementRequest::new("INSERT INTO sink SELECT * FROM src")),
        )
        .await
        .unwrap();
        assert_eq!(body["edges"][0]["source"], "src");
        assert_eq!(body["edges"][0]["target"], "sink");
    }
}
