use axum::{extract::State, Json};
use serde_json::json;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::config::Config;
use crate::models::StatementRequest;
use crate::services::datafusion::DataFusionEngine;
use crate::services::StatementService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatementService<DataFusionEngine>>,
    pub config: Config,
}

fn statement_text(payload: &StatementRequest) -> Result<&str, AppError> {
    let statement = payload.statement.trim();
    if statement.is_empty() {
        return Err(AppError::Validation("Statement cannot be empty".to_string()));
    }
    Ok(statement)
}

/// Execute one statement
pub async fn execute_statement(
    State(state): State<AppState>,
    Json(payload): Json<StatementRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let statement = statement_text(&payload)?;
    tracing::info!("Executing statement: {}", statement);

    let result = state.service.execute_sql(statement).await?;
    Ok(Json(json!({ "result": result })))
}

/// Explain one statement
pub async fn explain_statement(
    State(state): State<AppState>,
    Json(payload): Json<StatementRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let statement = statement_text(&payload)?;
    tracing::info!("Explaining statement: {}", statement);

    let explain = state.service.explain_sql(statement, &payload.details).await?;
    Ok(Json(json!({ "explain": explain })))
}

/// Render the job graph of one insert statement
pub async fn statement_graph(
    State(state): State<AppState>,
    Json(payload): Json<StatementRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let statement = statement_text(&payload)?;
    tracing::info!("Rendering job graph for statement: {}", statement);

    let graph = state.service.statement_graph(statement).await?;
    Ok(Json(json!({ "graph": graph })))
}

/// Table-level lineage of one or more statements
pub async fn statement_lineage(
    State(state): State<AppState>,
    Json(payload): Json<StatementRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let statement = statement_text(&payload)?;
    tracing::info!("Analyzing lineage for statement: {}", statement);

    let edges = state.service.lineage(statement)?;
    Ok(Json(json!({ "edges": edges })))
}

/// Effective engine configuration merged with session properties
pub async fn get_configuration(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let configuration = state.service.effective_configuration().await;
    Ok(Json(json!({ "configuration": configuration })))
}
