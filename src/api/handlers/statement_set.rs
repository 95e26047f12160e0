use axum::{extract::State, Json};
use serde_json::json;

use crate::api::handlers::statement::AppState;
use crate::api::middleware::AppError;
use crate::models::{JobStatement, StatementSetRequest};

fn job_statements(payload: StatementSetRequest) -> Result<Vec<JobStatement>, AppError> {
    payload.validate().map_err(AppError::Validation)?;
    Ok(payload.into_job_statements())
}

/// Execute a statement set as one merged job
pub async fn execute_statement_set(
    State(state): State<AppState>,
    Json(payload): Json<StatementSetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let statements = job_statements(payload)?;
    tracing::info!("Executing statement set with {} entries", statements.len());

    let result = state.service.execute_statement_set(&statements).await?;
    Ok(Json(json!({ "result": result })))
}

/// Explain a statement set as one combined explanation
pub async fn explain_statement_set(
    State(state): State<AppState>,
    Json(payload): Json<StatementSetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let details = payload.details.clone();
    let statements = job_statements(payload)?;
    tracing::info!("Explaining statement set with {} entries", statements.len());

    let explain = state
        .service
        .explain_statement_set(&statements, &details)
        .await?;
    Ok(Json(json!({ "explain": explain })))
}

/// Render the merged job plan of a statement set without running it
pub async fn statement_set_plan(
    State(state): State<AppState>,
    Json(payload): Json<StatementSetRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let statements = job_statements(payload)?;
    tracing::info!("Rendering job plan for {} entries", statements.len());

    let plan = state.service.job_plan(&statements).await?;
    Ok(Json(json!({ "plan": plan })))
}
