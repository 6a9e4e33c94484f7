//! Experiment condition and progress endpoints (JWT-protected).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use advisor::experiment::ProgressUpdate;
use advisor::AdvisorError;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub user_id: Uuid,
}

pub async fn info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> Result<Json<Value>, AppError> {
    let info = state
        .experiment
        .info(query.user_id)
        .await?
        .ok_or(AdvisorError::UserNotFound)?;

    let mut body = serde_json::Map::new();
    body.insert("code".to_string(), json!(200));
    body.insert("message".to_string(), json!("success"));
    // ExperimentInfo is a plain struct of owned fields; serialization cannot
    // fail and always yields an object.
    if let Ok(Value::Object(info)) = serde_json::to_value(&info) {
        body.extend(info);
    }
    Ok(Json(Value::Object(body)))
}

#[derive(Debug, Deserialize)]
pub struct ProgressBody {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub update: ProgressUpdate,
}

pub async fn update_progress(
    State(state): State<AppState>,
    Json(body): Json<ProgressBody>,
) -> Result<Json<Value>, AppError> {
    let snapshot = state
        .experiment
        .update_progress(body.user_id, &body.update)
        .await?
        .ok_or(AdvisorError::UserNotFound)?;

    Ok(Json(json!({
        "code": 200,
        "message": "success",
        "progress": snapshot,
    })))
}
