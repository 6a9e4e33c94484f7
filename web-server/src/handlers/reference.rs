//! Regional reference-data endpoints (public).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MedicalQuery {
    pub city: String,
}

pub async fn medical_info(
    State(state): State<AppState>,
    Query(query): Query<MedicalQuery>,
) -> Result<Json<Value>, AppError> {
    match state.reference.medical_info(&query.city).await? {
        Some(info) => Ok(Json(json!({
            "code": 200,
            "message": "success",
            "medical_info": info,
        }))),
        None => Ok(Json(json!({
            "code": 404,
            "message": format!("no medical data for city '{}'", query.city),
        }))),
    }
}

#[derive(Debug, Deserialize)]
pub struct PensionQuery {
    pub province: String,
}

pub async fn pension_info(
    State(state): State<AppState>,
    Query(query): Query<PensionQuery>,
) -> Result<Json<Value>, AppError> {
    match state.reference.pension_info(&query.province).await? {
        Some(info) => Ok(Json(json!({
            "code": 200,
            "message": "success",
            "pension_info": info,
        }))),
        None => Ok(Json(json!({
            "code": 404,
            "message": format!("no pension data for province '{}'", query.province),
        }))),
    }
}
