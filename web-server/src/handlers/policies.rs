//! Held-policy list endpoints (JWT-protected).

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use advisor::policies::{AddOutcome, PolicyRef};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

pub async fn get_list(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, AppError> {
    let list = state.policies.get(query.user_id).await?;
    Ok(Json(json!({
        "code": 200,
        "message": "success",
        "insurance_list": list,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AddBody {
    pub user_id: Uuid,
    pub product_id: i64,
    pub product_type: String,
}

pub async fn add(
    State(state): State<AppState>,
    Json(body): Json<AddBody>,
) -> Result<Json<Value>, AppError> {
    let entry = PolicyRef {
        product_id: body.product_id,
        product_type: body.product_type,
    };
    match state.policies.add(body.user_id, entry).await? {
        AddOutcome::Added => Ok(Json(json!({ "code": 200, "message": "success" }))),
        AddOutcome::Duplicate => Ok(Json(json!({
            "code": 400,
            "message": "product already in list",
        }))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReplaceBody {
    pub user_id: Uuid,
    pub insurance_list: Vec<PolicyRef>,
}

pub async fn replace(
    State(state): State<AppState>,
    Json(body): Json<ReplaceBody>,
) -> Result<Json<Value>, AppError> {
    state.policies.replace(body.user_id, body.insurance_list).await?;
    Ok(Json(json!({ "code": 200, "message": "success" })))
}
