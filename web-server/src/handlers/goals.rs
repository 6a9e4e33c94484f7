//! Goal management endpoints (JWT-protected).
//!
//! Goals are documents keyed by user; missing goal/task ids answer with an
//! in-body 404 like the rest of the document endpoints.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use advisor::goals::{GoalPatch, SubGoal, SubTask};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

pub async fn basic_info(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, AppError> {
    let goals = state.goals.list_basic(query.user_id).await?;
    Ok(Json(json!({
        "code": 200,
        "message": "success",
        "goals": goals,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceGoalsBody {
    pub user_id: Uuid,
    pub goals: Vec<GoalPatch>,
}

pub async fn replace_goals(
    State(state): State<AppState>,
    Json(body): Json<ReplaceGoalsBody>,
) -> Result<Json<Value>, AppError> {
    state.goals.replace(body.user_id, body.goals).await?;
    Ok(Json(json!({ "code": 200, "message": "success" })))
}

#[derive(Debug, Deserialize)]
pub struct DetailQuery {
    pub user_id: Uuid,
    pub goal_id: String,
}

pub async fn detail(
    State(state): State<AppState>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<Value>, AppError> {
    match state.goals.detail(query.user_id, &query.goal_id).await? {
        Some(goal) => Ok(Json(json!({
            "code": 200,
            "message": "success",
            "goal": goal,
        }))),
        None => Ok(Json(goal_not_found(&query.goal_id))),
    }
}

#[derive(Debug, Deserialize)]
pub struct SubGoalsBody {
    pub user_id: Uuid,
    pub goal_id: String,
    pub sub_goals: Vec<SubGoal>,
}

pub async fn update_sub_goals(
    State(state): State<AppState>,
    Json(body): Json<SubGoalsBody>,
) -> Result<Json<Value>, AppError> {
    let found = state
        .goals
        .update_sub_goals(body.user_id, &body.goal_id, body.sub_goals)
        .await?;
    if !found {
        return Ok(Json(goal_not_found(&body.goal_id)));
    }
    Ok(Json(json!({ "code": 200, "message": "success" })))
}

#[derive(Debug, Deserialize)]
pub struct SubTasksBody {
    pub user_id: Uuid,
    pub goal_id: String,
    pub sub_tasks: Vec<SubTask>,
}

pub async fn update_sub_tasks(
    State(state): State<AppState>,
    Json(body): Json<SubTasksBody>,
) -> Result<Json<Value>, AppError> {
    let found = state
        .goals
        .update_sub_tasks(body.user_id, &body.goal_id, body.sub_tasks)
        .await?;
    if !found {
        return Ok(Json(goal_not_found(&body.goal_id)));
    }
    Ok(Json(json!({ "code": 200, "message": "success" })))
}

#[derive(Debug, Deserialize)]
pub struct SubTaskStatusBody {
    pub user_id: Uuid,
    pub goal_id: String,
    pub sub_task_id: String,
    pub sub_task_status: bool,
}

pub async fn update_sub_task_status(
    State(state): State<AppState>,
    Json(body): Json<SubTaskStatusBody>,
) -> Result<Json<Value>, AppError> {
    let found = state
        .goals
        .update_sub_task_status(
            body.user_id,
            &body.goal_id,
            &body.sub_task_id,
            body.sub_task_status,
        )
        .await?;
    if !found {
        return Ok(Json(json!({
            "code": 404,
            "message": "goal or sub-task not found",
        })));
    }
    Ok(Json(json!({ "code": 200, "message": "success" })))
}

fn goal_not_found(goal_id: &str) -> Value {
    json!({
        "code": 404,
        "message": format!("goal '{goal_id}' not found"),
    })
}
