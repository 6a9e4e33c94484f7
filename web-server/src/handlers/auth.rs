//! Login, registration and password reset.
//!
//! Login takes an OAuth2-style form body; the JSON endpoints mirror the
//! client's native shapes. All three answer with the same bearer-token
//! payload.

use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;

use advisor::auth::AuthToken;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<AuthToken>, AppError> {
    let token = state.auth.login(&form.username, &form.password).await?;
    Ok(Json(token))
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub account: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<AuthToken>, AppError> {
    let token = state.auth.register(&body.account, &body.password).await?;
    Ok(Json(token))
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub account: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Json<AuthToken>, AppError> {
    let token = state
        .auth
        .reset_password(&body.account, &body.new_password)
        .await?;
    Ok(Json(token))
}
