//! Bearer-token authentication middleware.

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;

use advisor::auth::TokenSigner;

use crate::error::AppError;

/// The authenticated account, injected into request extensions for handlers
/// that want it.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account: String,
}

/// Validate the `Authorization: Bearer <token>` header and stash the
/// authenticated account. Rejects with 401 on any failure.
pub async fn jwt_auth(
    Extension(signer): Extension<TokenSigner>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("missing authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected bearer token".to_string()))?;

    let claims = signer
        .verify(token)
        .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))?;

    request.extensions_mut().insert(CurrentUser {
        account: claims.sub,
    });
    Ok(next.run(request).await)
}
