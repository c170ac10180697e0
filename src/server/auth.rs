use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use super::error::{AppError, Result};
use super::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// 管理接口鉴权，token 可以放在 `X-Admin-Token` 或 `Authorization: Bearer` 中
pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let token = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        });

    match token {
        Some(token)
            if !state.token.is_empty()
                && bool::from(token.as_bytes().ct_eq(state.token.as_bytes())) => {}
        Some(_) => return Err(AppError::unauthorized("Invalid admin token")),
        None => return Err(AppError::unauthorized("Missing admin token")),
    }

    Ok(next.run(request).await)
}
