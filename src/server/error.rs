use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;
use serde_json::json;

use crate::error::ArtError;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

/// API错误类型
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn unauthorized(msg: &str) -> Self {
        Self { status: StatusCode::UNAUTHORIZED, error: anyhow::anyhow!("{msg}") }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let detail = if self.status.is_server_error() && self.error.downcast_ref::<ArtError>().is_none()
        {
            error!("请求处理失败: {:#}", self.error);
            format!("Something went wrong: {}", self.error)
        } else {
            self.error.to_string()
        };
        (self.status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        let status = match error.downcast_ref::<ArtError>() {
            Some(e) if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Some(_) => StatusCode::BAD_REQUEST,
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self { status, error }
    }
}
