mod api;
mod auth;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::{get, post};
use log::warn;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use self::auth::ADMIN_TOKEN_HEADER;
pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health_handler,
        api::catalog_handler,
        api::descriptors_handler,
        api::descriptors_v2_handler,
        api::match_handler,
        api::upsert_handler,
        api::reload_handler,
    ),
    components(schemas(types::MatchRequest, types::MatchResponse, types::HealthResponse))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/artworks", post(api::upsert_handler))
        .route("/reload", post(api::reload_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::admin_auth));

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/catalog", get(api::catalog_handler))
        .route("/descriptors", get(api::descriptors_handler))
        .route("/descriptors_v2", get(api::descriptors_v2_handler))
        .route("/match", post(api::match_handler))
        .merge(admin)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors_layer(&state.cors_origins))
        .layer(DefaultBodyLimit::disable())
        // 上传限制：10M
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 10))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("忽略无效的跨域来源: {origin}");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}
