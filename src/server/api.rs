use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use log::info;

use super::error::Result;
use super::state::AppState;
use super::types::*;
use crate::artdb::UpsertOutcome;
use crate::cache::RefreshStats;
use crate::catalog::Artwork;
use crate::descriptor::Descriptor;
use crate::payload::ArtworkPayload;

/// 服务状态
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let snapshot = state.db.snapshot().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        artworks: snapshot.catalog.len(),
        descriptors: snapshot.index.len(),
        dim: snapshot.index.dimension(),
    })
}

/// 列出所有艺术品
#[utoipa::path(
    get,
    path = "/catalog",
    responses(
        (status = 200, body = Vec<Artwork>),
    )
)]
pub async fn catalog_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Artwork>> {
    Json(state.db.catalog().await)
}

/// 列出所有描述符
#[utoipa::path(
    get,
    path = "/descriptors",
    responses(
        (status = 200, body = Vec<Descriptor>),
    )
)]
pub async fn descriptors_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Descriptor>> {
    Json(state.db.snapshot().await.index.all().to_vec())
}

/// 按艺术品分组的描述符向量
///
/// 每组的顺序与 `/catalog` 中的 `visual_descriptors` 一致
#[utoipa::path(
    get,
    path = "/descriptors_v2",
    responses(
        (status = 200, body = BTreeMap<String, Vec<Vec<f32>>>),
    )
)]
pub async fn descriptors_v2_handler(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, Vec<Vec<f32>>>> {
    let snapshot = state.db.snapshot().await;
    let mut grouped: BTreeMap<String, Vec<Vec<f32>>> = BTreeMap::new();
    for d in snapshot.index.all() {
        grouped.entry(d.artwork_id.clone()).or_default().push(d.embedding.clone());
    }
    Json(grouped)
}

/// 使用向量搜索艺术品
#[utoipa::path(
    post,
    path = "/match",
    request_body = MatchRequest,
    responses(
        (status = 200, body = MatchResponse),
        (status = 400, description = "参数错误或向量维度不一致"),
        (status = 503, description = "数据库为空"),
    )
)]
pub async fn match_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MatchRequest>,
) -> Result<Json<MatchResponse>> {
    req.validate()?;

    let start = Instant::now();
    let matches = state.db.search(req.embedding, req.top_k, req.threshold, req.lang).await?;

    Ok(Json(MatchResponse { time: start.elapsed().as_millis() as u64, matches }))
}

/// 添加或更新艺术品，需要管理 token
#[utoipa::path(
    post,
    path = "/artworks",
    request_body = ArtworkPayload,
    responses(
        (status = 200, body = UpsertOutcome),
        (status = 400, description = "数据不合法或向量维度不一致"),
        (status = 401, description = "token 错误"),
    )
)]
pub async fn upsert_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ArtworkPayload>,
) -> Result<Json<UpsertOutcome>> {
    let outcome = state.db.upsert_artwork(&payload).await?;
    Ok(Json(outcome))
}

/// 从数据库重新载入缓存，需要管理 token
#[utoipa::path(
    post,
    path = "/reload",
    responses(
        (status = 200, body = RefreshStats),
        (status = 401, description = "token 错误"),
    )
)]
pub async fn reload_handler(State(state): State<Arc<AppState>>) -> Result<Json<RefreshStats>> {
    info!("手动刷新缓存");
    Ok(Json(state.db.refresh().await?))
}
