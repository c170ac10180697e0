use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::{JoinError, spawn_blocking};
use utoipa::ToSchema;

use crate::cache::{ArtCache, RefreshStats, Snapshot};
use crate::catalog::Artwork;
use crate::config::ConfDir;
use crate::db::{self, ArtworkRecord, Database, DescriptorRecord, crud};
use crate::error::ArtError;
use crate::matcher::{MatchResult, match_artworks};
use crate::metrics;
use crate::payload::ArtworkPayload;
use crate::vector;

pub struct ArtDBBuilder {
    conf_dir: ConfDir,
    refresh: bool,
}

impl ArtDBBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir, refresh: true }
    }

    /// 打开数据库后是否立即载入缓存
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub async fn open(self) -> Result<ArtDB> {
        tokio::fs::create_dir_all(self.conf_dir.path()).await?;
        let db = db::init_db(self.conf_dir.database()).await?;
        let artdb = ArtDB {
            db,
            cache: ArtCache::new(),
            refresh_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
        };
        if self.refresh {
            // 启动时刷新失败不影响打开，缓存保持为空
            artdb.try_refresh().await;
        }
        Ok(artdb)
    }
}

/// 写入艺术品的结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UpsertOutcome {
    pub id: String,
    /// 写入的描述符数量
    pub descriptors: usize,
    /// 写入后刷新缓存的结果，刷新失败时为空
    pub refreshed: Option<RefreshStats>,
}

/// 艺术品数据库，持久化存储加上内存缓存
pub struct ArtDB {
    db: Database,
    cache: ArtCache,
    /// 从读取数据库到替换快照期间持有
    refresh_lock: Mutex<()>,
    /// 进程内串行写入，写入事务先读后写，并发时会遇到 SQLITE_BUSY
    write_lock: Mutex<()>,
}

impl ArtDB {
    /// 从数据库重新构建缓存
    ///
    /// 查询在替换快照之前完成，失败时旧快照保持不变。
    /// 两次查询在同一个读事务中进行，目录与索引来自同一时刻的数据库
    pub async fn refresh(&self) -> Result<RefreshStats> {
        let _guard = self.refresh_lock.lock().await;
        let start = Instant::now();

        let mut tx = self.db.begin().await?;
        let artworks = crud::get_artworks(&mut *tx).await?;
        let descriptors = crud::get_descriptors(&mut *tx).await?;
        tx.commit().await?;

        let (snapshot, stats) = Snapshot::build(artworks, descriptors);
        let dim = snapshot.index.dimension();
        self.cache.replace(snapshot).await;

        if stats.dropped > 0 {
            warn!("刷新缓存时丢弃了 {} 个描述符", stats.dropped);
        }
        info!(
            "缓存已刷新: {} 件艺术品, {} 个描述符, 维度 {:?}, 耗时 {:.2}ms",
            stats.artworks,
            stats.descriptors,
            dim,
            start.elapsed().as_secs_f32() * 1000.
        );
        metrics::record_refresh(&stats);
        Ok(stats)
    }

    /// 刷新缓存，失败时只记录日志
    pub async fn try_refresh(&self) -> Option<RefreshStats> {
        match self.refresh().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                error!("刷新缓存失败: {e:#}");
                metrics::inc_refresh_failure();
                None
            }
        }
    }

    /// 当前缓存快照
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.cache.snapshot().await
    }

    /// 当前快照中的全部艺术品
    pub async fn catalog(&self) -> Vec<Artwork> {
        self.snapshot().await.catalog.all().cloned().collect()
    }

    /// 搜索与查询向量最相似的艺术品
    pub async fn search(
        &self,
        query: Vec<f32>,
        top_k: usize,
        threshold: f32,
        lang: Option<String>,
    ) -> Result<Vec<MatchResult>, ArtError> {
        let snapshot = self.snapshot().await;
        let start = Instant::now();

        let handle = spawn_blocking(move || {
            match_artworks(&snapshot, &query, top_k, threshold, lang.as_deref())
        });
        let result = join_search(handle.await);

        match &result {
            Ok(matches) => {
                metrics::inc_match_count("ok");
                metrics::observe_match_duration(start.elapsed().as_secs_f32());
                if let Some(best) = matches.first() {
                    metrics::observe_match_max_score(best.score);
                }
                debug!("匹配到 {} 件艺术品", matches.len());
            }
            Err(e) if e.is_unavailable() => metrics::inc_match_count("unavailable"),
            Err(_) => metrics::inc_match_count("invalid"),
        }

        result
    }

    /// 写入艺术品及其描述符，不刷新缓存，返回写入的描述符数量
    ///
    /// 所有写入在同一个事务中完成
    pub async fn write_artwork(&self, payload: &ArtworkPayload) -> Result<usize> {
        let (artwork, descriptors, observed_dim) = prepare(payload)?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.db.begin().await?;
        if let Some(dim) = observed_dim {
            let expected = match crud::get_db_dim(&mut *tx).await? {
                Some(dim) => Some(dim),
                None => self.snapshot().await.index.dimension(),
            };
            match expected {
                Some(expected) if expected != dim => {
                    return Err(ArtError::DimensionMismatch { got: dim, expected }.into());
                }
                _ => crud::ensure_db_dim(&mut *tx, dim).await?,
            }
        }
        crud::upsert_artwork(&mut *tx, &artwork).await?;
        for descriptor in &descriptors {
            crud::upsert_descriptor(&mut *tx, descriptor).await?;
        }
        tx.commit().await?;

        info!("已写入艺术品 {} ({} 个描述符)", artwork.id, descriptors.len());
        Ok(descriptors.len())
    }

    /// 写入艺术品，然后刷新缓存
    ///
    /// 写入成功后刷新失败不会导致整体失败
    pub async fn upsert_artwork(&self, payload: &ArtworkPayload) -> Result<UpsertOutcome> {
        let descriptors = self.write_artwork(payload).await?;
        let refreshed = self.try_refresh().await;
        Ok(UpsertOutcome {
            id: payload.id.as_deref().unwrap_or_default().trim().to_string(),
            descriptors,
            refreshed,
        })
    }
}

/// 取出匹配任务的结果，任务 panic 时在当前线程继续 panic
fn join_search<T>(joined: Result<Result<T, ArtError>, JoinError>) -> Result<T, ArtError> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            warn!("匹配任务被取消: {e}");
            Err(ArtError::Cancelled)
        }
    }
}

/// 校验并归一化写入数据
///
/// 返回艺术品记录、描述符记录以及描述符的向量维度
fn prepare(
    payload: &ArtworkPayload,
) -> Result<(ArtworkRecord, Vec<DescriptorRecord>, Option<usize>), ArtError> {
    let id = payload.id.as_deref().map(str::trim).unwrap_or_default();
    if id.is_empty() {
        return Err(ArtError::validation("Artwork must have an 'id'"));
    }
    if payload.title.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        return Err(ArtError::validation("Artwork must have a 'title'"));
    }

    let mut observed_dim = None;
    let mut descriptors = vec![];
    for (idx, vd) in payload.visual_descriptors.iter().enumerate() {
        let Some(embedding) = &vd.embedding else {
            continue;
        };
        if embedding.is_empty() {
            return Err(ArtError::validation(format!("Descriptor {idx} has an empty embedding")));
        }
        if embedding.iter().any(|x| !x.is_finite()) {
            return Err(ArtError::validation(format!(
                "Descriptor {idx} contains non-finite values"
            )));
        }
        let dim = *observed_dim.get_or_insert(embedding.len());
        if embedding.len() != dim {
            return Err(ArtError::DimensionMismatch { got: embedding.len(), expected: dim });
        }
        let descriptor_id = match vd.id.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => format!("main#{idx}"),
        };
        descriptors.push(DescriptorRecord {
            artwork_id: id.to_string(),
            descriptor_id,
            image_path: vd.image_path.clone(),
            embedding: Some(vector::to_bytes(&vector::normalize(embedding))),
        });
    }

    let descriptions = serde_json::to_string(&payload.descriptions())
        .map_err(|e| ArtError::validation(e.to_string()))?;
    let artwork = ArtworkRecord {
        id: id.to_string(),
        title: payload.title.clone(),
        artist: payload.artist.clone(),
        year: payload.year.clone(),
        museum: payload.museum.clone(),
        location: payload.location.clone(),
        descriptions: Some(descriptions),
    };

    Ok((artwork, descriptors, observed_dim))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> ArtworkPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_prepare_normalizes() {
        let (artwork, descriptors, dim) = prepare(&payload(json!({
            "id": " a1 ",
            "title": "Primavera",
            "descriptions": {"it": "ciao"},
            "visual_descriptors": [
                {"embedding": [3.0, 4.0], "image_path": "a1.jpg"},
                {"id": "no-embedding"},
                {"id": "side", "embedding": [0.0, 2.0]},
            ],
        })))
        .unwrap();
        assert_eq!(artwork.id, "a1");
        assert_eq!(artwork.descriptions.as_deref(), Some(r#"{"it":"ciao"}"#));
        assert_eq!(dim, Some(2));
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].descriptor_id, "main#0");
        assert_eq!(descriptors[1].descriptor_id, "side");
        let v = vector::from_bytes(descriptors[0].embedding.as_deref().unwrap()).unwrap();
        assert_eq!(v, vec![0.6, 0.8]);
    }

    #[tokio::test]
    async fn test_cancelled_search_task() {
        let handle = tokio::spawn(std::future::pending::<Result<(), ArtError>>());
        handle.abort();
        let joined = handle.await;
        assert!(joined.as_ref().is_err_and(JoinError::is_cancelled));
        assert_eq!(join_search(joined), Err(ArtError::Cancelled));
    }

    #[tokio::test]
    async fn test_finished_search_task() {
        let joined = tokio::spawn(async { Err::<(), _>(ArtError::EmptyIndex) }).await;
        assert_eq!(join_search(joined), Err(ArtError::EmptyIndex));
    }

    #[test]
    fn test_prepare_rejects() {
        let err = prepare(&payload(json!({"title": "x"}))).unwrap_err();
        assert!(matches!(err, ArtError::Validation(_)));

        let err = prepare(&payload(json!({"id": "a"}))).unwrap_err();
        assert!(matches!(err, ArtError::Validation(_)));

        let err = prepare(&payload(json!({
            "id": "a",
            "title": "x",
            "visual_descriptors": [{"embedding": [1.0, 0.0]}, {"embedding": [1.0, 0.0, 0.0]}],
        })))
        .unwrap_err();
        assert_eq!(err, ArtError::DimensionMismatch { got: 3, expected: 2 });

        let err = prepare(&payload(json!({
            "id": "a",
            "title": "x",
            "visual_descriptors": [{"embedding": []}],
        })))
        .unwrap_err();
        assert!(matches!(err, ArtError::Validation(_)));
    }
}
