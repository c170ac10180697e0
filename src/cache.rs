use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::catalog::{Artwork, CatalogStore, DescriptorMeta};
use crate::db::{ArtworkRecord, DescriptorRecord};
use crate::descriptor::DescriptorIndex;

/// 目录与描述符索引的一致快照
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub catalog: CatalogStore,
    pub index: DescriptorIndex,
}

/// 刷新缓存的统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct RefreshStats {
    /// 艺术品数量
    pub artworks: usize,
    /// 已载入的描述符数量
    pub descriptors: usize,
    /// 因维度不一致或无法解码而丢弃的描述符数量
    pub dropped: usize,
}

impl Snapshot {
    /// 从数据库记录构建快照
    pub fn build(
        artworks: impl IntoIterator<Item = ArtworkRecord>,
        descriptors: impl IntoIterator<Item = DescriptorRecord>,
    ) -> (Self, RefreshStats) {
        let (index, dropped) = DescriptorIndex::from_rows(descriptors);

        let mut metas: HashMap<&str, Vec<DescriptorMeta>> = HashMap::new();
        for d in index.all() {
            metas.entry(d.artwork_id.as_str()).or_default().push(DescriptorMeta {
                id: d.descriptor_id.clone(),
                image_path: d.image_path.clone(),
            });
        }
        let catalog = CatalogStore::new(artworks.into_iter().map(|record| {
            let mut artwork = Artwork::from(record);
            if let Some(visual_descriptors) = metas.remove(artwork.id.as_str()) {
                artwork.visual_descriptors = visual_descriptors;
            }
            artwork
        }));
        let stats =
            RefreshStats { artworks: catalog.len(), descriptors: index.len(), dropped };
        (Self { catalog, index }, stats)
    }
}

/// 进程内共享的缓存
///
/// 读取方拿到的是某一时刻完整快照的引用，刷新时整体替换
#[derive(Debug, Default)]
pub struct ArtCache {
    current: RwLock<Arc<Snapshot>>,
}

impl ArtCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前快照
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().await.clone()
    }

    /// 替换为新的快照
    pub async fn replace(&self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        // NOTE: 旧快照在锁外释放
        let _old = std::mem::replace(&mut *self.current.write().await, snapshot);
    }
}
