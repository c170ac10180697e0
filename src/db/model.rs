use log::warn;

use crate::catalog::{Artwork, Descriptions};

/// 艺术品记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArtworkRecord {
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub year: Option<String>,
    pub museum: Option<String>,
    pub location: Option<String>,
    /// JSON 对象，语言代码 => 描述
    pub descriptions: Option<String>,
}

impl From<ArtworkRecord> for Artwork {
    fn from(record: ArtworkRecord) -> Self {
        let descriptions = match record.descriptions.as_deref() {
            None | Some("") => Descriptions::new(),
            Some(s) => serde_json::from_str(s).unwrap_or_else(|e| {
                warn!("艺术品 {} 的描述格式错误: {e}", record.id);
                Descriptions::new()
            }),
        };
        Self {
            id: record.id,
            title: record.title,
            artist: record.artist,
            year: record.year,
            museum: record.museum,
            location: record.location,
            descriptions,
            visual_descriptors: vec![],
        }
    }
}

/// 描述符记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DescriptorRecord {
    pub artwork_id: String,
    pub descriptor_id: String,
    pub image_path: Option<String>,
    /// f32 向量的原始字节
    pub embedding: Option<Vec<u8>>,
}
