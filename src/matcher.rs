use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::cache::Snapshot;
use crate::error::ArtError;
use crate::vector;

/// 单次查询最多返回的结果数量
pub const MAX_TOP_K: usize = 50;

/// 匹配结果
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MatchResult {
    pub artwork_id: String,
    /// 得分最高的描述符
    pub descriptor_id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    /// 余弦相似度，范围 [-1, 1]
    #[serde(rename = "confidence")]
    pub score: f32,
    pub image_path: Option<String>,
}

/// 在快照中搜索与查询向量最相似的艺术品
///
/// # Arguments
///
/// * `snapshot` - 缓存快照
/// * `query` - 查询向量，无需归一化
/// * `top_k` - 返回数量，会被限制在 [1, 50]
/// * `threshold` - 得分低于该值的描述符会被忽略
/// * `lang` - 首选的描述语言
pub fn match_artworks(
    snapshot: &Snapshot,
    query: &[f32],
    top_k: usize,
    threshold: f32,
    lang: Option<&str>,
) -> Result<Vec<MatchResult>, ArtError> {
    let index = &snapshot.index;
    if index.is_empty() {
        return Err(ArtError::EmptyIndex);
    }
    let dim = index.dimension().ok_or(ArtError::UnknownDimension)?;
    if query.len() != dim {
        return Err(ArtError::DimensionMismatch { got: query.len(), expected: dim });
    }
    if query.iter().any(|x| !x.is_finite()) {
        return Err(ArtError::validation("Embedding contains non-finite values"));
    }
    let query = vector::normalize(query);

    let descriptors = index.all();
    // 并行计算得分，collect 保持原有顺序
    let scores: Vec<f32> =
        descriptors.par_iter().map(|d| vector::dot(&query, &d.embedding)).collect();

    // 每件艺术品只保留得分最高的描述符，得分相同时保留先出现的
    let mut best: Vec<(usize, f32)> = vec![];
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for (i, (d, &score)) in descriptors.iter().zip(&scores).enumerate() {
        if score < threshold {
            continue;
        }
        match slots.get(d.artwork_id.as_str()) {
            Some(&slot) => {
                if score > best[slot].1 {
                    best[slot] = (i, score);
                }
            }
            None => {
                slots.insert(&d.artwork_id, best.len());
                best.push((i, score));
            }
        }
    }

    best.sort_by(|a, b| b.1.total_cmp(&a.1));
    best.truncate(top_k.clamp(1, MAX_TOP_K));

    let results = best
        .into_iter()
        .map(|(i, score)| {
            let d = &descriptors[i];
            let artwork = snapshot.catalog.get(&d.artwork_id);
            MatchResult {
                artwork_id: d.artwork_id.clone(),
                descriptor_id: d.descriptor_id.clone(),
                title: artwork.and_then(|a| a.title.clone()),
                artist: artwork.and_then(|a| a.artist.clone()),
                description: artwork
                    .and_then(|a| a.descriptions.resolve(lang))
                    .map(str::to_string),
                score,
                image_path: d.image_path.clone(),
            }
        })
        .collect();

    Ok(results)
}
