use log::debug;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::DescriptorRecord;
use crate::vector;

/// 视觉描述符，属于某一件艺术品
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Descriptor {
    pub artwork_id: String,
    /// 在同一件艺术品内唯一
    pub descriptor_id: String,
    /// 图片路径，仅用于展示
    pub image_path: Option<String>,
    /// 归一化后的向量
    pub embedding: Vec<f32>,
}

/// 描述符索引
///
/// 按 (artwork_id, descriptor_id) 升序排列，所有向量维度相同
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescriptorIndex {
    descriptors: Vec<Descriptor>,
    dimension: Option<usize>,
}

impl DescriptorIndex {
    /// 从数据库记录构建索引，返回索引和被丢弃的记录数量
    ///
    /// 维度由第一条有效记录决定，之后维度不同或无法解码的记录会被直接丢弃
    pub fn from_rows(rows: impl IntoIterator<Item = DescriptorRecord>) -> (Self, usize) {
        let mut rows: Vec<_> = rows.into_iter().collect();
        rows.sort_by(|a, b| {
            (&a.artwork_id, &a.descriptor_id).cmp(&(&b.artwork_id, &b.descriptor_id))
        });

        let mut dimension = None;
        let mut dropped = 0;
        let mut descriptors = Vec::with_capacity(rows.len());

        for row in rows {
            let Some(embedding) = row.embedding.as_deref().and_then(vector::from_bytes) else {
                debug!("丢弃无法解码的描述符: {}/{}", row.artwork_id, row.descriptor_id);
                dropped += 1;
                continue;
            };
            if embedding.iter().any(|x| !x.is_finite()) {
                debug!("丢弃包含非有限值的描述符: {}/{}", row.artwork_id, row.descriptor_id);
                dropped += 1;
                continue;
            }
            let dim = *dimension.get_or_insert(embedding.len());
            if embedding.len() != dim {
                debug!(
                    "丢弃维度不一致的描述符: {}/{} ({} != {})",
                    row.artwork_id,
                    row.descriptor_id,
                    embedding.len(),
                    dim
                );
                dropped += 1;
                continue;
            }
            descriptors.push(Descriptor {
                artwork_id: row.artwork_id,
                descriptor_id: row.descriptor_id,
                image_path: row.image_path,
                embedding: vector::normalize(&embedding),
            });
        }

        (Self { descriptors, dimension }, dropped)
    }

    pub fn all(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// 向量维度，索引为空时返回 None
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.filter(|_| !self.descriptors.is_empty())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
