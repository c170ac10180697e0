use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ArtError;
use crate::matcher::{MAX_TOP_K, MatchResult};

/// 匹配请求
#[derive(Debug, Deserialize, ToSchema)]
pub struct MatchRequest {
    /// 查询向量
    pub embedding: Vec<f32>,
    /// 返回的艺术品数量，范围从 1 到 50
    #[serde(default = "default_top_k")]
    #[schema(default = 1, minimum = 1, maximum = 50)]
    pub top_k: usize,
    /// 相似度阈值，范围从 -1 到 1
    #[serde(default)]
    #[schema(default = 0.0, minimum = -1.0, maximum = 1.0)]
    pub threshold: f32,
    /// 首选的描述语言（it、en 等）
    pub lang: Option<String>,
}

fn default_top_k() -> usize {
    1
}

impl MatchRequest {
    /// 检查请求参数范围
    pub fn validate(&self) -> Result<(), ArtError> {
        if !(1..=MAX_TOP_K).contains(&self.top_k) {
            return Err(ArtError::validation(format!("top_k must be between 1 and {MAX_TOP_K}")));
        }
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(ArtError::validation("threshold must be between -1 and 1"));
        }
        Ok(())
    }
}

/// 匹配响应
#[derive(Debug, Serialize, ToSchema)]
pub struct MatchResponse {
    /// 匹配耗时，单位为毫秒
    pub time: u64,
    /// 按相似度降序排列的结果
    pub matches: Vec<MatchResult>,
}

/// 服务状态
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// 缓存中的艺术品数量
    pub artworks: usize,
    /// 缓存中的描述符数量
    pub descriptors: usize,
    /// 向量维度
    pub dim: Option<usize>,
}
