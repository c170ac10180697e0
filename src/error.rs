use thiserror::Error;

/// 匹配与写入过程中的错误
#[derive(Debug, Error, PartialEq)]
pub enum ArtError {
    /// 索引中没有任何描述符
    #[error("Empty database")]
    EmptyIndex,
    /// 索引非空但无法确定维度
    #[error("Database embeddings dimension unknown")]
    UnknownDimension,
    #[error("Embedding dim mismatch: got {got}, expected {expected}")]
    DimensionMismatch { got: usize, expected: usize },
    /// 匹配任务在完成前被取消，通常发生在运行时关闭时
    #[error("Match task cancelled")]
    Cancelled,
    /// 写入数据不合法
    #[error("{0}")]
    Validation(String),
}

impl ArtError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 是否由于缓存尚不可用导致
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::EmptyIndex | Self::UnknownDimension | Self::Cancelled)
    }
}
