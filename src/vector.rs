use bytemuck::{cast_slice, pod_collect_to_vec};

use crate::error::ArtError;

/// 计算向量的 L2 范数
pub fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt()
}

/// L2 归一化，零向量原样返回
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let n = norm(v);
    if n > 0. { v.iter().map(|&x| (x as f64 / n) as f32).collect() } else { v.to_vec() }
}

#[inline(always)]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// 计算两个已归一化向量的余弦相似度
pub fn similarity(a: &[f32], b: &[f32]) -> Result<f32, ArtError> {
    if a.len() != b.len() {
        return Err(ArtError::DimensionMismatch { got: b.len(), expected: a.len() });
    }
    Ok(dot(a, b))
}

/// 将向量编码为数据库中存储的字节
pub fn to_bytes(v: &[f32]) -> Vec<u8> {
    cast_slice::<f32, u8>(v).to_vec()
}

/// 从数据库字节解码向量，长度不合法时返回 None
pub fn from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % size_of::<f32>() != 0 {
        return None;
    }
    Some(pod_collect_to_vec(bytes))
}
