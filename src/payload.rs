use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use utoipa::ToSchema;

use crate::catalog::Descriptions;

/// 写入艺术品的请求数据
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ArtworkPayload {
    #[serde(default, deserialize_with = "de_opt_string")]
    #[schema(value_type = String)]
    pub id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    /// 年份，也接受数字
    #[serde(default, deserialize_with = "de_opt_string")]
    #[schema(value_type = Option<String>)]
    pub year: Option<String>,
    pub museum: Option<String>,
    pub location: Option<String>,
    /// 语言代码 => 描述
    #[schema(value_type = Option<Object>)]
    pub descriptions: Option<Descriptions>,
    /// 旧格式的单一描述，视为意大利语
    pub description: Option<String>,
    #[serde(default)]
    pub visual_descriptors: Vec<DescriptorPayload>,
}

/// 写入时附带的视觉描述符
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DescriptorPayload {
    #[serde(default, deserialize_with = "de_opt_string")]
    #[schema(value_type = Option<String>)]
    pub id: Option<String>,
    pub image_path: Option<String>,
    /// 原始向量，写入前会被归一化
    pub embedding: Option<Vec<f32>>,
}

impl ArtworkPayload {
    /// 合并新旧两种描述格式
    pub fn descriptions(&self) -> Descriptions {
        match (&self.descriptions, &self.description) {
            (Some(d), _) => d.clone(),
            (None, Some(text)) if !text.is_empty() => [("it", text.as_str())].into_iter().collect(),
            _ => Descriptions::new(),
        }
    }
}

/// 字符串或数字都转为字符串
fn de_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("expected string, got {other}"))),
    }
}

/// 解析导入文件
///
/// 支持两种格式：以 ID 为键的对象，或是艺术品数组
pub fn parse_payloads(value: Value) -> Result<Vec<ArtworkPayload>> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(id, mut item)| -> Result<ArtworkPayload> {
                let obj = item.as_object_mut().ok_or_else(|| anyhow!("艺术品 {id} 不是对象"))?;
                obj.entry("id").or_insert(Value::String(id));
                Ok(serde_json::from_value(item)?)
            })
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| -> Result<ArtworkPayload> { Ok(serde_json::from_value(item)?) })
            .collect(),
        _ => Err(anyhow!("无法识别的导入格式")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_numeric_fields() {
        let p: ArtworkPayload = serde_json::from_value(json!({
            "id": 42,
            "title": "Primavera",
            "year": 1480,
            "visual_descriptors": [{"id": 1, "embedding": [1.0, 0.0]}],
        }))
        .unwrap();
        assert_eq!(p.id.as_deref(), Some("42"));
        assert_eq!(p.year.as_deref(), Some("1480"));
        assert_eq!(p.visual_descriptors[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_legacy_description() {
        let p: ArtworkPayload =
            serde_json::from_value(json!({"id": "a", "description": "ciao"})).unwrap();
        assert_eq!(p.descriptions().get("it"), Some("ciao"));

        let p: ArtworkPayload = serde_json::from_value(
            json!({"id": "a", "description": "ciao", "descriptions": {"en": "hi"}}),
        )
        .unwrap();
        assert_eq!(p.descriptions().get("it"), None);
        assert_eq!(p.descriptions().get("en"), Some("hi"));
    }

    #[test]
    fn test_parse_keyed_object() {
        let payloads = parse_payloads(json!({
            "botticelli-venere": {"title": "Nascita di Venere"},
            "x": {"id": "explicit", "title": "X"},
        }))
        .unwrap();
        let mut ids: Vec<_> = payloads.iter().filter_map(|p| p.id.as_deref()).collect();
        ids.sort();
        assert_eq!(ids, ["botticelli-venere", "explicit"]);
    }

    #[test]
    fn test_parse_array_and_invalid() {
        let payloads = parse_payloads(json!([{"id": "a"}, {"id": "b"}])).unwrap();
        assert_eq!(payloads.len(), 2);
        assert!(parse_payloads(json!("nope")).is_err());
        assert!(parse_payloads(json!({"a": 1})).is_err());
    }
}
