use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::ToSchema;

/// 无指定语言时依次尝试的描述语言
const FALLBACK_LANGS: [&str; 2] = ["it", "en"];

/// 多语言描述，保留插入顺序
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptions(Vec<(String, String)>);

impl Descriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖一条描述，覆盖时保留原位置
    pub fn insert(&mut self, lang: impl Into<String>, text: impl Into<String>) {
        let (lang, text) = (lang.into(), text.into());
        match self.0.iter_mut().find(|(k, _)| *k == lang) {
            Some(entry) => entry.1 = text,
            None => self.0.push((lang, text)),
        }
    }

    pub fn get(&self, lang: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == lang).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// 选择描述文本
    ///
    /// 优先使用 `preferred`（小写，只取前两个字符），其次 it、en，最后是第一条描述
    pub fn resolve(&self, preferred: Option<&str>) -> Option<&str> {
        let preferred = preferred
            .map(|lang| lang.trim().to_lowercase().chars().take(2).collect::<String>())
            .filter(|lang| !lang.is_empty());
        if let Some(text) = preferred.and_then(|lang| self.get(&lang)).filter(|s| !s.is_empty()) {
            return Some(text);
        }
        FALLBACK_LANGS
            .iter()
            .find_map(|lang| self.get(lang).filter(|s| !s.is_empty()))
            .or_else(|| self.0.first().map(|(_, v)| v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Descriptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut descriptions = Self::new();
        for (k, v) in iter {
            descriptions.insert(k, v);
        }
        descriptions
    }
}

impl Serialize for Descriptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Descriptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DescriptionsVisitor;

        impl<'de> Visitor<'de> for DescriptionsVisitor {
            type Value = Descriptions;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from language code to text")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut descriptions = Descriptions::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    descriptions.insert(k, v);
                }
                Ok(descriptions)
            }
        }

        deserializer.deserialize_map(DescriptionsVisitor)
    }
}

/// 艺术品元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Artwork {
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub year: Option<String>,
    pub museum: Option<String>,
    pub location: Option<String>,
    /// 语言代码 => 描述
    #[schema(value_type = Object)]
    pub descriptions: Descriptions,
    /// 已载入的描述符，顺序与索引一致
    #[serde(default)]
    pub visual_descriptors: Vec<DescriptorMeta>,
}

/// 描述符元数据，不含向量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DescriptorMeta {
    pub id: String,
    pub image_path: Option<String>,
}

/// 艺术品目录，某一时刻数据库内容的只读快照
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    artworks: HashMap<String, Artwork>,
    /// 按标题排序的 ID，无标题的排在最后
    order: Vec<String>,
}

impl CatalogStore {
    /// 从艺术品列表构建目录，ID 重复时后者覆盖前者
    pub fn new(artworks: impl IntoIterator<Item = Artwork>) -> Self {
        let artworks: HashMap<_, _> = artworks.into_iter().map(|a| (a.id.clone(), a)).collect();
        let mut order: Vec<&Artwork> = artworks.values().collect();
        order.sort_by(|a, b| cmp_title(a, b).then_with(|| a.id.cmp(&b.id)));
        let order = order.into_iter().map(|a| a.id.clone()).collect();
        Self { artworks, order }
    }

    pub fn get(&self, id: &str) -> Option<&Artwork> {
        self.artworks.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &Artwork> {
        self.order.iter().filter_map(|id| self.artworks.get(id))
    }

    pub fn len(&self) -> usize {
        self.artworks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artworks.is_empty()
    }
}

fn cmp_title(a: &Artwork, b: &Artwork) -> Ordering {
    match (&a.title, &b.title) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn artwork(id: &str, title: Option<&str>) -> Artwork {
        Artwork {
            id: id.to_string(),
            title: title.map(str::to_string),
            artist: None,
            year: None,
            museum: None,
            location: None,
            descriptions: Descriptions::new(),
            visual_descriptors: vec![],
        }
    }

    #[test]
    fn test_descriptions_keep_order() {
        let d: Descriptions = serde_json::from_str(r#"{"fr": "a", "de": "b", "en": "c"}"#).unwrap();
        let langs: Vec<_> = d.iter().map(|(k, _)| k).collect();
        assert_eq!(langs, ["fr", "de", "en"]);
        assert_eq!(serde_json::to_string(&d).unwrap(), r#"{"fr":"a","de":"b","en":"c"}"#);
    }

    #[test]
    fn test_descriptions_overwrite_in_place() {
        let mut d: Descriptions = [("en", "x"), ("it", "y")].into_iter().collect();
        d.insert("en", "z");
        assert_eq!(d.len(), 2);
        assert_eq!(d.iter().next(), Some(("en", "z")));
    }

    #[rstest]
    #[case::preferred(Some("fr"), Some("bonjour"))]
    #[case::preferred_region(Some("FR-ca"), Some("bonjour"))]
    #[case::missing_falls_back_to_it(Some("de"), Some("ciao"))]
    #[case::none_falls_back_to_it(None, Some("ciao"))]
    fn test_resolve_with_it(#[case] lang: Option<&str>, #[case] expected: Option<&str>) {
        let d: Descriptions = [("en", "hello"), ("it", "ciao"), ("fr", "bonjour")].into_iter().collect();
        assert_eq!(d.resolve(lang), expected);
    }

    #[test]
    fn test_resolve_fallback_chain() {
        let d: Descriptions = [("en", "desc")].into_iter().collect();
        assert_eq!(d.resolve(Some("fr")), Some("desc"));

        let d: Descriptions = [("de", "hallo"), ("es", "hola")].into_iter().collect();
        assert_eq!(d.resolve(Some("fr")), Some("hallo"));

        assert_eq!(Descriptions::new().resolve(Some("it")), None);
    }

    #[test]
    fn test_catalog_order() {
        let store = CatalogStore::new([
            artwork("3", None),
            artwork("2", Some("Venere")),
            artwork("1", Some("Annunciazione")),
            artwork("0", None),
        ]);
        let ids: Vec<_> = store.all().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "0", "3"]);
        assert_eq!(store.get("2").and_then(|a| a.title.as_deref()), Some("Venere"));
        assert!(store.get("missing").is_none());
    }
}
