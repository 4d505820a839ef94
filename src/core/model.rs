use serde::{Deserialize, Deserializer, Serialize};

/// 画廊元数据 (`galleries/{id}.js` 中的 `galleryinfo`)
#[derive(Debug, Clone, Deserialize)]
pub struct Gallery {
    #[serde(deserialize_with = "lenient_u32")]
    pub id: u32,
    pub title: String,
    pub galleryurl: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub language: Option<String>,
    pub date: String,
    pub files: Vec<GalleryFile>,
    #[serde(default)]
    pub tags: Option<Vec<GalleryTag>>,
    #[serde(default)]
    pub artists: Option<Vec<Artist>>,
    #[serde(default)]
    pub groups: Option<Vec<Group>>,
    #[serde(default)]
    pub parodys: Option<Vec<Parody>>,
    #[serde(default)]
    pub characters: Option<Vec<Character>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryFile {
    pub hash: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GalleryTag {
    pub tag: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub female: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub male: bool,
}

impl GalleryTag {
    pub fn formatted(&self, iconified: bool) -> String {
        match (self.female, self.male, iconified) {
            (true, _, true) => format!("♀ {}", self.tag),
            (true, _, false) => format!("{} (female)", self.tag),
            (false, true, true) => format!("♂ {}", self.tag),
            (false, true, false) => format!("{} (male)", self.tag),
            _ => self.tag.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    pub artist: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub group: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parody {
    pub parody: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Character {
    pub character: String,
}

/// 名称统一做词首大写处理
pub fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 宿主应用可展示的条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub id: u32,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub description: String,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Ongoing,
    Completed,
}

/// 一页条目
#[derive(Debug, Clone, Serialize)]
pub struct EntriesPage {
    pub entries: Vec<Entry>,
    pub has_more: bool,
}

/// 章节信息 (画廊只有单一章节)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanlator: Option<String>,
    /// Unix 毫秒时间戳，解析失败为 0
    pub date_upload: i64,
}

/// 单张图片
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    pub index: usize,
    /// 阅读页地址，作为图片请求的 Referer
    pub url: String,
    pub image_url: String,
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        serde_json::Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    })
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id: {}", n))),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {}", s))),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}
