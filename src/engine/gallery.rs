//! 画廊详情 (Gallery Details)
//!
//! 读取 `galleries/{id}.js`，映射为条目、章节与图片页。

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::core::config::AppConfig;
use crate::core::error::{GalleryError, Result};
use crate::core::model::{Chapter, Entry, EntryStatus, Gallery, Page, title_case};
use crate::interfaces::RangeSource;
use crate::shard::ShardResolver;

const SCRIPT_PREFIX: &str = "var galleryinfo = ";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 解析详情脚本中的 JSON 部分
pub fn parse_gallery_script(script: &str) -> Result<Gallery> {
    let json = match script.find(SCRIPT_PREFIX) {
        Some(pos) => &script[pos + SCRIPT_PREFIX.len()..],
        None => script,
    };
    let json = json.trim().trim_end_matches(';');
    Ok(serde_json::from_str(json)?)
}

/// 上传时间 (Unix 毫秒)；末尾的时区段被忽略，无法解析时为 0
pub fn parse_upload_date(date: &str) -> i64 {
    let date = date.trim();
    let stripped = date.rsplit_once('-').map(|(head, _)| head).unwrap_or(date);

    [date, stripped]
        .into_iter()
        .find_map(|s| NaiveDateTime::parse_from_str(s, DATE_FORMAT).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

fn join_names<T>(items: &Option<Vec<T>>, name: impl Fn(&T) -> &str) -> Option<String> {
    items
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| v.iter().map(|i| title_case(name(i))).collect::<Vec<_>>().join(", "))
}

pub struct GalleryClient {
    source: Arc<dyn RangeSource>,
    shard: Arc<ShardResolver>,
    ltn: String,
    base_url: String,
    iconified: bool,
}

impl GalleryClient {
    pub fn new(source: Arc<dyn RangeSource>, shard: Arc<ShardResolver>, config: &AppConfig) -> Self {
        Self {
            source,
            shard,
            ltn: config.ltn_url(),
            base_url: config.base_url(),
            iconified: config.gender_icons,
        }
    }

    /// 拉取并解析画廊元数据
    pub async fn fetch(&self, id: u32) -> Result<Gallery> {
        let url = format!("{}/galleries/{}.js", self.ltn, id);
        debug!("读取画廊详情: {}", url);
        let script = self.source.fetch_text(&url).await.map_err(GalleryError::flatten)?;
        parse_gallery_script(&script)
    }

    /// 映射为宿主条目；封面取首个文件
    pub async fn to_entry(&self, gallery: &Gallery) -> Result<Entry> {
        let thumbnail_url = match gallery.files.first() {
            Some(file) => Some(self.shard.thumbnail_url(&file.hash).await?),
            None => None,
        };

        let mut description = String::new();
        if let Some(series) = join_names(&gallery.parodys, |p| p.parody.as_str()) {
            description.push_str(&format!("Series: {}\n", series));
        }
        if let Some(characters) = join_names(&gallery.characters, |c| c.character.as_str()) {
            description.push_str(&format!("Characters: {}\n\n", characters));
        }
        description.push_str(&format!("Type: {}\n", gallery.kind));
        description.push_str(&format!("Pages: {}\n", gallery.files.len()));
        description.push_str(&format!(
            "Language: {}",
            gallery.language.as_deref().unwrap_or("N/A")
        ));

        let genre = gallery
            .tags
            .as_ref()
            .filter(|t| !t.is_empty())
            .map(|tags| {
                tags.iter()
                    .map(|t| t.formatted(self.iconified))
                    .collect::<Vec<_>>()
                    .join(", ")
            });

        Ok(Entry {
            id: gallery.id,
            title: gallery.title.clone(),
            url: gallery.galleryurl.clone(),
            author: join_names(&gallery.groups, |g| g.group.as_str()),
            artist: join_names(&gallery.artists, |a| a.artist.as_str()),
            genre,
            thumbnail_url,
            description,
            status: EntryStatus::Completed,
        })
    }

    pub async fn entry(&self, id: u32) -> Result<Entry> {
        let gallery = self.fetch(id).await?;
        self.to_entry(&gallery).await
    }

    /// 画廊只有单一章节，汉化组位置显示画廊类型
    pub fn chapters(&self, gallery: &Gallery) -> Vec<Chapter> {
        vec![Chapter {
            name: "Chapter".to_string(),
            url: gallery.galleryurl.clone(),
            scanlator: Some(gallery.kind.clone()),
            date_upload: parse_upload_date(&gallery.date),
        }]
    }

    /// 每个文件一页，阅读页作为图片 Referer
    pub async fn pages(&self, gallery: &Gallery) -> Result<Vec<Page>> {
        let reader = format!("{}/reader/{}.html", self.base_url, gallery.id);
        let mut pages = Vec::with_capacity(gallery.files.len());
        for (index, file) in gallery.files.iter().enumerate() {
            pages.push(Page {
                index,
                url: reader.clone(),
                image_url: self.shard.image_url(&file.hash).await?,
            });
        }
        Ok(pages)
    }
}
