//! CDN 分片解析器
//!
//! 远端 `gg.js` 脚本给出默认子域偏移、按图像类别覆盖的偏移表与公共路径前缀。
//! 解析结果在新鲜期内缓存，刷新过程由互斥锁串行化。

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::config::AppConfig;
use crate::core::error::{GalleryError, Result};
use crate::core::event::{Events, SearchEvent};
use crate::interfaces::RangeSource;

static DEFAULT_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var o = (\d)").expect("valid regex"));
static CASE_OFFSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"o = (\d); break;").expect("valid regex"));
static CASE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"case (\d+):").expect("valid regex"));
static COMMON_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"b: '(.+)'").expect("valid regex"));

/// `gg.js` 解析结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShardConfig {
    pub default_offset: u32,
    pub offsets: HashMap<u32, u32>,
    pub common_id: String,
}

impl ShardConfig {
    /// 从脚本文本提取分片参数，任一模式缺失即失败
    pub fn parse(script: &str) -> Result<Self> {
        let default_offset = capture_u32(&DEFAULT_OFFSET, script, "default offset")?;
        let case_offset = capture_u32(&CASE_OFFSET, script, "case offset")?;

        let offsets = CASE_LABEL
            .captures_iter(script)
            .filter_map(|c| c[1].parse::<u32>().ok())
            .map(|case| (case, case_offset))
            .collect();

        let common_id = COMMON_ID
            .captures(script)
            .map(|c| c[1].to_string())
            .ok_or_else(|| GalleryError::ShardConfig("common image id not found".into()))?;

        Ok(Self {
            default_offset,
            offsets,
            common_id,
        })
    }

    pub fn offset_for(&self, image_id: u32) -> u32 {
        self.offsets.get(&image_id).copied().unwrap_or(self.default_offset)
    }
}

fn capture_u32(re: &Regex, script: &str, what: &str) -> Result<u32> {
    re.captures(script)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| GalleryError::ShardConfig(format!("{} not found", what)))
}

/// 图像类别：哈希末 3 位按 (第 3, 第 1, 第 2) 重排后按十六进制解析
pub fn image_id_from_hash(hash: &str) -> Result<u32> {
    let (head, tail) = split_tail(hash)?;
    u32::from_str_radix(&format!("{}{}", tail, head), 16)
        .map_err(|e| GalleryError::Parse(format!("image hash `{}`: {}", hash, e)))
}

/// 缩略图目录 (`{末位}/{倒数第 3~2 位}`)
pub fn thumb_path_from_hash(hash: &str) -> Result<String> {
    let (head, tail) = split_tail(hash)?;
    Ok(format!("{}/{}", tail, head))
}

fn split_tail(hash: &str) -> Result<(&str, &str)> {
    let n = hash.len();
    if n < 3 || !hash.is_char_boundary(n - 3) {
        return Err(GalleryError::Parse(format!("image hash `{}` too short", hash)));
    }
    Ok((&hash[n - 3..n - 1], &hash[n - 1..]))
}

/// 子域前缀字母：偏移 0 → `a`，1 → `b` ...
fn subdomain_letter(offset: u32) -> char {
    char::from_u32('a' as u32 + offset).unwrap_or('a')
}

struct CachedShard {
    config: Arc<ShardConfig>,
    fetched_at: Instant,
}

pub struct ShardResolver {
    source: Arc<dyn RangeSource>,
    ltn: String,
    domain: String,
    freshness: Duration,
    events: Events,
    state: Mutex<Option<CachedShard>>,
}

impl ShardResolver {
    pub fn new(source: Arc<dyn RangeSource>, config: &AppConfig, events: Events) -> Self {
        Self {
            source,
            ltn: config.ltn_url(),
            domain: config.domain.clone(),
            freshness: config.shard_freshness(),
            events,
            state: Mutex::new(None),
        }
    }

    /// 返回当前有效配置；缓存缺失或过期时在锁内重新拉取
    pub async fn refresh_if_stale(&self) -> Result<Arc<ShardConfig>> {
        let mut state = self.state.lock().await;

        if let Some(cached) = state.as_ref() {
            if cached.fetched_at.elapsed() <= self.freshness {
                return Ok(cached.config.clone());
            }
            debug!("分片配置已过期，重新拉取");
        }

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let url = format!("{}/gg.js?_={}", self.ltn, millis);
        let script = self.source.fetch_text(&url).await.map_err(GalleryError::flatten)?;

        let config = Arc::new(ShardConfig::parse(&script)?);
        info!(
            "分片配置已刷新: default={} cases={}",
            config.default_offset,
            config.offsets.len()
        );
        self.events.emit(SearchEvent::ShardConfigRefreshed {
            cases: config.offsets.len(),
        });

        *state = Some(CachedShard {
            config: config.clone(),
            fetched_at: Instant::now(),
        });
        Ok(config)
    }

    pub async fn subdomain_offset(&self, image_id: u32) -> Result<u32> {
        Ok(self.refresh_if_stale().await?.offset_for(image_id))
    }

    pub async fn common_image_id(&self) -> Result<String> {
        Ok(self.refresh_if_stale().await?.common_id.clone())
    }

    /// 缩略图地址
    pub async fn thumbnail_url(&self, hash: &str) -> Result<String> {
        let offset = self.subdomain_offset(image_id_from_hash(hash)?).await?;
        Ok(format!(
            "https://{}tn.{}/webpbigtn/{}/{}.webp",
            subdomain_letter(offset),
            self.domain,
            thumb_path_from_hash(hash)?,
            hash
        ))
    }

    /// 原图地址
    pub async fn image_url(&self, hash: &str) -> Result<String> {
        let image_id = image_id_from_hash(hash)?;
        let config = self.refresh_if_stale().await?;
        Ok(format!(
            "https://{}a.{}/webp/{}{}/{}.webp",
            subdomain_letter(config.offset_for(image_id)),
            self.domain,
            config.common_id,
            image_id,
            hash
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySource;
    use reqwest::StatusCode;

    const GG: &str = "https://ltn.hitomi.la/gg.js";

    const SCRIPT: &str = r#"
'use strict';
gg = {
m: function(g) {
var o = 0;
switch (g) {
case 3000:
case 2650:
case 17:
o = 1; break;
}
return o;
},
s: function(h) { var m = /(..)(.)$/.exec(h); return parseInt(m[2]+m[1], 16).toString(10); },
b: '1712345678/'
};
"#;

    fn resolver(freshness_secs: u64) -> (Arc<MemorySource>, ShardResolver) {
        let source = Arc::new(MemorySource::new());
        source.insert(GG, SCRIPT);
        let mut config = AppConfig::default();
        config.cdn.freshness_secs = freshness_secs;
        let resolver = ShardResolver::new(source.clone(), &config, Events::default());
        (source, resolver)
    }

    #[test]
    fn parses_gg_script() {
        let config = ShardConfig::parse(SCRIPT).unwrap();
        assert_eq!(config.default_offset, 0);
        assert_eq!(config.offsets.len(), 3);
        assert_eq!(config.offset_for(2650), 1);
        assert_eq!(config.offset_for(1), 0);
        assert_eq!(config.common_id, "1712345678/");
    }

    #[test]
    fn missing_pattern_is_shard_config_error() {
        let err = ShardConfig::parse("gg = {}").unwrap_err();
        assert!(matches!(err, GalleryError::ShardConfig(_)));

        let no_common = SCRIPT.replace("b: '1712345678/'", "");
        assert!(matches!(
            ShardConfig::parse(&no_common),
            Err(GalleryError::ShardConfig(_))
        ));
    }

    #[test]
    fn image_class_reorders_last_three_chars() {
        assert_eq!(image_id_from_hash("0123456789abc").unwrap(), 0xcab);
        assert_eq!(image_id_from_hash("fff").unwrap(), 0xfff);
        assert_eq!(thumb_path_from_hash("0123456789abc").unwrap(), "c/ab");
        assert!(image_id_from_hash("ab").is_err());
        assert!(image_id_from_hash("xyz").is_err());
    }

    #[tokio::test]
    async fn second_lookup_within_window_hits_cache() {
        let (source, resolver) = resolver(60);
        assert_eq!(resolver.subdomain_offset(17).await.unwrap(), 1);
        assert_eq!(resolver.subdomain_offset(18).await.unwrap(), 0);
        assert_eq!(resolver.common_image_id().await.unwrap(), "1712345678/");
        assert_eq!(source.hits(GG), 1);
    }

    #[tokio::test]
    async fn stale_config_is_refetched() {
        let (source, resolver) = resolver(0);
        resolver.subdomain_offset(17).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        resolver.subdomain_offset(17).await.unwrap();
        assert_eq!(source.hits(GG), 2);
    }

    #[tokio::test]
    async fn concurrent_lookups_refresh_once() {
        let (source, resolver) = resolver(60);
        let ids = [17u32, 18, 2650, 3000, 5];
        let offsets = futures::future::join_all(ids.iter().map(|id| resolver.subdomain_offset(*id))).await;
        assert!(offsets.iter().all(|o| o.is_ok()));
        assert_eq!(source.hits(GG), 1);
    }

    #[tokio::test]
    async fn builds_cdn_urls() {
        let (_, resolver) = resolver(60);
        // 0x011 = 17 → 偏移 1 → `b`
        let hash = "deadbeef110";
        assert_eq!(image_id_from_hash(hash).unwrap(), 0x011);
        assert_eq!(
            resolver.thumbnail_url(hash).await.unwrap(),
            "https://btn.hitomi.la/webpbigtn/0/11/deadbeef110.webp"
        );
        assert_eq!(
            resolver.image_url(hash).await.unwrap(),
            "https://ba.hitomi.la/webp/1712345678/17/deadbeef110.webp"
        );
    }

    #[tokio::test]
    async fn unreachable_script_propagates() {
        let (source, resolver) = resolver(60);
        source.fail(GG, StatusCode::SERVICE_UNAVAILABLE);
        let err = resolver.common_image_id().await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }
}
