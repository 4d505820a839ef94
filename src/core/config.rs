//! 配置管理系统 (Configuration Management)
//!
//! 负责 `config.toml` 的反序列化及其层级结构映射，支持环境变量 (`GALLERY__*`，如 `GALLERY__SEARCH__PAGE_SIZE`) 覆盖与默认值回退机制。

use std::path::Path;
use std::time::Duration;

use bon::Builder;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::core::error::{GalleryError, Result};

/// 全局应用配置
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct AppConfig {
    /// 站点主域名，派生 `ltn.` 索引域与 CDN 子域
    #[serde(default = "default_domain")]
    #[builder(default = default_domain())]
    pub domain: String,

    /// 默认检索语言 (`all` 表示不限)
    #[serde(default = "default_language")]
    #[builder(default = default_language())]
    pub language: String,

    /// 性别标签以图标 (♀/♂) 而非文字显示
    #[serde(default)]
    #[builder(default)]
    pub gender_icons: bool,

    #[serde(default)]
    #[builder(default)]
    pub http: HttpConfig,

    #[serde(default)]
    #[builder(default)]
    pub index: IndexConfig,

    #[serde(default)]
    #[builder(default)]
    pub search: SearchConfig,

    #[serde(default)]
    #[builder(default)]
    pub cdn: CdnConfig,
}

/// HTTP 传输层参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_pool_idle")]
    pub pool_max_idle_per_host: usize,
    /// 显式代理地址；未设置时不读取系统代理环境变量
    #[serde(default)]
    pub proxy: Option<String>,
}

/// 检索词路由方式
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TermRouting {
    /// 命名空间检索词同样走哈希树查找
    #[default]
    Hashed,
    /// 命名空间检索词直接读取其独立的 nozomi 列表
    Feed,
}

/// 远程索引文件参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct IndexConfig {
    /// 单次节点读取的固定块大小
    #[serde(default = "default_node_size")]
    pub node_size: u64,
    #[serde(default)]
    pub root_address: u64,
    #[serde(default = "default_max_posting_bytes")]
    pub max_posting_bytes: u32,
    #[serde(default = "default_max_posting_count")]
    pub max_posting_count: u32,
    #[serde(default)]
    pub routing: TermRouting,
}

/// 检索词改写规则
///
/// 例如 `female:x` 改写为 `tag:female:x`。
#[derive(Debug, Deserialize, Builder, Clone, PartialEq, Eq)]
pub struct TermRewrite {
    /// 触发改写的命名空间
    pub namespace: String,
    /// 改写后的命名空间
    pub target: String,
    /// 是否将原命名空间保留在值中
    #[serde(default = "default_true")]
    pub keep_prefix: bool,
}

/// 检索组合与分页参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_page_size")]
    pub listing_page_size: usize,
    /// 列表页实际条目数达到该阈值即视为还有下一页
    #[serde(default = "default_listing_min_full")]
    pub listing_min_full: usize,
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    #[serde(default = "default_rewrites")]
    pub rewrites: Vec<TermRewrite>,
}

/// CDN 分片配置缓存参数
#[derive(Debug, Deserialize, Builder, Clone)]
pub struct CdnConfig {
    #[serde(default = "default_freshness")]
    pub freshness_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            pool_max_idle_per_host: default_pool_idle(),
            proxy: None,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            node_size: default_node_size(),
            root_address: 0,
            max_posting_bytes: default_max_posting_bytes(),
            max_posting_count: default_max_posting_count(),
            routing: TermRouting::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            listing_page_size: default_page_size(),
            listing_min_full: default_listing_min_full(),
            detail_concurrency: default_detail_concurrency(),
            rewrites: default_rewrites(),
        }
    }
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            freshness_secs: default_freshness(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig::builder().build()
    }
}

fn default_domain() -> String {
    "hitomi.la".to_string()
}
fn default_language() -> String {
    "all".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_timeout() -> u64 {
    30
}
fn default_pool_idle() -> usize {
    32
}
fn default_node_size() -> u64 {
    464
}
fn default_max_posting_bytes() -> u32 {
    100_000_000
}
fn default_max_posting_count() -> u32 {
    10_000_000
}
fn default_page_size() -> usize {
    25
}
fn default_listing_min_full() -> usize {
    24
}
fn default_detail_concurrency() -> usize {
    8
}
fn default_freshness() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_rewrites() -> Vec<TermRewrite> {
    ["female", "male"]
        .into_iter()
        .map(|ns| TermRewrite {
            namespace: ns.to_string(),
            target: "tag".to_string(),
            keep_prefix: true,
        })
        .collect()
}

impl AppConfig {
    /// 从文件系统与环境变量中加载并解析配置
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let builder = Config::builder();

        let builder = if config_path.exists() {
            builder.add_source(File::from(config_path))
        } else {
            builder
        };

        let settings = builder
            .add_source(Environment::with_prefix("GALLERY").separator("__"))
            .build()
            .map_err(GalleryError::Config)?;
        settings.try_deserialize().map_err(GalleryError::Config)
    }

    /// 站点根地址
    pub fn base_url(&self) -> String {
        format!("https://{}", self.domain)
    }

    /// 索引与元数据所在的 `ltn.` 子域
    pub fn ltn_url(&self) -> String {
        format!("https://ltn.{}", self.domain)
    }

    pub fn shard_freshness(&self) -> Duration {
        Duration::from_secs(self.cdn.freshness_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_remote_layout() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.ltn_url(), "https://ltn.hitomi.la");
        assert_eq!(cfg.index.node_size, 464);
        assert_eq!(cfg.search.page_size, 25);
        assert_eq!(cfg.search.listing_min_full, 24);
        assert_eq!(cfg.shard_freshness(), Duration::from_secs(60));
        assert_eq!(cfg.index.routing, TermRouting::Hashed);
        assert_eq!(cfg.search.rewrites.len(), 2);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AppConfig::load_from(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(cfg.language, "all");
        assert_eq!(cfg.http.timeout_secs, 30);
    }
}
