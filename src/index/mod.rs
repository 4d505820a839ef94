//! 远程画廊索引 (Remote Gallery Index)
//!
//! 聚合索引文件版本、哈希树查找、倒排表读取与 nozomi 列表读取。
//! 所有访问都经由 `RangeSource` 的范围读取完成，不做本地持久化。

pub mod node;
pub mod postings;
pub mod tree;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::core::config::{AppConfig, IndexConfig};
use crate::core::error::{GalleryError, Result};
use crate::interfaces::{ByteRange, RangeSource};

use self::node::PostingPointer;
use self::postings::{IdSet, PostingListReader, decode_feed};
use self::tree::TreeSearcher;

/// 路径段转义集合，保留 `:` 等在路径中合法的字符
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 哈希键长度
pub const HASH_KEY_LEN: usize = 4;

/// 检索词的哈希键：SHA-256 摘要前 4 字节
pub fn hash_term(term: &str) -> [u8; HASH_KEY_LEN] {
    let digest = Sha256::digest(term.as_bytes());
    let mut key = [0u8; HASH_KEY_LEN];
    key.copy_from_slice(&digest[..HASH_KEY_LEN]);
    key
}

/// nozomi 列表定位 (`{area}/{tag}-{language}.nozomi`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedRef {
    pub area: Option<String>,
    pub tag: String,
    pub language: String,
}

impl FeedRef {
    pub fn new(area: Option<&str>, tag: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            area: area.map(str::to_string),
            tag: tag.into(),
            language: language.into(),
        }
    }

    pub fn url(&self, ltn: &str) -> String {
        let file = format!("{}-{}.nozomi", self.tag, self.language);
        let file = utf8_percent_encode(&file, PATH_SEGMENT);
        match &self.area {
            None => format!("{}/{}", ltn, file),
            Some(area) => format!("{}/{}/{}", ltn, utf8_percent_encode(area, PATH_SEGMENT), file),
        }
    }
}

/// 分页读取列表时的字节范围：每页 `page_size` 个 4 字节 ID
pub fn page_range(page: usize, page_size: usize) -> Option<ByteRange> {
    let first = page.checked_sub(1)?.checked_mul(page_size)?;
    ByteRange::with_len(first as u64 * 4, page_size as u64 * 4)
}

pub struct GalleryIndex {
    source: Arc<dyn RangeSource>,
    ltn: String,
    settings: IndexConfig,
    version: OnceCell<String>,
}

impl GalleryIndex {
    pub fn new(source: Arc<dyn RangeSource>, config: &AppConfig) -> Self {
        Self {
            source,
            ltn: config.ltn_url(),
            settings: config.index.clone(),
            version: OnceCell::new(),
        }
    }

    /// 索引版本令牌，首次使用时拉取并在实例生命周期内复用
    pub async fn version(&self) -> Result<&str> {
        let version = self
            .version
            .get_or_try_init(|| async {
                let millis = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or_default();
                let url = format!("{}/galleriesindex/version?_={}", self.ltn, millis);
                let text = self.source.fetch_text(&url).await?;
                let version = text.trim().to_string();
                if version.is_empty() {
                    return Err(GalleryError::Parse("Empty galleries index version".into()));
                }
                info!("画廊索引版本: {}", version);
                Ok(version)
            })
            .await?;
        Ok(version.as_str())
    }

    async fn file_url(&self, ext: &str) -> Result<String> {
        let version = self.version().await?;
        Ok(format!("{}/galleriesindex/galleries.{}.{}", self.ltn, version, ext))
    }

    /// 哈希树查找
    pub async fn lookup(&self, key: &[u8]) -> Result<Option<PostingPointer>> {
        let url = self.file_url("index").await?;
        TreeSearcher::new(self.source.as_ref(), &url, self.settings.node_size)
            .search(key, self.settings.root_address)
            .await
    }

    /// 按指针读取倒排表
    pub async fn postings(&self, pointer: PostingPointer) -> Result<IdSet> {
        let url = self.file_url("data").await?;
        PostingListReader::new(
            self.source.as_ref(),
            &url,
            self.settings.max_posting_bytes,
            self.settings.max_posting_count,
        )
        .read(pointer)
        .await
    }

    /// 哈希检索：未命中返回空集
    pub async fn hashed(&self, term: &str) -> Result<IdSet> {
        let key = hash_term(term);
        match self.lookup(&key).await? {
            Some(pointer) => self.postings(pointer).await,
            None => {
                debug!("索引未命中: {}", term);
                Ok(IdSet::new())
            }
        }
    }

    /// 读取 nozomi 列表 (可选范围)
    pub async fn feed(&self, feed: &FeedRef, range: Option<ByteRange>) -> Result<IdSet> {
        let url = feed.url(&self.ltn);
        debug!("读取列表: {} {:?}", url, range.map(|r| r.header_value()));
        let bytes = self.source.fetch(&url, range).await?;
        decode_feed(&bytes)
    }

    /// 分页读取 nozomi 列表；越过文件末尾视为空页
    pub async fn feed_page(&self, feed: &FeedRef, page: usize, page_size: usize) -> Result<IdSet> {
        let Some(range) = page_range(page, page_size) else {
            return Ok(IdSet::new());
        };
        match self.feed(feed, Some(range)).await {
            Err(e) if e.is_range_not_satisfiable() => Ok(IdSet::new()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::node::{CHILD_COUNT, IndexNode};
    use crate::testing::{MemorySource, TreeBuilder, id_feed};

    #[test]
    fn term_hash_is_sha256_prefix() {
        // sha256("") = e3b0c442...
        assert_eq!(hash_term(""), [0xe3, 0xb0, 0xc4, 0x42]);
        // sha256("abc") = ba7816bf...
        assert_eq!(hash_term("abc"), [0xba, 0x78, 0x16, 0xbf]);
    }

    #[test]
    fn feed_urls_follow_area_layout() {
        let ltn = "https://ltn.hitomi.la";
        assert_eq!(
            FeedRef::new(None, "index", "all").url(ltn),
            "https://ltn.hitomi.la/index-all.nozomi"
        );
        assert_eq!(
            FeedRef::new(Some("popular"), "year", "english").url(ltn),
            "https://ltn.hitomi.la/popular/year-english.nozomi"
        );
        assert_eq!(
            FeedRef::new(Some("tag"), "female:big breasts", "all").url(ltn),
            "https://ltn.hitomi.la/tag/female:big%20breasts-all.nozomi"
        );
    }

    #[test]
    fn page_range_covers_one_page_of_ids() {
        assert_eq!(page_range(1, 25), ByteRange::with_len(0, 100));
        assert_eq!(page_range(3, 25), ByteRange::with_len(200, 100));
        assert_eq!(page_range(0, 25), None);
    }

    fn fixture() -> (Arc<MemorySource>, GalleryIndex) {
        let source = Arc::new(MemorySource::new());
        source.insert("https://ltn.hitomi.la/galleriesindex/version", "42\n");

        let mut b = TreeBuilder::new(464);
        let ptr = b.posting(&[5, 6, 7]);
        b.place(
            0,
            &IndexNode {
                keys: vec![hash_term("cat").to_vec()],
                postings: vec![ptr],
                children: [0; CHILD_COUNT],
            },
        );
        source.insert("https://ltn.hitomi.la/galleriesindex/galleries.42.index", b.index);
        source.insert("https://ltn.hitomi.la/galleriesindex/galleries.42.data", b.data);

        let index = GalleryIndex::new(source.clone(), &AppConfig::default());
        (source, index)
    }

    #[tokio::test]
    async fn version_is_fetched_once() {
        let (source, index) = fixture();
        assert_eq!(index.version().await.unwrap(), "42");
        index.hashed("cat").await.unwrap();
        index.hashed("dog").await.unwrap();
        assert_eq!(source.hits("https://ltn.hitomi.la/galleriesindex/version"), 1);
    }

    #[tokio::test]
    async fn hashed_lookup_reads_postings_or_returns_empty() {
        let (_, index) = fixture();
        let hit = index.hashed("cat").await.unwrap();
        assert_eq!(hit.into_iter().collect::<Vec<_>>(), vec![5, 6, 7]);
        assert!(index.hashed("dog").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn feed_page_past_end_is_empty() {
        let (source, index) = fixture();
        let ids: Vec<u32> = (1..=30).collect();
        source.insert("https://ltn.hitomi.la/index-all.nozomi", id_feed(&ids));
        let feed = FeedRef::new(None, "index", "all");

        let first = index.feed_page(&feed, 1, 25).await.unwrap();
        assert_eq!(first.len(), 25);
        let second = index.feed_page(&feed, 2, 25).await.unwrap();
        assert_eq!(second.into_iter().collect::<Vec<_>>(), vec![26, 27, 28, 29, 30]);
        assert!(index.feed_page(&feed, 3, 25).await.unwrap().is_empty());
    }
}
