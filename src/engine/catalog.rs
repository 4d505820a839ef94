//! 画廊目录 (Gallery Catalog)
//!
//! 宿主契约的实现：列表分页、组合检索与详情并发拉取。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::config::AppConfig;
use crate::core::error::Result;
use crate::core::event::{Events, SearchEvent};
use crate::core::model::{Chapter, EntriesPage, Entry, Page};
use crate::index::{FeedRef, GalleryIndex};
use crate::interfaces::{Catalog, RangeSource};
use crate::search::filters::SearchFilters;
use crate::search::{QueryComposer, SearchSession, TermResolver};
use crate::shard::ShardResolver;

use super::gallery::GalleryClient;

pub struct GalleryCatalog {
    id: String,
    config: Arc<AppConfig>,
    index: Arc<GalleryIndex>,
    gallery: Arc<GalleryClient>,
    session: SearchSession,
    events: Events,
    cancel: CancellationToken,
}

impl GalleryCatalog {
    pub fn new(
        source: Arc<dyn RangeSource>,
        config: Arc<AppConfig>,
        events: Events,
        cancel: CancellationToken,
    ) -> Self {
        let index = Arc::new(GalleryIndex::new(source.clone(), &config));
        let shard = Arc::new(ShardResolver::new(source.clone(), &config, events.clone()));
        let gallery = Arc::new(GalleryClient::new(source, shard, &config));

        let resolver = Arc::new(TermResolver::new(index.clone(), &config, events.clone()));
        let session = SearchSession::new(
            QueryComposer::new(resolver, events.clone()),
            config.search.page_size,
            events.clone(),
        );

        Self {
            id: format!("hitomi-{}", config.language),
            config,
            index,
            gallery,
            session,
            events,
            cancel,
        }
    }

    /// 读取一页排序列表；实际条目数达到阈值即认为还有下一页
    async fn listing(&self, feed: FeedRef, page: usize) -> Result<EntriesPage> {
        let ids = self
            .index
            .feed_page(&feed, page, self.config.search.listing_page_size)
            .await?;
        let entries = self.fetch_entries(ids.into_iter().collect()).await;
        let has_more = entries.len() >= self.config.search.listing_min_full;

        Ok(EntriesPage { entries, has_more })
    }

    /// 并发拉取条目详情，保持输入顺序，失败的条目被跳过
    pub async fn fetch_entries(&self, ids: Vec<u32>) -> Vec<Entry> {
        let total = ids.len();
        if total == 0 {
            return Vec::new();
        }
        self.events.emit(SearchEvent::EntriesRequested { total });

        let permits = Arc::new(Semaphore::new(self.config.search.detail_concurrency.max(1)));
        let mut join_set = JoinSet::new();

        for (slot, id) in ids.into_iter().enumerate() {
            let gallery = self.gallery.clone();
            let permits = permits.clone();
            join_set.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (slot, id, gallery.entry(id).await)
            });
        }

        let mut slots: Vec<Option<Entry>> = vec![None; total];
        let mut done = 0;

        while let Some(res) = join_set.join_next().await {
            match res {
                Ok((slot, _, Ok(entry))) => {
                    done += 1;
                    self.events.emit(SearchEvent::EntryFetched {
                        current: done,
                        total,
                        title: entry.title.clone(),
                    });
                    slots[slot] = Some(entry);
                }
                Ok((_, id, Err(e))) => {
                    warn!("画廊 {} 详情获取失败，已跳过: {}", id, e);
                    self.events.emit(SearchEvent::EntrySkipped {
                        id,
                        error: e.to_string(),
                    });
                }
                Err(e) => error!("并发调度错误: {}", e),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

#[async_trait]
impl Catalog for GalleryCatalog {
    fn id(&self) -> &str {
        &self.id
    }

    fn language(&self) -> &str {
        &self.config.language
    }

    async fn popular(&self, page: usize) -> Result<EntriesPage> {
        self.listing(FeedRef::new(Some("popular"), "year", self.language()), page)
            .await
    }

    async fn latest(&self, page: usize) -> Result<EntriesPage> {
        self.listing(FeedRef::new(None, "index", self.language()), page)
            .await
    }

    async fn search(&self, page: usize, query: &str, filters: &SearchFilters) -> Result<EntriesPage> {
        let result = self
            .session
            .search(query, filters, self.language(), page, &self.cancel)
            .await;

        let window = match result {
            Ok(window) => window,
            Err(e) => {
                self.events.emit(SearchEvent::SearchFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        info!(
            "检索结果: 第 {} 页 {} 条 / 共 {} 条",
            page,
            window.ids.len(),
            window.total
        );
        let entries = self.fetch_entries(window.ids).await;
        self.events.emit(SearchEvent::SearchCompleted {
            returned: entries.len(),
            has_more: window.has_more,
        });

        Ok(EntriesPage {
            entries,
            has_more: window.has_more,
        })
    }

    async fn details(&self, id: u32) -> Result<Entry> {
        self.gallery.entry(id).await
    }

    async fn chapters(&self, id: u32) -> Result<Vec<Chapter>> {
        let gallery = self.gallery.fetch(id).await?;
        Ok(self.gallery.chapters(&gallery))
    }

    async fn pages(&self, id: u32) -> Result<Vec<Page>> {
        let gallery = self.gallery.fetch(id).await?;
        self.gallery.pages(&gallery).await
    }
}
