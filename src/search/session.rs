//! 检索会话 (Search Session)
//!
//! 同一检索的结果集只在第一页 (或检索条件变化时) 计算一次，翻页时按窗口切片复用。
//! 被取消的检索不会写入会话状态。

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::error::{GalleryError, Result};
use crate::core::event::{Events, SearchEvent};

use super::filters::SearchFilters;
use super::query::QueryComposer;

/// 一页检索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub ids: Vec<u32>,
    pub has_more: bool,
    pub total: usize,
}

/// 按固定窗口切片，页码从 1 开始
pub fn paginate(ids: &[u32], page: usize, page_size: usize) -> SearchPage {
    let total = ids.len();
    let start = page.saturating_sub(1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    SearchPage {
        ids: ids[start..end].to_vec(),
        has_more: end < total,
        total,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionKey {
    query: String,
    filters: SearchFilters,
    language: String,
}

/// 当前会话缓存的结果集
struct SearchResultSet {
    key: SessionKey,
    ids: Arc<Vec<u32>>,
}

pub struct SearchSession {
    composer: QueryComposer,
    page_size: usize,
    events: Events,
    current: Mutex<Option<SearchResultSet>>,
}

impl SearchSession {
    pub fn new(composer: QueryComposer, page_size: usize, events: Events) -> Self {
        Self {
            composer,
            page_size,
            events,
            current: Mutex::new(None),
        }
    }

    /// 执行分页检索
    pub async fn search(
        &self,
        query: &str,
        filters: &SearchFilters,
        language: &str,
        page: usize,
        cancel: &CancellationToken,
    ) -> Result<SearchPage> {
        let page = page.max(1);
        let key = SessionKey {
            query: query.trim().to_string(),
            filters: filters.clone(),
            language: language.to_string(),
        };

        let cached = {
            let current = self.current.lock().await;
            current
                .as_ref()
                .filter(|set| page > 1 && set.key == key)
                .map(|set| set.ids.clone())
        };

        let ids = match cached {
            Some(ids) => {
                debug!("复用检索结果集: page={} total={}", page, ids.len());
                ids
            }
            None => {
                self.events.emit(SearchEvent::SearchStarted {
                    query: key.query.clone(),
                });
                let composed = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(GalleryError::Cancelled),
                    res = self.composer.compose(&key.query, filters, language) => res?,
                };
                // 结果集只在未取消时落盘
                if cancel.is_cancelled() {
                    return Err(GalleryError::Cancelled);
                }
                let ids = Arc::new(composed.into_iter().collect::<Vec<_>>());
                *self.current.lock().await = Some(SearchResultSet {
                    key,
                    ids: ids.clone(),
                });
                ids
            }
        };

        Ok(paginate(&ids, page, self.page_size))
    }

    pub async fn cached_total(&self) -> Option<usize> {
        self.current.lock().await.as_ref().map(|set| set.ids.len())
    }
}
