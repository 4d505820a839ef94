//! 检索词解析 (Term Resolver)
//!
//! 将单个检索词映射为画廊 ID 集合：
//! - 列表路径：排序键与 `language:` 直接读取 nozomi 列表
//! - 哈希路径：摘要前缀键经搜索树定位倒排表

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::core::config::{AppConfig, TermRouting};
use crate::core::error::{GalleryError, Result};
use crate::core::event::{Events, SearchEvent};
use crate::index::postings::IdSet;
use crate::index::{FeedRef, GalleryIndex};

use super::filters::SortBy;
use super::term::{Namespace, Term, TermRewriter};

/// 检索词的解析路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Feed(FeedRef),
    Hashed(String),
}

/// 确定检索词的解析路径 (改写规则已应用)
pub fn route(term: &Term, language: &str, routing: TermRouting) -> Route {
    match &term.namespace {
        None => Route::Hashed(term.value.clone()),
        Some(Namespace::Language) => Route::Feed(FeedRef::new(None, "index", term.value.as_str())),
        Some(ns) => match routing {
            TermRouting::Hashed => Route::Hashed(term.query_text()),
            TermRouting::Feed => Route::Feed(FeedRef::new(Some(ns.as_str()), term.value.as_str(), language)),
        },
    }
}

pub struct TermResolver {
    index: Arc<GalleryIndex>,
    rewriter: TermRewriter,
    routing: TermRouting,
    events: Events,
}

impl TermResolver {
    pub fn new(index: Arc<GalleryIndex>, config: &AppConfig, events: Events) -> Self {
        Self {
            index,
            rewriter: TermRewriter::new(config.search.rewrites.clone()),
            routing: config.index.routing,
            events,
        }
    }

    /// 解析单个检索词，失败包装为 TermResolution
    pub async fn resolve(&self, term: &Term, language: &str) -> Result<IdSet> {
        let rewritten = self.rewriter.apply(term);
        let result = match route(&rewritten, language, self.routing) {
            Route::Feed(feed) => self.index.feed(&feed, None).await,
            Route::Hashed(text) => self.index.hashed(&text).await,
        };
        result.map_err(|e| GalleryError::for_term(term.query_text(), e.flatten()))
    }

    /// 并发解析多个检索词；单个失败降级为空集，不中断整体检索
    pub async fn resolve_all(&self, terms: &[Term], language: &str) -> Vec<IdSet> {
        let tasks = terms.iter().map(|term| async move {
            match self.resolve(term, language).await {
                Ok(ids) => {
                    debug!("检索词 {} 命中 {} 条", term, ids.len());
                    self.events.emit(SearchEvent::TermResolved {
                        term: term.to_string(),
                        count: ids.len(),
                    });
                    ids
                }
                Err(e) => {
                    warn!("检索词解析失败，按空集处理: {}", e);
                    self.events.emit(SearchEvent::TermFailed {
                        term: term.to_string(),
                        error: e.to_string(),
                    });
                    IdSet::new()
                }
            }
        });
        join_all(tasks).await
    }

    /// 读取排序种子列表，失败直接上抛
    pub async fn seed(&self, sort: SortBy, language: &str) -> Result<IdSet> {
        let (area, tag) = sort.feed_parts();
        let ids = self
            .index
            .feed(&FeedRef::new(area, tag, language), None)
            .await
            .map_err(GalleryError::flatten)?;
        self.events.emit(SearchEvent::SeedLoaded { count: ids.len() });
        Ok(ids)
    }
}
