//! 宿主扩展接口
//!
//! 宿主应用按自身节奏调用的固定契约：列表、检索、详情、章节与图片页。

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::model::{Chapter, EntriesPage, Entry, Page};
use crate::search::filters::SearchFilters;

#[async_trait]
pub trait Catalog: Send + Sync {
    /// 源唯一标识
    fn id(&self) -> &str;

    /// 当前检索语言
    fn language(&self) -> &str;

    /// 热门列表 (年度热度排序)
    async fn popular(&self, page: usize) -> Result<EntriesPage>;

    /// 最新上架列表
    async fn latest(&self, page: usize) -> Result<EntriesPage>;

    /// 组合检索；第一页计算完整结果集，后续页复用
    async fn search(&self, page: usize, query: &str, filters: &SearchFilters) -> Result<EntriesPage>;

    async fn details(&self, id: u32) -> Result<Entry>;

    async fn chapters(&self, id: u32) -> Result<Vec<Chapter>>;

    async fn pages(&self, id: u32) -> Result<Vec<Page>>;
}
