//! 检索组合器 (Query Composer)
//!
//! 自由文本 + 结构化过滤器 → 正/负检索词 → 并发解析 → 交集 / 差集 → 可选随机排序。

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::core::error::Result;
use crate::core::event::{Events, SearchEvent};
use crate::index::postings::IdSet;

use super::filters::{SearchFilters, SortBy};
use super::resolver::TermResolver;
use super::term::Term;

/// 解析后的检索请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub positive: Vec<Term>,
    pub negative: Vec<Term>,
    pub sort: SortBy,
    /// 过滤器组合必然无结果 (所有类型被禁用)
    pub matches_nothing: bool,
}

/// 拆分检索文本并合并过滤器产生的检索词
pub fn parse_query(text: &str, filters: &SearchFilters) -> ParsedQuery {
    let text = text.trim();
    let text = text.strip_prefix('?').unwrap_or(text);

    let mut terms: Vec<Term> = text.split_whitespace().filter_map(Term::parse).collect();

    let type_terms = filters.types.terms();
    let matches_nothing = type_terms.is_none();
    terms.extend(type_terms.unwrap_or_default());
    terms.extend(filters.text.iter().flat_map(|f| f.terms()));

    let (negative, positive): (Vec<_>, Vec<_>) = terms.into_iter().partition(Term::is_negative);

    ParsedQuery {
        positive,
        negative,
        sort: filters.sort,
        matches_nothing,
    }
}

/// 集合组合：种子或首个正向集合作为起点，其余正向集合取交集，负向集合取差集
pub fn combine(seed: Option<IdSet>, positive: Vec<IdSet>, negative: Vec<IdSet>) -> IdSet {
    let mut sets = positive.into_iter();
    let mut result = match seed {
        Some(seed) => seed,
        None => sets.next().unwrap_or_default(),
    };

    for set in sets {
        result.retain(|id| set.contains(id));
    }

    for set in &negative {
        result.retain(|id| !set.contains(id));
    }

    result
}

/// Fisher–Yates 原地洗牌
pub fn shuffle(ids: IdSet) -> IdSet {
    let mut list: Vec<u32> = ids.into_iter().collect();
    list.shuffle(&mut rand::rng());
    list.into_iter().collect()
}

pub struct QueryComposer {
    resolver: Arc<TermResolver>,
    events: Events,
}

impl QueryComposer {
    pub fn new(resolver: Arc<TermResolver>, events: Events) -> Self {
        Self { resolver, events }
    }

    /// 计算完整结果集
    ///
    /// 种子列表读取失败上抛；单个检索词失败按空集处理。
    pub async fn compose(&self, text: &str, filters: &SearchFilters, language: &str) -> Result<IdSet> {
        let query = parse_query(text, filters);
        if query.matches_nothing {
            debug!("所有画廊类型均被禁用，结果为空");
            return Ok(IdSet::new());
        }

        info!(
            "组合检索: +{} -{} sort={:?}",
            query.positive.len(),
            query.negative.len(),
            query.sort
        );

        let seed = async {
            if query.positive.is_empty() {
                self.resolver.seed(query.sort, language).await.map(Some)
            } else {
                Ok(None)
            }
        };

        let (seed, positive, negative) = tokio::join!(
            seed,
            self.resolver.resolve_all(&query.positive, language),
            self.resolver.resolve_all(&query.negative, language),
        );

        let mut result = combine(seed?, positive, negative);
        if query.sort.is_random() {
            result = shuffle(result);
        }

        self.events.emit(SearchEvent::ResultComposed { total: result.len() });
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::filters::{GalleryType, TextFilterKind};
    use crate::search::term::Namespace;
    use strum::IntoEnumIterator;

    fn set(ids: &[u32]) -> IdSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn splits_text_and_filters_by_polarity() {
        let filters = SearchFilters::default()
            .without_type(GalleryType::Anime)
            .with_text(TextFilterKind::Artists, "foo, -bar");
        let q = parse_query("?  Glasses -tag:Yaoi  language:english ", &filters);

        let pos: Vec<_> = q.positive.iter().map(|t| t.to_string()).collect();
        let neg: Vec<_> = q.negative.iter().map(|t| t.to_string()).collect();
        assert_eq!(pos, vec!["glasses", "language:english", "artist:foo"]);
        assert_eq!(neg, vec!["-tag:yaoi", "-type:anime", "-artist:bar"]);
        assert!(!q.matches_nothing);
    }

    #[test]
    fn empty_query_has_no_terms() {
        let q = parse_query("   ", &SearchFilters::default());
        assert!(q.positive.is_empty() && q.negative.is_empty());
        assert_eq!(q.sort, SortBy::DateAdded);
    }

    #[test]
    fn all_types_disabled_matches_nothing() {
        let mut filters = SearchFilters::default();
        for t in GalleryType::iter() {
            filters = filters.without_type(t);
        }
        assert!(parse_query("glasses", &filters).matches_nothing);
    }

    #[test]
    fn intersects_then_subtracts() {
        let result = combine(None, vec![set(&[1, 2, 3, 4]), set(&[2, 3, 5])], vec![set(&[3])]);
        assert_eq!(result, set(&[2]));
    }

    #[test]
    fn empty_intersection_is_never_reseeded() {
        let result = combine(
            None,
            vec![set(&[1, 2]), set(&[3, 4]), set(&[1, 3])],
            vec![],
        );
        assert!(result.is_empty());
    }

    #[test]
    fn seed_keeps_listing_order_and_drops_negatives() {
        let result = combine(Some(set(&[9, 7, 5, 3])), vec![], vec![set(&[7]), set(&[100])]);
        assert_eq!(result.into_iter().collect::<Vec<_>>(), vec![9, 5, 3]);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let ids: IdSet = (1..=50).collect();
        let shuffled = shuffle(ids.clone());
        assert_eq!(shuffled.len(), ids.len());
        assert!(ids.iter().all(|id| shuffled.contains(id)));

        let orders: Vec<Vec<u32>> = (0..5)
            .map(|_| shuffle(ids.clone()).into_iter().collect())
            .collect();
        assert!(orders.iter().any(|o| o != &orders[0]));
    }

    #[test]
    fn gender_filters_keep_their_namespace() {
        let filters = SearchFilters::default().with_text(TextFilterKind::MaleTags, "muscle");
        let q = parse_query("", &filters);
        assert_eq!(q.positive[0].namespace, Some(Namespace::Male));
    }
}
