//! 结构化检索过滤器
//!
//! 排序、画廊类型与按命名空间分组的文本过滤器，最终都归约为检索词。

use serde::Deserialize;
use strum::{EnumIter, EnumString, IntoEnumIterator};

use super::term::{Namespace, Polarity, Term};

/// 排序方式，对应一份 nozomi 排序列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SortBy {
    #[default]
    DateAdded,
    DatePublished,
    PopularToday,
    PopularWeek,
    PopularMonth,
    PopularYear,
    Random,
}

impl SortBy {
    /// 排序列表所在的 (area, tag)
    pub fn feed_parts(self) -> (Option<&'static str>, &'static str) {
        match self {
            SortBy::DateAdded | SortBy::Random => (None, "index"),
            SortBy::DatePublished => (Some("date"), "published"),
            SortBy::PopularToday => (Some("popular"), "today"),
            SortBy::PopularWeek => (Some("popular"), "week"),
            SortBy::PopularMonth => (Some("popular"), "month"),
            SortBy::PopularYear => (Some("popular"), "year"),
        }
    }

    pub fn is_random(self) -> bool {
        self == SortBy::Random
    }
}

/// 画廊类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GalleryType {
    Doujinshi,
    Manga,
    ArtistCg,
    GameCg,
    ImageSet,
    Anime,
}

impl GalleryType {
    pub fn value(self) -> &'static str {
        match self {
            GalleryType::Doujinshi => "doujinshi",
            GalleryType::Manga => "manga",
            GalleryType::ArtistCg => "artistcg",
            GalleryType::GameCg => "gamecg",
            GalleryType::ImageSet => "imageset",
            GalleryType::Anime => "anime",
        }
    }
}

/// 类型过滤器：记录被禁用的类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct TypeFilter {
    #[serde(default)]
    pub disabled: Vec<GalleryType>,
}

impl TypeFilter {
    pub fn is_disabled(&self, kind: GalleryType) -> bool {
        self.disabled.contains(&kind)
    }

    /// 归约为检索词；返回 `None` 表示所有类型均被禁用，结果必为空
    ///
    /// - 禁用少于 5 种：逐个排除
    /// - 禁用恰好 5 种：直接限定剩余的那一种
    pub fn terms(&self) -> Option<Vec<Term>> {
        let (inactive, active): (Vec<_>, Vec<_>) =
            GalleryType::iter().partition(|t| self.is_disabled(*t));

        match (inactive.len(), active.as_slice()) {
            (n, _) if n < 5 => Some(
                inactive
                    .into_iter()
                    .map(|t| Term::exclude(Namespace::Type, t.value()))
                    .collect(),
            ),
            (5, [only]) => Some(vec![Term::include(Namespace::Type, only.value())]),
            _ => None,
        }
    }
}

/// 文本过滤器分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TextFilterKind {
    Tags,
    MaleTags,
    FemaleTags,
    Artists,
    Groups,
    Series,
    Characters,
}

impl TextFilterKind {
    pub fn namespace(self) -> Namespace {
        match self {
            TextFilterKind::Tags => Namespace::Tag,
            TextFilterKind::MaleTags => Namespace::Male,
            TextFilterKind::FemaleTags => Namespace::Female,
            TextFilterKind::Artists => Namespace::Artist,
            TextFilterKind::Groups => Namespace::Group,
            TextFilterKind::Series => Namespace::Series,
            TextFilterKind::Characters => Namespace::Character,
        }
    }
}

/// 逗号分隔的文本过滤器，`-` 前缀的值表示排除
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct TextFilter {
    pub kind: TextFilterKind,
    pub values: String,
}

impl TextFilter {
    pub fn new(kind: TextFilterKind, values: impl Into<String>) -> Self {
        Self {
            kind,
            values: values.into(),
        }
    }

    pub fn terms(&self) -> Vec<Term> {
        self.values
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .filter_map(|v| {
                let (polarity, value) = match v.strip_prefix('-') {
                    Some(rest) => (Polarity::Exclude, rest.trim()),
                    None => (Polarity::Include, v),
                };
                (!value.is_empty())
                    .then(|| Term::new(Some(self.kind.namespace()), value, polarity))
            })
            .collect()
    }
}

/// 检索过滤器全集
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub sort: SortBy,
    #[serde(default)]
    pub types: TypeFilter,
    #[serde(default)]
    pub text: Vec<TextFilter>,
}

impl SearchFilters {
    pub fn with_sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_text(mut self, kind: TextFilterKind, values: impl Into<String>) -> Self {
        self.text.push(TextFilter::new(kind, values));
        self
    }

    pub fn without_type(mut self, kind: GalleryType) -> Self {
        if !self.types.is_disabled(kind) {
            self.types.disabled.push(kind);
        }
        self
    }
}
