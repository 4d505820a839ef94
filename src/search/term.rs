//! 检索词模型 (Query Terms)
//!
//! 原始检索文本中的原子单元：命名空间 + 值 + 极性。

use std::fmt;
use std::str::FromStr;

use strum::EnumString;

use crate::core::config::TermRewrite;

/// 检索词命名空间
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    Tag,
    Artist,
    Group,
    Series,
    Type,
    Character,
    Female,
    Male,
    Language,
    #[strum(default)]
    Other(String),
}

impl Namespace {
    pub fn as_str(&self) -> &str {
        match self {
            Namespace::Tag => "tag",
            Namespace::Artist => "artist",
            Namespace::Group => "group",
            Namespace::Series => "series",
            Namespace::Type => "type",
            Namespace::Character => "character",
            Namespace::Female => "female",
            Namespace::Male => "male",
            Namespace::Language => "language",
            Namespace::Other(s) => s,
        }
    }

    /// 解析命名空间，未知名称保留为 `Other`
    pub fn parse(s: &str) -> Self {
        // `#[strum(default)]` 保证解析不会失败
        Namespace::from_str(s).unwrap_or_else(|_| Namespace::Other(s.to_string()))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    /// `None` 表示全文哈希检索
    pub namespace: Option<Namespace>,
    pub value: String,
    pub polarity: Polarity,
}

/// 小写并将 `_` 规范为空格
pub fn normalize(raw: &str) -> String {
    raw.to_lowercase().replace('_', " ")
}

impl Term {
    pub fn new(namespace: Option<Namespace>, value: &str, polarity: Polarity) -> Self {
        Self {
            namespace,
            value: normalize(value),
            polarity,
        }
    }

    pub fn include(namespace: Namespace, value: &str) -> Self {
        Self::new(Some(namespace), value, Polarity::Include)
    }

    pub fn exclude(namespace: Namespace, value: &str) -> Self {
        Self::new(Some(namespace), value, Polarity::Exclude)
    }

    /// 从单个原始 token 解析 (`-` 前缀表示排除，首个 `:` 分隔命名空间)
    pub fn parse(token: &str) -> Option<Self> {
        let (polarity, body) = match token.strip_prefix('-') {
            Some(rest) => (Polarity::Exclude, rest),
            None => (Polarity::Include, token),
        };

        let body = normalize(body);
        if body.trim().is_empty() {
            return None;
        }

        let term = match body.split_once(':') {
            Some((ns, value)) if !ns.is_empty() => Term {
                namespace: Some(Namespace::parse(ns)),
                value: value.to_string(),
                polarity,
            },
            _ => Term {
                namespace: None,
                value: body,
                polarity,
            },
        };
        Some(term)
    }

    pub fn is_negative(&self) -> bool {
        self.polarity == Polarity::Exclude
    }

    /// 不含极性的检索文本 (`ns:value` 或 `value`)
    pub fn query_text(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}:{}", ns, self.value),
            None => self.value.clone(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        f.write_str(&self.query_text())
    }
}

/// 检索词改写规则表
#[derive(Debug, Clone, Default)]
pub struct TermRewriter {
    rules: Vec<TermRewrite>,
}

impl TermRewriter {
    pub fn new(rules: Vec<TermRewrite>) -> Self {
        Self { rules }
    }

    /// 按首个匹配规则改写，未匹配则原样返回
    pub fn apply(&self, term: &Term) -> Term {
        let Some(ns) = &term.namespace else {
            return term.clone();
        };

        match self.rules.iter().find(|r| r.namespace == ns.as_str()) {
            Some(rule) => Term {
                namespace: Some(Namespace::parse(&rule.target)),
                value: if rule.keep_prefix {
                    format!("{}:{}", ns, term.value)
                } else {
                    term.value.clone()
                },
                polarity: term.polarity,
            },
            None => term.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SearchConfig;

    #[test]
    fn parses_namespaces_and_polarity() {
        let t = Term::parse("-Artist:Some_Name").unwrap();
        assert_eq!(t.namespace, Some(Namespace::Artist));
        assert_eq!(t.value, "some name");
        assert!(t.is_negative());
        assert_eq!(t.to_string(), "-artist:some name");

        let bare = Term::parse("Glasses").unwrap();
        assert_eq!(bare.namespace, None);
        assert_eq!(bare.query_text(), "glasses");
    }

    #[test]
    fn unknown_namespace_is_preserved() {
        let t = Term::parse("circle:foo").unwrap();
        assert_eq!(t.namespace, Some(Namespace::Other("circle".into())));
        assert_eq!(t.query_text(), "circle:foo");
    }

    #[test]
    fn blank_tokens_are_dropped() {
        assert!(Term::parse("").is_none());
        assert!(Term::parse("-").is_none());
        assert!(Term::parse("_").is_none());
    }

    #[test]
    fn gender_rules_route_through_tag() {
        let rewriter = TermRewriter::new(SearchConfig::default().rewrites);
        let t = rewriter.apply(&Term::parse("female:big_breasts").unwrap());
        assert_eq!(t.namespace, Some(Namespace::Tag));
        assert_eq!(t.value, "female:big breasts");

        let untouched = Term::parse("artist:x").unwrap();
        assert_eq!(rewriter.apply(&untouched), untouched);
    }

    #[test]
    fn rewrite_can_drop_prefix() {
        let rewriter = TermRewriter::new(vec![TermRewrite {
            namespace: "parody".into(),
            target: "series".into(),
            keep_prefix: false,
        }]);
        let t = rewriter.apply(&Term::parse("-parody:touhou").unwrap());
        assert_eq!(t.to_string(), "-series:touhou");
    }
}
