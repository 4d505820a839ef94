//! 检索层 (Search)
//!
//! 检索词模型、过滤器、检索词解析、集合组合与分页会话。

pub mod filters;
pub mod query;
pub mod resolver;
pub mod session;
pub mod term;

pub use filters::{SearchFilters, SortBy};
pub use query::QueryComposer;
pub use resolver::TermResolver;
pub use session::{SearchPage, SearchSession};
