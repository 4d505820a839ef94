//! 错误处理体系 (Error Handling System)
//!
//! 定义索引访问、检索组合与 CDN 分片解析相关的错误类型及全局 Result 别名。

use reqwest::StatusCode;
use thiserror::Error;

/// 全局错误定义 (Gallery Domain Errors)
#[derive(Error, Debug)]
pub enum GalleryError {
    /// 非成功状态码，核心层不做重试
    #[error("Transport error: HTTP {status} for {url}")]
    Transport { url: String, status: StatusCode },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// 节点 / 倒排表字节损坏或越界
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// 单个检索词解析失败，由组合层降级为空集
    #[error("Failed to resolve term `{term}`: {source}")]
    TermResolution {
        term: String,
        #[source]
        source: Box<GalleryError>,
    },

    /// gg 脚本模式匹配失败
    #[error("Shard config error: {0}")]
    ShardConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Custom(String),
}

/// 全局 Result 别名
pub type Result<T> = std::result::Result<T, GalleryError>;

impl GalleryError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        GalleryError::CorruptIndex(msg.into())
    }

    /// 将单个检索词的失败包装为 TermResolution
    pub fn for_term(term: impl Into<String>, source: GalleryError) -> Self {
        GalleryError::TermResolution {
            term: term.into(),
            source: Box::new(source),
        }
    }

    /// 探测错误中携带的 HTTP 状态码
    ///
    /// 支持中间件嵌套错误的分层解包 (Downcasting)。
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GalleryError::Transport { status, .. } => Some(*status),
            GalleryError::TermResolution { source, .. } => source.status(),
            GalleryError::Middleware(reqwest_middleware::Error::Middleware(anyhow_err)) => {
                anyhow_err.downcast_ref::<GalleryError>().and_then(|e| e.status())
            }
            GalleryError::Middleware(reqwest_middleware::Error::Reqwest(e)) => e.status(),
            GalleryError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// 展开中间件层包装，还原为领域错误
    pub fn flatten(self) -> Self {
        match self {
            GalleryError::Middleware(reqwest_middleware::Error::Middleware(anyhow_err)) => {
                match anyhow_err.downcast::<GalleryError>() {
                    Ok(inner) => inner.flatten(),
                    Err(other) => GalleryError::Middleware(reqwest_middleware::Error::Middleware(other)),
                }
            }
            GalleryError::Middleware(reqwest_middleware::Error::Reqwest(e)) => GalleryError::Network(e),
            other => other,
        }
    }

    pub fn is_range_not_satisfiable(&self) -> bool {
        self.status() == Some(StatusCode::RANGE_NOT_SATISFIABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middleware_error_unwraps_to_transport() {
        let inner = GalleryError::Transport {
            url: "https://ltn.example/a.nozomi".into(),
            status: StatusCode::NOT_FOUND,
        };
        let wrapped = GalleryError::Middleware(reqwest_middleware::Error::Middleware(
            anyhow::Error::new(inner),
        ));

        assert_eq!(wrapped.status(), Some(StatusCode::NOT_FOUND));
        assert!(matches!(wrapped.flatten(), GalleryError::Transport { .. }));
    }

    #[test]
    fn term_error_reports_inner_status() {
        let err = GalleryError::for_term(
            "artist:foo",
            GalleryError::Transport {
                url: "u".into(),
                status: StatusCode::RANGE_NOT_SATISFIABLE,
            },
        );
        assert!(err.is_range_not_satisfiable());
        assert!(err.to_string().contains("artist:foo"));
    }
}
