//! 远程字节源定义
//!
//! 所有索引访问都经由此接口完成，HTTP 实现见 `network::client`。

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::error::{GalleryError, Result};

/// 闭区间字节范围 `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// 从偏移与长度构造，`len` 必须大于 0
    pub fn with_len(start: u64, len: u64) -> Option<Self> {
        if len == 0 {
            return None;
        }
        start.checked_add(len - 1).map(|end| Self { start, end })
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Range` 请求头取值
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// 支持范围读取的远程字节源
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// 读取远程资源；`range` 为空时读取完整内容
    async fn fetch(&self, url: &str, range: Option<ByteRange>) -> Result<Bytes>;

    /// 读取完整文本内容
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch(url, None).await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| GalleryError::Parse(format!("Non UTF-8 body from {}: {}", url, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive() {
        let range = ByteRange::with_len(100, 464).unwrap();
        assert_eq!(range.end, 563);
        assert_eq!(range.len(), 464);
        assert_eq!(range.header_value(), "bytes=100-563");
    }

    #[test]
    fn zero_length_range_is_rejected() {
        assert!(ByteRange::with_len(0, 0).is_none());
        assert!(ByteRange::with_len(u64::MAX, 2).is_none());
    }
}
