//! HTTP 范围读取实现

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, RANGE, REFERER};
use tracing::debug;

use crate::core::error::{GalleryError, Result};
use crate::core::model::Page;
use crate::interfaces::{ByteRange, RangeSource};
use crate::network::service::HttpService;

const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/png,image/jpeg,*/*";

/// 基于 HTTP `Range` 请求的字节源
#[derive(Clone)]
pub struct HttpRangeSource {
    http: HttpService,
}

impl HttpRangeSource {
    pub fn new(http: HttpService) -> Self {
        Self { http }
    }

    /// 拉取页面图片 (阅读页作为 Referer)
    pub async fn fetch_image(&self, page: &Page) -> Result<Bytes> {
        let resp = self.http.get(&page.image_url, image_headers(&page.url)).await?;
        resp.bytes().await.map_err(GalleryError::Network)
    }
}

/// 图片请求附加的 Header
pub fn image_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(IMAGE_ACCEPT));
    if let Ok(v) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, v);
    }
    headers
}

/// 服务端忽略 `Range` 返回完整内容时，在本地截取请求的窗口
pub fn slice_full_body(url: &str, body: Bytes, range: ByteRange) -> Result<Bytes> {
    let len = body.len() as u64;
    if range.start >= len {
        return Err(GalleryError::Transport {
            url: url.to_string(),
            status: StatusCode::RANGE_NOT_SATISFIABLE,
        });
    }
    let end = range.end.min(len - 1);
    Ok(body.slice(range.start as usize..=end as usize))
}

#[async_trait]
impl RangeSource for HttpRangeSource {
    async fn fetch(&self, url: &str, range: Option<ByteRange>) -> Result<Bytes> {
        let mut headers = HeaderMap::new();
        if let Some(r) = range
            && let Ok(v) = HeaderValue::from_str(&r.header_value())
        {
            headers.insert(RANGE, v);
        }

        let resp = self.http.get(url, headers).await?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(GalleryError::Network)?;
        debug!("读取 {} 字节: {} ({})", body.len(), url, status);

        match range {
            Some(r) if status == StatusCode::OK => slice_full_body(url, body, r),
            _ => Ok(body),
        }
    }
}
