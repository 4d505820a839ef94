use std::sync::Arc;

use reqwest::header::{HeaderValue, USER_AGENT};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};
use tracing::{debug, warn};

use crate::core::error::GalleryError;
use crate::network::session::Session;

/// 会话注入中间件
/// 负责在每次请求前，动态将 Session 中的最新 UA / Header 注入请求
pub struct SessionMiddleware;

#[async_trait::async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        if let Some(session) = extensions.get::<Arc<Session>>() {
            let headers = req.headers_mut();

            let ua = session.get_ua();
            if !ua.is_empty()
                && let Ok(val) = HeaderValue::from_str(&ua)
            {
                headers.insert(USER_AGENT, val);
            }

            // 请求自身已显式设置的 Header 优先 (例如图片请求的 Referer)
            for (k, v) in session.get_headers().iter() {
                if !headers.contains_key(k) {
                    headers.insert(k.clone(), v.clone());
                }
            }
        }
        next.run(req, extensions).await
    }
}

/// 状态码检查中间件
/// 非成功响应一律转为 `GalleryError::Transport`，核心层不做重试
pub struct StatusMiddleware;

#[async_trait::async_trait]
impl Middleware for StatusMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut http::Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let url = req.url().to_string();
        let resp = next.run(req, extensions).await?;
        let status = resp.status();

        if !status.is_success() {
            warn!("请求失败: HTTP {} {}", status, url);
            return Err(reqwest_middleware::Error::from(anyhow::Error::new(
                GalleryError::Transport { url, status },
            )));
        }

        debug!("HTTP {} {}", status, url);
        Ok(resp)
    }
}
