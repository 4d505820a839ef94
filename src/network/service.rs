use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};

use crate::core::config::AppConfig;
use crate::core::error::{GalleryError, Result};
use crate::network::middleware::{SessionMiddleware, StatusMiddleware};
use crate::network::session::Session;

#[derive(Clone)]
pub struct HttpService {
    client: ClientWithMiddleware,
    session: Arc<Session>,
}

impl HttpService {
    pub fn new(config: &AppConfig, session: Arc<Session>) -> Result<Self> {
        let client = Self::build_client(config, &session)?;
        Ok(Self { client, session })
    }

    /// 构建底层的 HTTP 客户端
    fn build_client(config: &AppConfig, session: &Session) -> Result<ClientWithMiddleware> {
        let mut headers = HeaderMap::new();

        let ua = session.get_ua();
        if !ua.is_empty()
            && let Ok(val) = HeaderValue::from_str(&ua)
        {
            headers.insert(USER_AGENT, val);
        }
        headers.extend(session.get_headers());

        let builder = reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(config.http.pool_max_idle_per_host)
            .tcp_nodelay(true) // 禁用 Nagle 算法，降低小包延迟
            .connect_timeout(Duration::from_secs(config.http.connect_timeout_secs))
            .timeout(Duration::from_secs(config.http.timeout_secs));

        let builder = match &config.http.proxy {
            Some(proxy) => builder.proxy(reqwest::Proxy::all(proxy).map_err(GalleryError::Network)?),
            None => builder.no_proxy(),
        };
        let client = builder.build().map_err(GalleryError::Network)?;

        Ok(ClientBuilder::new(client)
            .with(SessionMiddleware)
            .with(StatusMiddleware)
            .build())
    }

    /// 执行 GET 请求，`extra` 中的 Header 覆盖会话默认值
    pub async fn get(&self, url: &str, extra: HeaderMap) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .headers(extra)
            .with_extension(self.session.clone())
            .send()
            .await
            .map_err(|e| GalleryError::Middleware(e).flatten())
    }
}
