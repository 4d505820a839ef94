use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, ORIGIN, REFERER};

use crate::core::config::AppConfig;

/// 请求会话：每次请求前由中间件注入的 UA 与附加 Header
#[derive(Debug, Default)]
pub struct Session {
    pub ua: Arc<RwLock<String>>,
    pub extra_headers: Arc<RwLock<HeaderMap>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按站点配置初始化 (UA + referer/origin)
    pub fn from_config(config: &AppConfig) -> Self {
        let session = Self::new();
        session.set_ua(config.http.user_agent.clone());

        let base = config.base_url();
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&format!("{}/", base)) {
            headers.insert(REFERER, v);
        }
        if let Ok(v) = HeaderValue::from_str(&base) {
            headers.insert(ORIGIN, v);
        }
        session.set_headers(headers);
        session
    }

    pub fn set_ua(&self, ua: String) {
        *self.ua.write() = ua;
    }

    pub fn get_ua(&self) -> String {
        self.ua.read().clone()
    }

    pub fn set_headers(&self, headers: HeaderMap) {
        *self.extra_headers.write() = headers;
    }

    pub fn get_headers(&self) -> HeaderMap {
        self.extra_headers.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.ua.read().is_empty() && self.extra_headers.read().is_empty()
    }

    /// 清空所有 Session 数据
    pub fn clear(&self) {
        self.ua.write().clear();
        self.extra_headers.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_session_carries_site_headers() {
        let session = Session::from_config(&AppConfig::default());
        let headers = session.get_headers();
        assert_eq!(headers[REFERER], "https://hitomi.la/");
        assert_eq!(headers[ORIGIN], "https://hitomi.la");
        assert!(session.get_ua().starts_with("Mozilla/5.0"));

        session.clear();
        assert!(session.is_empty());
    }
}
