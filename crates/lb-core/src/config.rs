use std::time::Duration;

use url::Url;

/// User agent sent by the desktop launcher
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/81.0.4044.138 Safari/537.36";

/// Upper bound for a single request, connect and body included
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for [`HttpTransport`](crate::HttpTransport)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-request timeout
    pub timeout: Duration,

    /// User agent header value
    pub user_agent: String,

    /// Route every request through this proxy (optional)
    pub proxy: Option<Url>,
}

impl TransportConfig {
    pub fn with_proxy(mut self, proxy: Url) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
        }
    }
}
