//! Client configuration.

use std::time::Duration;

/// Default TeraBox web endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.terabox.app";

/// Browser user agent; the share page refuses obvious non-browser clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Settings for a [`TeraboxClient`](crate::TeraboxClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Scheme and host the share page and list API are requested from.
    pub base_url: String,
    pub user_agent: String,
    /// Deadline for each resolution request, and for the response headers of
    /// a download. Download bodies as a whole are not bounded.
    pub request_timeout: Duration,
    /// Longest gap between two chunks of a download body.
    pub read_timeout: Duration,
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
        }
    }
}
