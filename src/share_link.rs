//! Share link parser for extracting the TeraBox short-url id.

use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

use crate::error::{Result, TeraboxError, INVALID_LINK};

/// Domains TeraBox serves share pages from.
const SHARE_HOSTS: &[&str] = &[
    "terabox.com",
    "1024terabox.com",
    "terabox.app",
    "teraboxapp.com",
    "1024tera.com",
    "freeterabox.com",
    "4funbox.com",
    "mirrobox.com",
    "nephobox.com",
    "momerybox.com",
    "tibibox.com",
    "terabox.fun",
    "teraboxlink.com",
    "terasharelink.com",
];

/// Paths that carry the id in a `surl` query parameter.
const SURL_QUERY_PATHS: &[&str] = &["/sharing/link", "/sharing/init", "/wap/share/filelist"];

/// Short link path, `/s/1<surl>`.
static SHORT_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/s/1([a-zA-Z0-9_-]+)/?$").expect("Invalid short path regex")
});

static SURL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid surl regex"));

/// Check whether a host belongs to one of the TeraBox share domains.
pub fn is_share_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    SHARE_HOSTS.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// A parsed TeraBox share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    /// The link as normalised by URL parsing (tabs and newlines removed).
    pub url: Url,
    /// The short-url id naming the share.
    pub surl: String,
}

impl ShareLink {
    /// Parse a TeraBox share link.
    ///
    /// Supports the following formats on any TeraBox domain:
    /// - `https://www.terabox.com/s/1<SURL>`
    /// - `https://www.terabox.com/sharing/link?surl=<SURL>`
    /// - `https://www.terabox.com/sharing/init?surl=<SURL>`
    /// - `https://www.terabox.com/wap/share/filelist?surl=<SURL>`
    pub fn parse(link: &str) -> Result<Self> {
        let invalid = || TeraboxError::resolution(INVALID_LINK);
        let trimmed = link.trim();

        if trimmed.is_empty() {
            return Err(invalid());
        }

        let url = Url::parse(trimmed).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid());
        }

        let host = url.host_str().ok_or_else(invalid)?;
        if !is_share_host(host) {
            return Err(invalid());
        }

        let surl = surl_of(&url).ok_or_else(invalid)?;
        Ok(Self { url, surl })
    }
}

fn surl_of(url: &Url) -> Option<String> {
    let path = url.path();

    // Try short link pattern
    if let Some(captures) = SHORT_PATH_REGEX.captures(path) {
        if let Some(surl) = captures.get(1) {
            return Some(surl.as_str().to_string());
        }
    }

    // Try surl query pattern
    if SURL_QUERY_PATHS.contains(&path.trim_end_matches('/')) {
        if let Some((_, surl)) = url.query_pairs().find(|(key, _)| key == "surl") {
            if SURL_REGEX.is_match(&surl) {
                return Some(surl.into_owned());
            }
        }
    }

    None
}

/// Extract the short-url id from a TeraBox share link.
///
/// # Examples
///
/// ```
/// use terabox_dl::share_link::extract_surl;
///
/// let surl = extract_surl("https://www.terabox.com/s/1AbC-12_x").unwrap();
/// assert_eq!(surl, "AbC-12_x");
/// ```
pub fn extract_surl(link: &str) -> Result<String> {
    ShareLink::parse(link).map(|link| link.surl)
}
