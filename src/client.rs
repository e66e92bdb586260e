//! TeraBox client for resolving share links and downloading files.

use std::path::Path;
use std::sync::LazyLock;

use futures::StreamExt;
use log::{debug, info, warn};
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, COOKIE, REFERER, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tempfile::TempPath;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::{Result, TeraboxError, CANNOT_WRITE, INVALID_CREDENTIAL, INVALID_LINK};
use crate::models::{DownloadResult, FileInfo, ShareListResponse};
use crate::share_link::ShareLink;

/// Application id the web client sends to the list API.
const APP_ID: &str = "250528";

/// Markers around the percent-encoded `jsToken` in the share page.
const JS_TOKEN_START: &str = "fn%28%22";
const JS_TOKEN_END: &str = "%22%29";

/// Markers around the request log id in the share page.
const LOG_ID_START: &str = "dp-logid=";
const LOG_ID_END: &str = "&";

/// List API error numbers meaning the session is not accepted.
const CREDENTIAL_ERRNOS: &[i64] = &[-6, 400141];

/// List API error numbers meaning the share is gone or never existed.
const LINK_ERRNOS: &[i64] = &[2, -7, -9, 105, 117, 400310];

/// Name used when neither the file info nor the response yields a usable one.
const FALLBACK_FILE_NAME: &str = "download";

/// `filename*=charset'lang'value` (RFC 5987) in a Content-Disposition header.
static EXT_FILENAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfilename\*\s*=\s*(?:[\w!#$%&+^`{}~-]*'[^']*')?([^;]+)")
        .expect("Invalid extended filename regex")
});

/// `filename="value"` or `filename=value` in a Content-Disposition header.
static FILENAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bfilename\s*=\s*(?:"([^"]*)"|([^;]*))"#)
        .expect("Invalid filename regex")
});

/// Tokens scraped from the share page.
#[derive(Debug)]
struct PageTokens {
    js_token: String,
    log_id: String,
}

/// Client for resolving and downloading TeraBox shares.
pub struct TeraboxClient {
    credential: Credential,
    config: ClientConfig,
    http: Client,
}

impl TeraboxClient {
    /// Create a new TeraboxClient with the default configuration.
    ///
    /// # Arguments
    /// * `cookie` - Session cookie, e.g. `lang=en; ndus=...;`
    pub fn new(cookie: impl Into<String>) -> Self {
        Self::with_config(cookie, ClientConfig::default())
    }

    /// Create a new TeraboxClient with an explicit configuration.
    pub fn with_config(cookie: impl Into<String>, config: ClientConfig) -> Self {
        Self::from_credential(Credential::new(cookie), config)
    }

    /// Create a new TeraboxClient from an already loaded credential, e.g. one
    /// read with [`Credential::from_file`].
    ///
    /// ```no_run
    /// use terabox_dl::{ClientConfig, Credential, TeraboxClient};
    ///
    /// let credential = Credential::from_file("cookie.txt")?;
    /// let client = TeraboxClient::from_credential(credential, ClientConfig::default());
    /// # Ok::<(), std::io::Error>(())
    /// ```
    pub fn from_credential(credential: Credential, config: ClientConfig) -> Self {
        Self {
            credential,
            config,
            http: Client::new(),
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .header(COOKIE, self.credential.header_value())
            .header(USER_AGENT, &self.config.user_agent)
    }

    /// Resolve a share link into the name, size and direct link of its file.
    ///
    /// # Arguments
    /// * `link` - A TeraBox share URL
    pub async fn resolve_info(&self, link: &str) -> Result<FileInfo> {
        self.credential.validate()?;
        let share = ShareLink::parse(link)?;

        debug!("Resolving share {}", share.surl);
        let tokens = self.fetch_page_tokens(&share.surl).await?;
        let listing = self
            .fetch_share_list(share.url.as_str(), &share.surl, &tokens)
            .await?;

        file_info_from_listing(listing)
    }

    /// Load the share page and scrape the tokens the list API requires.
    async fn fetch_page_tokens(&self, surl: &str) -> Result<PageTokens> {
        let response = self
            .get(&format!("{}/sharing/link", self.config.base_url))
            .header(REFERER, format!("{}/", self.config.base_url))
            .query(&[("surl", surl)])
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        check_resolution_status(response.status())?;
        let body = response.text().await.map_err(transport_error)?;

        // The page only embeds a token for a logged-in session.
        let js_token = between(&body, JS_TOKEN_START, JS_TOKEN_END)
            .ok_or_else(|| TeraboxError::resolution(INVALID_CREDENTIAL))?;
        let log_id = between(&body, LOG_ID_START, LOG_ID_END).unwrap_or_default();

        Ok(PageTokens {
            js_token: js_token.to_string(),
            log_id: log_id.to_string(),
        })
    }

    async fn fetch_share_list(
        &self,
        link: &str,
        surl: &str,
        tokens: &PageTokens,
    ) -> Result<ShareListResponse> {
        debug!("Listing share {}", surl);
        let response = self
            .get(&format!("{}/share/list", self.config.base_url))
            .header(REFERER, link)
            .query(&[
                ("app_id", APP_ID),
                ("web", "1"),
                ("channel", "dubox"),
                ("clienttype", "0"),
                ("jsToken", tokens.js_token.as_str()),
                ("dp-logid", tokens.log_id.as_str()),
                ("page", "1"),
                ("num", "20"),
                ("by", "name"),
                ("order", "asc"),
                ("site_referer", link),
                ("shorturl", surl),
                ("root", "1"),
            ])
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;

        check_resolution_status(response.status())?;
        let body = response.text().await.map_err(transport_error)?;

        serde_json::from_str(&body)
            .map_err(|_| TeraboxError::resolution("unexpected response shape"))
    }

    /// Download a resolved file into a directory.
    ///
    /// The body is written to a hidden temporary file inside the destination
    /// and renamed into place once complete; the temporary file is removed on
    /// failure. When `info.file_name` does not reduce to a usable file name,
    /// the name is taken from the response's Content-Disposition header, then
    /// from the last segment of the download URL.
    ///
    /// # Arguments
    /// * `info` - File info from [`resolve_info`](Self::resolve_info)
    /// * `destination` - Directory to save into, created if missing
    pub async fn download<P: AsRef<Path>>(
        &self,
        info: &FileInfo,
        destination: P,
    ) -> Result<DownloadResult> {
        if info.file_name.trim().is_empty() || info.download_link.trim().is_empty() {
            return Err(TeraboxError::download("invalid file info"));
        }

        let destination = destination.as_ref();

        fs::create_dir_all(destination).await.map_err(|e| {
            debug!("Cannot create {}: {}", destination.display(), e);
            TeraboxError::download(CANNOT_WRITE)
        })?;

        // Fixed-length name, independent of the remote file name.
        let mut builder = tempfile::Builder::new();
        builder.prefix(".terabox-").suffix(".part");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(std::fs::Permissions::from_mode(0o644));
        }

        let (file, part) = builder
            .tempfile_in(destination)
            .map_err(|e| {
                debug!("Cannot create temporary file in {}: {}", destination.display(), e);
                TeraboxError::download(CANNOT_WRITE)
            })?
            .into_parts();

        let fetched = match self.fetch_into(File::from_std(file), info).await {
            Ok(fetched) => fetched,
            Err(e) => {
                discard(part);
                return Err(e);
            }
        };

        let file_name = local_file_name(&info.file_name)
            .or_else(|| fetched.suggested_name.as_deref().and_then(local_file_name))
            .unwrap_or(FALLBACK_FILE_NAME);
        let final_path = destination.join(file_name);

        if let Err(e) = part.persist(&final_path) {
            debug!("Cannot move download to {}: {}", final_path.display(), e.error);
            discard(e.path);
            return Err(TeraboxError::download(CANNOT_WRITE));
        }

        info!("Saved {} ({} bytes)", final_path.display(), fetched.written);
        Ok(DownloadResult {
            file_path: final_path,
        })
    }

    /// Stream the download link into `file`.
    async fn fetch_into(&self, mut file: File, info: &FileInfo) -> Result<Fetched> {
        debug!("Downloading {}", info.file_name);
        let request = self.get(&info.download_link).send();
        let response = match timeout(self.config.request_timeout, request).await {
            Ok(response) => response
                .map_err(|e| TeraboxError::download(format!("network error: {}", e)))?,
            Err(_) => {
                return Err(TeraboxError::download(format!(
                    "network error: no response within {:?}",
                    self.config.request_timeout
                )));
            }
        };

        let status = response.status();
        match status {
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(TeraboxError::download("download link expired or invalid"));
            }
            s if !s.is_success() => {
                return Err(TeraboxError::download(format!(
                    "unexpected status {}",
                    s.as_u16()
                )));
            }
            _ => {}
        }

        let suggested_name = suggested_name(&response);

        // Stream to file
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let next = timeout(self.config.read_timeout, stream.next())
                .await
                .map_err(|_| {
                    TeraboxError::download(format!(
                        "network interrupted: no data for {:?}",
                        self.config.read_timeout
                    ))
                })?;
            let Some(chunk) = next else { break };

            let chunk = chunk
                .map_err(|e| TeraboxError::download(format!("network interrupted: {}", e)))?;
            file.write_all(&chunk).await.map_err(write_failed)?;
            written += chunk.len() as u64;
        }

        file.flush().await.map_err(write_failed)?;

        if written != info.file_size {
            return Err(TeraboxError::download(format!(
                "size mismatch: expected {} bytes, got {}",
                info.file_size, written
            )));
        }

        Ok(Fetched {
            written,
            suggested_name,
        })
    }
}

/// Outcome of streaming a download body.
struct Fetched {
    written: u64,
    suggested_name: Option<String>,
}

fn transport_error(e: reqwest::Error) -> TeraboxError {
    TeraboxError::resolution(format!("remote service unreachable: {}", e))
}

fn discard(part: TempPath) {
    let path = part.to_path_buf();
    if let Err(e) = part.close() {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn write_failed(e: std::io::Error) -> TeraboxError {
    TeraboxError::download(format!("write failed: {}", e))
}

fn check_resolution_status(status: StatusCode) -> Result<()> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(TeraboxError::resolution(INVALID_CREDENTIAL))
        }
        StatusCode::NOT_FOUND => Err(TeraboxError::resolution(INVALID_LINK)),
        s if !s.is_success() => Err(TeraboxError::resolution(format!(
            "unexpected status {}",
            s.as_u16()
        ))),
        _ => Ok(()),
    }
}

/// Turn a list API response into a complete FileInfo, or an error.
fn file_info_from_listing(listing: ShareListResponse) -> Result<FileInfo> {
    match listing.errno {
        0 => {}
        errno if CREDENTIAL_ERRNOS.contains(&errno) => {
            return Err(TeraboxError::resolution(INVALID_CREDENTIAL));
        }
        errno if LINK_ERRNOS.contains(&errno) => {
            return Err(TeraboxError::resolution(INVALID_LINK));
        }
        errno => {
            debug!("List API errno {}: {:?}", errno, listing.errmsg);
            return Err(TeraboxError::resolution(format!(
                "unexpected response (errno {})",
                errno
            )));
        }
    }

    let shape = || TeraboxError::resolution("unexpected response shape");

    let entry = listing
        .list
        .into_iter()
        .next()
        .ok_or_else(|| TeraboxError::resolution("share contains no files"))?;

    if entry.isdir {
        return Err(TeraboxError::resolution("shared item is a directory"));
    }

    let file_name = entry
        .server_filename
        .filter(|name| !name.is_empty())
        .ok_or_else(shape)?;
    let download_link = entry.dlink.filter(|link| !link.is_empty()).ok_or_else(shape)?;
    let file_size = entry.size.ok_or_else(shape)?;

    Ok(FileInfo {
        file_name,
        file_size,
        download_link,
    })
}

/// Return the text between `start` and the next `end`, if non-empty.
fn between<'a>(haystack: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = haystack.find(start)? + start.len();
    let len = haystack[from..].find(end)?;
    let value = &haystack[from..from + len];
    (!value.is_empty()).then_some(value)
}

/// Reduce a remote file name to a single path component.
fn local_file_name(name: &str) -> Option<&str> {
    Path::new(name.trim()).file_name().and_then(|n| n.to_str())
}

/// File name offered by the server, from Content-Disposition or the final URL.
fn suggested_name(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(disposition_file_name)
        .or_else(|| url_file_name(response.url()))
}

fn disposition_file_name(header: &str) -> Option<String> {
    let extended = EXT_FILENAME_REGEX
        .captures(header)
        .and_then(|c| c.get(1))
        .and_then(|m| percent_decode_str(m.as_str().trim()).decode_utf8().ok())
        .map(|name| name.into_owned());

    let plain = || {
        FILENAME_REGEX
            .captures(header)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().trim().to_string())
    };

    extended.or_else(plain).filter(|name| !name.is_empty())
}

fn url_file_name(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let name = percent_decode_str(segment).decode_utf8().ok()?;
    (!name.is_empty()).then(|| name.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShareEntry;

    fn listing(errno: i64, list: Vec<ShareEntry>) -> ShareListResponse {
        ShareListResponse {
            errno,
            errmsg: None,
            list,
        }
    }

    fn entry(name: &str, size: u64, dlink: &str) -> ShareEntry {
        ShareEntry {
            server_filename: Some(name.to_string()),
            size: Some(size),
            dlink: Some(dlink.to_string()),
            isdir: false,
        }
    }

    #[test]
    fn test_between() {
        let page = r#"x = decodeURIComponent("fn%28%22ABC123%22%29"); u="?dp-logid=42&x=1""#;
        assert_eq!(between(page, JS_TOKEN_START, JS_TOKEN_END), Some("ABC123"));
        assert_eq!(between(page, LOG_ID_START, LOG_ID_END), Some("42"));
        assert_eq!(between(page, "missing", "&"), None);
        assert_eq!(between("fn%28%22%22%29", JS_TOKEN_START, JS_TOKEN_END), None);
    }

    #[test]
    fn test_listing_success() {
        let info = file_info_from_listing(listing(0, vec![entry("a.bin", 3, "https://d/x")]))
            .unwrap();
        assert_eq!(info.file_name, "a.bin");
        assert_eq!(info.file_size, 3);
        assert_eq!(info.download_link, "https://d/x");
    }

    #[test]
    fn test_listing_errno_mapping() {
        let err = file_info_from_listing(listing(-6, vec![])).unwrap_err();
        assert_eq!(err.message(), INVALID_CREDENTIAL);

        let err = file_info_from_listing(listing(105, vec![])).unwrap_err();
        assert_eq!(err.message(), INVALID_LINK);

        let err = file_info_from_listing(listing(31, vec![])).unwrap_err();
        assert_eq!(err.message(), "unexpected response (errno 31)");
    }

    #[test]
    fn test_listing_rejects_partial_entries() {
        let mut partial = entry("a.bin", 3, "https://d/x");
        partial.dlink = None;
        let err = file_info_from_listing(listing(0, vec![partial])).unwrap_err();
        assert_eq!(err.message(), "unexpected response shape");

        let mut dir = entry("photos", 0, "https://d/x");
        dir.isdir = true;
        let err = file_info_from_listing(listing(0, vec![dir])).unwrap_err();
        assert_eq!(err.message(), "shared item is a directory");

        let err = file_info_from_listing(listing(0, vec![])).unwrap_err();
        assert_eq!(err.message(), "share contains no files");
    }

    #[test]
    fn test_local_file_name() {
        assert_eq!(local_file_name("movie.mkv"), Some("movie.mkv"));
        assert_eq!(local_file_name("dir/movie.mkv"), Some("movie.mkv"));
        assert_eq!(local_file_name(".."), None);
        assert_eq!(local_file_name("/"), None);
    }

    #[test]
    fn test_disposition_file_name() {
        assert_eq!(
            disposition_file_name(r#"attachment; filename="report final.pdf""#).as_deref(),
            Some("report final.pdf")
        );
        assert_eq!(
            disposition_file_name("attachment; filename=plain.txt; size=3").as_deref(),
            Some("plain.txt")
        );
        assert_eq!(
            disposition_file_name(
                r#"attachment; filename="fallback.txt"; filename*=UTF-8''caf%C3%A9.txt"#
            )
            .as_deref(),
            Some("café.txt")
        );
        assert_eq!(disposition_file_name("inline"), None);
        assert_eq!(disposition_file_name(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_url_file_name() {
        let url = Url::parse("https://d.terabox.app/file/my%20video.mp4?fid=1").unwrap();
        assert_eq!(url_file_name(&url).as_deref(), Some("my video.mp4"));

        let url = Url::parse("https://d.terabox.app/").unwrap();
        assert_eq!(url_file_name(&url), None);
    }
}
