//! Session cookie handling for TeraBox requests.

use std::fs;
use std::path::Path;

use reqwest::header::HeaderValue;

use crate::error::{Result, TeraboxError, INVALID_CREDENTIAL};

/// Cookie carrying the logged-in session.
const SESSION_KEY: &str = "ndus";

/// Cookie selecting the page language.
const LANG_KEY: &str = "lang";

const DEFAULT_LANG: &str = "en";

/// A TeraBox session cookie, e.g. `lang=en; ndus=...;`.
///
/// Construction never fails; [`Credential::validate`] checks the shape before
/// the first request.
#[derive(Clone)]
pub struct Credential {
    raw: String,
}

impl Credential {
    /// Wrap a raw cookie string. Nothing is checked until [`validate`](Self::validate).
    ///
    /// ```
    /// use terabox_dl::Credential;
    ///
    /// let credential = Credential::new("ndus=abc;");
    /// assert!(credential.validate().is_ok());
    /// assert_eq!(credential.header_value(), "lang=en; ndus=abc");
    /// ```
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Read a cookie string from a file, ignoring surrounding whitespace.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::new(content.trim()))
    }

    /// Split the cookie into `(name, value)` pairs, skipping empty segments.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.raw.split(';').filter_map(|segment| {
            let (name, value) = segment.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name, value.trim()))
        })
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.pairs().find(|(key, _)| *key == name).map(|(_, v)| v)
    }

    /// Check that the cookie carries a non-empty session field and can be
    /// sent as a `Cookie` header.
    pub fn validate(&self) -> Result<()> {
        let has_session = self.get(SESSION_KEY).is_some_and(|value| !value.is_empty());
        if !has_session || HeaderValue::from_str(&self.header_value()).is_err() {
            return Err(TeraboxError::resolution(INVALID_CREDENTIAL));
        }
        Ok(())
    }

    /// Build the `Cookie` header value, adding `lang=en` when absent.
    pub fn header_value(&self) -> String {
        let mut parts: Vec<String> = self
            .pairs()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();

        if self.get(LANG_KEY).is_none() {
            parts.insert(0, format!("{}={}", LANG_KEY, DEFAULT_LANG));
        }

        parts.join("; ")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("raw", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_session_cookie() {
        let cred = Credential::new("lang=en; ndus=abc123;");
        assert!(cred.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_or_empty_session() {
        for raw in ["", "   ", "lang=en;", "lang=en; ndus=;", "ndus"] {
            let err = Credential::new(raw).validate().unwrap_err();
            assert_eq!(err.message(), INVALID_CREDENTIAL, "cookie {:?}", raw);
        }
    }

    #[test]
    fn test_validate_rejects_control_characters() {
        let err = Credential::new("lang=en; ndus=ab\u{1}c;").validate().unwrap_err();
        assert_eq!(err.message(), INVALID_CREDENTIAL);
    }

    #[test]
    fn test_header_value_normalises_and_defaults_lang() {
        let cred = Credential::new(" ndus = abc ;; ");
        assert_eq!(cred.header_value(), "lang=en; ndus=abc");

        let cred = Credential::new("lang=fr; ndus=abc;");
        assert_eq!(cred.header_value(), "lang=fr; ndus=abc");
    }

    #[test]
    fn test_debug_redacts_cookie() {
        let cred = Credential::new("lang=en; ndus=secret-value;");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("secret-value"));
    }
}
