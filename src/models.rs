//! Data models for TeraBox share responses and client results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Resolved metadata for a shared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    pub file_size: u64,
    pub download_link: String,
}

impl std::fmt::Display for FileInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.file_name,
            format_size(self.file_size),
            self.download_link
        )
    }
}

/// Outcome of a successful download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub file_path: PathBuf,
}

/// Error payload, `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Response from the `share/list` endpoint.
#[derive(Debug, Deserialize)]
pub struct ShareListResponse {
    pub errno: i64,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub list: Vec<ShareEntry>,
}

/// One file or folder inside a share.
#[derive(Debug, Deserialize)]
pub struct ShareEntry {
    #[serde(default)]
    pub server_filename: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
    #[serde(default)]
    pub dlink: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub isdir: bool,
}

/// The list endpoint reports numbers either as JSON numbers or decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<NumberOrString> = Option::deserialize(deserializer)?;
    match opt {
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_size(deserializer)?.is_some_and(|n| n != 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_share_entry_numeric_size() {
        let json = r#"{
            "server_filename": "video.mp4",
            "size": 2048,
            "dlink": "https://d.terabox.app/file/abc",
            "isdir": 0
        }"#;

        let entry: ShareEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.server_filename.as_deref(), Some("video.mp4"));
        assert_eq!(entry.size, Some(2048));
        assert!(!entry.isdir);
    }

    #[test]
    fn test_share_entry_string_size_and_dir_flag() {
        let json = r#"{"server_filename": "photos", "size": "0", "isdir": "1"}"#;

        let entry: ShareEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.size, Some(0));
        assert!(entry.isdir);
        assert!(entry.dlink.is_none());
    }

    #[test]
    fn test_file_info_display() {
        let info = FileInfo {
            file_name: "test.txt".to_string(),
            file_size: 1024,
            download_link: "https://d.terabox.app/file/abc".to_string(),
        };

        let display = format!("{}", info);
        assert!(display.contains("test.txt"));
        assert!(display.contains("1.00 KB"));
        assert!(display.contains("https://d.terabox.app/file/abc"));
    }
}
