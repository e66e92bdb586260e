//! terabox_dl - A CLI tool for fetching files from TeraBox share links.
//!
//! This library provides functionality to:
//! - Resolve a share link into file name, size and direct download link
//! - Download a resolved file into a local directory
//!
//! Requests are authenticated with a session cookie obtained from a logged-in
//! browser (`lang=en; ndus=...;`).
//!
//! # Example
//!
//! ```no_run
//! use terabox_dl::TeraboxClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TeraboxClient::new("lang=en; ndus=...;");
//!
//!     let info = client.resolve_info("https://www.terabox.com/s/1abc").await?;
//!     println!("{}", info);
//!
//!     let result = client.download(&info, "./downloads/").await?;
//!     println!("{}", result.file_path.display());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod models;
pub mod share_link;

// Re-exports for convenience
pub use client::TeraboxClient;
pub use config::ClientConfig;
pub use credential::Credential;
pub use error::{Result, TeraboxError};
pub use models::{DownloadResult, ErrorPayload, FileInfo};
pub use share_link::extract_surl;
