//! terabox_dl CLI - Fetch files from TeraBox share links.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use terabox_dl::config::DEFAULT_BASE_URL;
use terabox_dl::models::format_size;
use terabox_dl::{ClientConfig, Credential, DownloadResult, FileInfo, TeraboxClient};

/// CLI tool for fetching files from TeraBox share links.
#[derive(Parser)]
#[command(name = "terabox_dl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session cookie, e.g. "lang=en; ndus=...;".
    #[arg(
        long,
        env = "TERABOX_COOKIE",
        hide_env_values = true,
        required_unless_present = "cookie_file"
    )]
    cookie: Option<String>,

    /// Read the session cookie from a file instead.
    #[arg(long)]
    cookie_file: Option<PathBuf>,

    /// TeraBox web endpoint.
    #[arg(long, env = "TERABOX_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Timeout in seconds for each link resolution request.
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Seconds a download may go without receiving data.
    #[arg(long, default_value_t = 30)]
    read_timeout: u64,

    /// Print results and errors as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show name, size and direct link of a shared file.
    Info {
        /// Share link.
        link: String,
    },

    /// Download a shared file to local filesystem.
    Download {
        /// Share link.
        link: String,

        /// Local destination directory.
        #[arg(long, short = 't', default_value = "./downloads/")]
        to: PathBuf,
    },
}

enum Output {
    Info(FileInfo),
    Saved(FileInfo, DownloadResult),
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let credential = match &cli.cookie_file {
        Some(path) => Credential::from_file(path)
            .with_context(|| format!("Failed to read cookie from {:?}", path))?,
        None => Credential::new(cli.cookie.clone().unwrap_or_default()),
    };

    let config = ClientConfig::default()
        .with_base_url(&cli.base_url)
        .with_request_timeout(Duration::from_secs(cli.timeout))
        .with_read_timeout(Duration::from_secs(cli.read_timeout));

    let client = TeraboxClient::from_credential(credential, config);

    match run(&client, cli.command).await {
        Ok(output) => print_output(&output, cli.json),
        Err(e) if cli.json => {
            println!("{}", serde_json::to_string(&e.to_payload())?);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run(client: &TeraboxClient, command: Commands) -> terabox_dl::Result<Output> {
    match command {
        Commands::Info { link } => {
            let info = client.resolve_info(&link).await?;
            Ok(Output::Info(info))
        }

        Commands::Download { link, to } => {
            let info = client.resolve_info(&link).await?;
            eprintln!("Downloading {} ({})...", info.file_name, format_size(info.file_size));
            let result = client.download(&info, &to).await?;
            Ok(Output::Saved(info, result))
        }
    }
}

fn print_output(output: &Output, json: bool) -> Result<()> {
    match output {
        Output::Info(info) if json => println!("{}", serde_json::to_string(info)?),
        Output::Saved(_, result) if json => println!("{}", serde_json::to_string(result)?),
        Output::Info(info) => print_info(info),
        Output::Saved(info, result) => {
            print_info(info);
            println!("File downloaded to: {}", result.file_path.display());
        }
    }

    Ok(())
}

fn print_info(info: &FileInfo) {
    println!("File Name: {}", info.file_name);
    println!("File Size: {}", format_size(info.file_size));
    println!("Download Link: {}", info.download_link);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_download_defaults() {
        let cli = Cli::try_parse_from([
            "terabox_dl",
            "--cookie",
            "lang=en; ndus=abc;",
            "download",
            "https://www.terabox.com/s/1abc",
        ])
        .unwrap();

        assert_eq!(cli.timeout, 30);
        assert_eq!(cli.read_timeout, 30);
        assert!(!cli.json);
        match cli.command {
            Commands::Download { link, to } => {
                assert_eq!(link, "https://www.terabox.com/s/1abc");
                assert_eq!(to, PathBuf::from("./downloads/"));
            }
            Commands::Info { .. } => panic!("expected download command"),
        }
    }

    #[test]
    fn test_cookie_file_flag() {
        let cli = Cli::try_parse_from([
            "terabox_dl",
            "--cookie-file",
            "cookie.txt",
            "--json",
            "info",
            "https://www.terabox.com/s/1abc",
        ])
        .unwrap();

        assert_eq!(cli.cookie_file, Some(PathBuf::from("cookie.txt")));
        assert!(cli.json);
    }
}
