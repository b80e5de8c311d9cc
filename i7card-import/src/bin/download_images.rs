//! Bulk card-image downloader.
//!
//! Fetches `<base-url>/<id>.png` for a numeric id range into an output
//! directory, a bounded number of downloads in flight at once. Images that
//! are already on disk are skipped, so reruns only fill the gaps.

use anyhow::{bail, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use i7card_common::config::Settings;
use i7card_import::SheetClient;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "download-images")]
#[command(about = "Download card images for a numeric id range")]
struct Cli {
    /// First card id to fetch
    #[arg(long)]
    start: u32,

    /// Last card id to fetch (inclusive)
    #[arg(long)]
    end: u32,

    /// Image base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Directory to write images into
    #[arg(long, default_value = "images")]
    output: PathBuf,

    /// Concurrent downloads
    #[arg(long, default_value_t = 4)]
    workers: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.start > cli.end {
        bail!("--start must not exceed --end");
    }

    let settings = Settings::resolve(None, None)?;
    let Some(base_url) = cli.base_url.or(settings.image_base_url) else {
        bail!("no image base URL; pass --base-url or set image_base_url in the config file");
    };
    let base_url = base_url.trim_end_matches('/').to_string();

    std::fs::create_dir_all(&cli.output)?;
    let client = SheetClient::new()?;

    let results: Vec<bool> = stream::iter(cli.start..=cli.end)
        .map(|id| {
            let client = &client;
            let base_url = &base_url;
            let output = &cli.output;
            async move {
                let path = output.join(format!("{id}.png"));
                if path.exists() {
                    return true;
                }
                let url = format!("{base_url}/{id}.png");
                match client.fetch_bytes(&url).await {
                    Ok(bytes) => match tokio::fs::write(&path, &bytes).await {
                        Ok(()) => {
                            info!(id, bytes = bytes.len(), "Downloaded");
                            true
                        }
                        Err(e) => {
                            warn!(id, error = %e, "Write failed");
                            false
                        }
                    },
                    Err(e) => {
                        warn!(id, error = %e, "Download failed");
                        false
                    }
                }
            }
        })
        .buffer_unordered(cli.workers.max(1))
        .collect()
        .await;

    let succeeded = results.iter().filter(|ok| **ok).count();
    println!("{succeeded}/{} images available", results.len());
    Ok(())
}
