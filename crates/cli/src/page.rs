//! The terminal stand-in for the HTML page around the form.

use anyhow::{Context, Result};
use qr_form_client::page::{AlertSink, ImageElement, ImageSlot, QR_IMAGE_ID};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use url::Url;

const FALLBACK_FILE_NAME: &str = "qrcode.png";

/// Image element that prints its source and fetches the picture to disk.
pub struct TerminalImage {
    slot: ImageSlot,
    base_url: Url,
    download_dir: Option<PathBuf>,
    http: Client,
    downloads: Mutex<Vec<JoinHandle<()>>>,
}

impl TerminalImage {
    /// `download_dir: None` only records and prints the source.
    pub fn new(base_url: Url, download_dir: Option<PathBuf>, http: Client) -> Self {
        Self {
            slot: ImageSlot::new(),
            base_url,
            download_dir,
            http,
            downloads: Mutex::new(Vec::new()),
        }
    }

    pub fn src(&self) -> Option<String> {
        self.slot.src()
    }

    /// Waits for every download started so far.
    pub async fn wait_downloads(&self) {
        let handles: Vec<_> = match self.downloads.lock() {
            Ok(mut downloads) => downloads.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn start_download(&self, src: &str, dir: &Path) {
        let url = match resolve_src(&self.base_url, src) {
            Ok(url) => url,
            Err(e) => {
                warn!("Not downloading {src}: {e:#}");
                return;
            }
        };
        let dest = download_target(dir, &url);
        let http = self.http.clone();

        let handle = tokio::spawn(async move {
            match download_image(&http, &url, &dest).await {
                Ok(()) => info!("Saved QR code to {}", dest.display()),
                Err(e) => warn!("Failed to download {url}: {e:#}"),
            }
        });
        match self.downloads.lock() {
            Ok(mut downloads) => downloads.push(handle),
            Err(poisoned) => poisoned.into_inner().push(handle),
        }
    }
}

impl ImageElement for TerminalImage {
    fn set_src(&self, src: &str) {
        self.slot.set_src(src);
        println!("{QR_IMAGE_ID}: {src}");
        if let Some(dir) = &self.download_dir {
            self.start_download(src, dir);
        }
    }
}

/// Resolves an image source the way the page would, relative to the backend.
pub fn resolve_src(base_url: &Url, src: &str) -> Result<Url> {
    base_url
        .join(src)
        .with_context(|| format!("resolving {src} against {base_url}"))
}

pub fn download_target(dir: &Path, url: &Url) -> PathBuf {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(FALLBACK_FILE_NAME);
    dir.join(name)
}

async fn download_image(http: &Client, url: &Url, dest: &Path) -> Result<()> {
    let response = http.get(url.clone()).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(dest, bytes).await?;
    Ok(())
}

pub struct StderrAlert;

impl AlertSink for StderrAlert {
    fn alert(&self, message: &str) {
        eprintln!("[alert] {message}");
    }
}
