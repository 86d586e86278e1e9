//! Image store implementations for the CLI
//!
//! Fetchers hand cover URLs to an [`ImageStore`] and record whatever id it
//! returns. The CLI offers two: one that keeps the URL itself as the id,
//! and one that downloads the image into a local directory and returns the
//! file name.

use async_trait::async_trait;
use curio_fetch_core::images::ImageStore;
use log::warn;
use std::path::PathBuf;
use url::Url;

/// Keeps the remote URL as the image id; nothing is downloaded.
pub struct UrlImageStore;

#[async_trait]
impl ImageStore for UrlImageStore {
    async fn store(&self, url: &Url) -> String {
        url.to_string()
    }
}

/// Downloads images into a directory and returns the local file name.
pub struct FileImageStore {
    dir: PathBuf,
}

impl FileImageStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl ImageStore for FileImageStore {
    async fn store(&self, url: &Url) -> String {
        let name = file_name_for(url);
        let path = self.dir.join(&name);

        let bytes = match download(url).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("image download failed for {url}: {err}");
                return String::new();
            }
        };

        if let Err(err) = tokio::fs::create_dir_all(&self.dir).await {
            warn!("could not create image directory: {err}");
            return String::new();
        }
        if let Err(err) = tokio::fs::write(&path, bytes).await {
            warn!("could not write {}: {err}", path.display());
            return String::new();
        }
        name
    }
}

async fn download(url: &Url) -> anyhow::Result<Vec<u8>> {
    let response = reqwest::get(url.clone()).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Flatten the URL path into a safe local file name.
fn file_name_for(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");

    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
