//! Downloader for the MNIST / Fashion-MNIST IDX files
//!
//! Both datasets are published as four gzipped IDX files. They are
//! decompressed on arrival so later loads read the plain files.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use reqwest::Client;
use tracing::{debug, info};

use super::dataset::{DatasetKind, Split};
use crate::error::{Error, Result};

/// HTTP client fetching dataset files from their public mirrors
#[derive(Debug, Clone)]
pub struct DatasetFetcher {
    client: Client,
    base_url: Option<String>,
}

impl Default for DatasetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetFetcher {
    /// Create a fetcher using each dataset's default mirror
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: None,
        }
    }

    /// Create a fetcher that downloads from a custom mirror
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: Some(base_url.trim_end_matches('/').to_string()),
        }
    }

    /// File names making up a dataset, training split first
    pub fn file_names() -> [String; 4] {
        [
            Split::Train.images_file(),
            Split::Train.labels_file(),
            Split::Test.images_file(),
            Split::Test.labels_file(),
        ]
    }

    /// Download all files of `kind` into `dir`
    ///
    /// Files already present (plain or gzipped) are left untouched.
    /// Returns the paths of the files written by this call.
    pub async fn fetch(&self, kind: DatasetKind, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| kind.mirror_url().to_string());

        let mut written = Vec::new();
        for name in Self::file_names() {
            let target = dir.join(&name);
            if target.exists() || super::idx::gz_sibling(&target).exists() {
                debug!("{} already present, skipping", target.display());
                continue;
            }

            let url = format!("{}/{}.gz", base_url, name);
            info!("Downloading {}", url);

            let compressed = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;

            let raw = gunzip(&compressed)?;
            std::fs::write(&target, &raw)?;
            info!("Saved {} ({} bytes)", target.display(), raw.len());
            written.push(target);
        }

        Ok(written)
    }
}

/// Decompress a gzip payload
pub fn gunzip(compressed: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(compressed);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|e| Error::Dataset(format!("failed to decompress download: {}", e)))?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_file_names() {
        let names = DatasetFetcher::file_names();
        assert_eq!(names[0], "train-images-idx3-ubyte");
        assert_eq!(names[3], "t10k-labels-idx1-ubyte");
    }

    #[test]
    fn test_gunzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"idx payload").unwrap();
        let compressed = encoder.finish().unwrap();

        assert_eq!(gunzip(&compressed).unwrap(), b"idx payload");
        assert!(gunzip(b"not gzip").is_err());
    }

    #[tokio::test]
    async fn test_fetch_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in DatasetFetcher::file_names() {
            std::fs::write(dir.path().join(name), b"cached").unwrap();
        }

        // Unroutable mirror: any request would fail
        let fetcher = DatasetFetcher::with_base_url("http://127.0.0.1:9/");
        let written = fetcher.fetch(DatasetKind::Mnist, dir.path()).await.unwrap();
        assert!(written.is_empty());
    }
}
