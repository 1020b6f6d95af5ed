//! Input resolution: turn the job's document list into local PDF paths.
//!
//! Each entry is either a local path or an http(s) URL. URLs are downloaded
//! into one job-scoped [`TempDir`] that lives as long as the [`Documents`]
//! value, so pdfium always gets a real file path and downloads disappear when
//! the job ends. Every file is checked for the `%PDF` magic before extraction
//! so a wrong upload fails early with a readable error.

use crate::error::PodcastError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info};

/// The job's documents as local files, in the caller's order.
#[derive(Debug)]
pub struct Documents {
    paths: Vec<PathBuf>,
    _downloads: Option<TempDir>,
}

impl Documents {
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve every input, preserving order. Fails on the first bad entry.
pub async fn resolve_documents<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Result<Documents, PodcastError> {
    if inputs.is_empty() {
        return Err(PodcastError::InvalidConfig("No documents given".into()));
    }

    let remote = match inputs.iter().map(|i| i.as_ref()).find(|i| is_url(i)) {
        Some(first_url) => {
            let dir = TempDir::new()
                .map_err(|e| PodcastError::Internal(format!("tempdir: {e}")))?;
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .map_err(|e| PodcastError::DownloadFailed {
                    url: first_url.to_string(),
                    reason: e.to_string(),
                })?;
            Some((dir, client))
        }
        None => None,
    };

    let mut paths = Vec::with_capacity(inputs.len());
    for (n, input) in inputs.iter().enumerate() {
        let input = input.as_ref();
        match remote.as_ref().filter(|_| is_url(input)) {
            Some((dir, client)) => {
                let dest = dir.path().join(format!("{n:03}-{}", url_filename(input)));
                download(client, input, &dest, timeout_secs).await?;
                paths.push(dest);
            }
            None => {
                let path = PathBuf::from(input);
                check_local_pdf(&path)?;
                debug!("Resolved local PDF: {}", path.display());
                paths.push(path);
            }
        }
    }

    Ok(Documents {
        paths,
        _downloads: remote.map(|(dir, _)| dir),
    })
}

/// Validate existence, readability and the `%PDF` magic.
fn check_local_pdf(path: &Path) -> Result<(), PodcastError> {
    if !path.exists() {
        return Err(PodcastError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => PodcastError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => PodcastError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let mut magic = [0u8; 4];
    if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
        return Err(PodcastError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout_secs: u64,
) -> Result<(), PodcastError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| PodcastError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PodcastError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(PodcastError::NotAPdf {
            path: dest.to_path_buf(),
            magic,
        });
    }

    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| PodcastError::Internal(format!("Failed to write download: {e}")))?;

    info!("Downloaded {} bytes to {}", bytes.len(), dest.display());
    Ok(())
}

/// Last path segment when it looks like a file name, else `document.pdf`.
fn url_filename(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty() && name.contains('.'))
        .unwrap_or_else(|| "document.pdf".to_string())
}
