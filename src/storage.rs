//! Audio store: where finished podcasts land and how callers find them again.
//!
//! Each job writes one uniquely named `podcast-XXXXXX.mp3` into the store
//! directory. The returned path is the job's opaque audio handle; a caller
//! (a web front end, the CLI) hands it back to [`AudioStore::resolve`], which
//! only answers for files that really live inside the store.

use crate::error::PodcastError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const PREFIX: &str = "podcast-";
const SUFFIX: &str = ".mp3";

/// A directory of finished MP3 files.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `audio` to a fresh file and return its path.
    ///
    /// The file is created with a unique name and never overwrites another
    /// job's output.
    pub async fn persist(&self, audio: Vec<u8>) -> Result<PathBuf, PodcastError> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || write_unique(&dir, &audio))
            .await
            .map_err(|e| PodcastError::Internal(format!("Audio write task panicked: {e}")))?
    }

    /// Map an audio handle back to a stored file.
    ///
    /// Accepts the path returned by [`persist`](Self::persist) or a bare file
    /// name. Anything that escapes the store directory, or is not one of its
    /// MP3 files, is [`PodcastError::UnknownAudioHandle`].
    pub fn resolve(&self, handle: impl AsRef<Path>) -> Result<PathBuf, PodcastError> {
        let handle = handle.as_ref();
        let unknown = || PodcastError::UnknownAudioHandle {
            handle: handle.display().to_string(),
        };

        let candidate = if handle.components().count() == 1 {
            self.dir.join(handle)
        } else {
            handle.to_path_buf()
        };

        let root = self.dir.canonicalize().map_err(|_| unknown())?;
        let file = candidate.canonicalize().map_err(|_| unknown())?;

        let stored = file.parent() == Some(root.as_path())
            && file.is_file()
            && file
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(SUFFIX));

        if stored {
            Ok(file)
        } else {
            Err(unknown())
        }
    }

    /// Delete stored podcasts last modified more than `ttl` ago.
    ///
    /// Returns the number of files removed. A missing store directory is
    /// simply empty.
    pub fn purge_older_than(&self, ttl: Duration) -> Result<usize, PodcastError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(PodcastError::AudioWriteFailed {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_podcast = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(PREFIX) && n.ends_with(SUFFIX));
            if !is_podcast {
                continue;
            }

            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());

            if age.is_some_and(|age| age > ttl) {
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        debug!("Purged {}", path.display());
                        removed += 1;
                    }
                    Err(e) => warn!("Could not purge {}: {}", path.display(), e),
                }
            }
        }

        if removed > 0 {
            info!("Purged {} podcast(s) from {}", removed, self.dir.display());
        }
        Ok(removed)
    }
}

fn write_unique(dir: &Path, audio: &[u8]) -> Result<PathBuf, PodcastError> {
    let failed = |source: std::io::Error| PodcastError::AudioWriteFailed {
        path: dir.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(dir).map_err(failed)?;

    let mut file = tempfile::Builder::new()
        .prefix(PREFIX)
        .suffix(SUFFIX)
        .tempfile_in(dir)
        .map_err(failed)?;
    file.write_all(audio).map_err(failed)?;
    file.flush().map_err(failed)?;

    let (_, path) = file.keep().map_err(|e| failed(e.error))?;
    info!("Wrote {} bytes to {}", audio.len(), path.display());
    Ok(path)
}
