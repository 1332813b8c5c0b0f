//! Upload storage: every accepted file lands under a fresh name.
//!
//! Names look like `1718000000000-1a2b3c4d-Annual_Report.pdf`: millisecond
//! timestamp, eight hex digits of a v4 UUID, then the client's file name with
//! whitespace runs turned into `_`. Files are opened with `create_new`, so an
//! existing upload is never replaced.

use crate::error::RuleCheckError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A file written by [`UploadStore::store`].
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Name on disk (not the client's name).
    pub filename: String,
    pub path: PathBuf,
}

/// Append-only directory of uploaded documents.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Use `dir`, creating it if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RuleCheckError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| RuleCheckError::UploadWriteFailed {
                path: dir.clone(),
                source,
            })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `bytes` under a unique name derived from `original_name`.
    pub async fn store(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredUpload, RuleCheckError> {
        let filename = unique_name(original_name);
        let path = self.dir.join(&filename);
        let failed = |source| RuleCheckError::UploadWriteFailed {
            path: path.clone(),
            source,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(failed)?;
        file.write_all(bytes).await.map_err(failed)?;
        file.flush().await.map_err(failed)?;

        debug!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(StoredUpload { filename, path })
    }
}

fn unique_name(original_name: &str) -> String {
    let tag = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        chrono::Utc::now().timestamp_millis(),
        &tag[..8],
        sanitize(original_name)
    )
}

/// Last path component of a client-supplied name, whitespace runs → `_`.
pub fn sanitize(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return "upload.pdf".to_string();
    }
    WHITESPACE.replace_all(base, "_").into_owned()
}
