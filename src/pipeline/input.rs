//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Both extraction engines work on byte slices, so there is no temp file to
//! manage; URL inputs are downloaded straight into a buffer. Validation of
//! the PDF structure is left to the engines, which report it as a normal
//! extraction failure.

use crate::error::RuleCheckError;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// A document held in memory together with a display name.
#[derive(Debug, Clone)]
pub struct LoadedPdf {
    /// File name for reports (last path or URL segment).
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the input string as a local file or an HTTP(S) download.
pub async fn load_pdf(input: &str, timeout_secs: u64) -> Result<LoadedPdf, RuleCheckError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

async fn read_local(path: &Path) -> Result<LoadedPdf, RuleCheckError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RuleCheckError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => RuleCheckError::InvalidInput {
            reason: format!("cannot read '{}': {e}", path.display()),
        },
    })?;

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(LoadedPdf {
        name: file_name_of(path),
        bytes,
    })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedPdf, RuleCheckError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| RuleCheckError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            RuleCheckError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(classify)?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(classify)?;
    info!("Downloaded {} bytes", bytes.len());

    Ok(LoadedPdf {
        name: file_name_from_url(url),
        bytes: bytes.to_vec(),
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}

/// Last non-empty URL path segment, or `downloaded.pdf`.
fn file_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn url_file_names() {
        assert_eq!(file_name_from_url("https://x.org/a/b/report.pdf"), "report.pdf");
        assert_eq!(file_name_from_url("https://x.org/"), "downloaded.pdf");
        assert_eq!(file_name_from_url("not a url"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_input_error() {
        let err = load_pdf("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, RuleCheckError::InputNotFound { .. }));
        assert!(err.is_input_error());
    }

    #[tokio::test]
    async fn local_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.5").unwrap();

        let loaded = load_pdf(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(loaded.name, "doc.pdf");
        assert_eq!(loaded.bytes, b"%PDF-1.5");
    }
}
