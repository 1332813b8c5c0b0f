//! # pdfium-fetch
//!
//! Locates the PDFium shared library that backs the primary text-extraction
//! engine of `pdf-rulecheck`.
//!
//! The engine's auxiliary binary lives at a fixed release location
//! ([`ASSET_BASE_URL`]) and is never configurable at runtime. Resolution order:
//!
//! 1. `PDF_RULECHECK_PDFIUM_LIB` points at an existing library file.
//! 2. The per-version cache directory already holds the library.
//! 3. The platform archive is downloaded once and unpacked into the cache.
//!
//! The resolved path is memoised for the process lifetime, so only the first
//! caller pays for the file-system probe (or the download).
//!
//! ```rust,no_run
//! let library = pdfium_fetch::ensure_library(None).expect("pdfium unavailable");
//! let pdfium = pdfium_fetch::bind(&library).expect("bind failed");
//! # drop(pdfium);
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Release tag of the bblanchon/pdfium-binaries build we pin to.
pub const PDFIUM_RELEASE: &str = "7690";

/// Fixed network location of the engine archives.
pub const ASSET_BASE_URL: &str = "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Points at an already-installed library; skips cache and download.
pub const LIBRARY_ENV: &str = "PDF_RULECHECK_PDFIUM_LIB";

/// Overrides the cache root directory.
pub const CACHE_ENV: &str = "PDF_RULECHECK_CACHE_DIR";

/// Download progress callback: `(bytes_so_far, total_if_known)`.
pub type ProgressFn<'a> = &'a dyn Fn(u64, Option<u64>);

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("No PDFium build is published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("Cannot prepare cache directory '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Downloading PDFium from '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    #[error("Unpacking PDFium archive failed: {0}")]
    Unpack(String),

    #[error("Cannot load PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Archive layout for one target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Target {
    archive: &'static str,
    member: &'static str,
    file_name: &'static str,
}

impl Target {
    fn current() -> Result<Self, AssetError> {
        Self::for_platform(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn for_platform(os: &str, arch: &str) -> Result<Self, AssetError> {
        let (archive, member, file_name) = match (os, arch) {
            ("linux", "x86_64") => ("pdfium-linux-x64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("linux", "aarch64") => ("pdfium-linux-arm64.tgz", "lib/libpdfium.so", "libpdfium.so"),
            ("macos", "x86_64") => ("pdfium-mac-x64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("macos", "aarch64") => ("pdfium-mac-arm64.tgz", "lib/libpdfium.dylib", "libpdfium.dylib"),
            ("windows", "x86_64") => ("pdfium-win-x64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            ("windows", "aarch64") => ("pdfium-win-arm64.tgz", "bin/pdfium.dll", "pdfium.dll"),
            (os, arch) => {
                return Err(AssetError::UnsupportedPlatform {
                    os: os.to_string(),
                    arch: arch.to_string(),
                })
            }
        };
        Ok(Self {
            archive,
            member,
            file_name,
        })
    }

    fn url(&self) -> String {
        format!("{ASSET_BASE_URL}/chromium%2F{PDFIUM_RELEASE}/{}", self.archive)
    }
}

/// Per-release cache directory, e.g. `~/.cache/pdf-rulecheck/pdfium-7690/`.
pub fn cache_dir() -> PathBuf {
    let root = std::env::var_os(CACHE_ENV)
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join("pdf-rulecheck")))
        .unwrap_or_else(|| std::env::temp_dir().join("pdf-rulecheck"));
    root.join(format!("pdfium-{PDFIUM_RELEASE}"))
}

static RESOLVED: OnceLock<PathBuf> = OnceLock::new();

/// The library path if it can be used without touching the network.
pub fn cached_library() -> Option<PathBuf> {
    if let Some(path) = RESOLVED.get() {
        return Some(path.clone());
    }
    if let Some(path) = env_override() {
        return Some(path);
    }
    let target = Target::current().ok()?;
    let path = cache_dir().join(target.file_name);
    path.exists().then_some(path)
}

/// Resolve the library, downloading it on first use.
///
/// Safe to call from several threads at once; the worst case is two threads
/// racing on the first download, and both end up with the same path.
pub fn ensure_library(on_progress: Option<ProgressFn<'_>>) -> Result<PathBuf, AssetError> {
    if let Some(path) = RESOLVED.get() {
        return Ok(path.clone());
    }
    let path = match cached_library() {
        Some(path) => path,
        None => download_into_cache(on_progress)?,
    };
    let _ = RESOLVED.set(path.clone());
    Ok(path)
}

/// Bind `pdfium-render` to the library at `path`.
pub fn bind(path: &Path) -> Result<Pdfium, AssetError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| AssetError::Bind {
            path: path.to_path_buf(),
            reason: format!("{e:?}"),
        })
}

fn env_override() -> Option<PathBuf> {
    let path = PathBuf::from(std::env::var_os(LIBRARY_ENV)?);
    if path.exists() {
        Some(path)
    } else {
        warn!(
            "{LIBRARY_ENV}='{}' does not exist; falling back to the cache",
            path.display()
        );
        None
    }
}

fn download_into_cache(on_progress: Option<ProgressFn<'_>>) -> Result<PathBuf, AssetError> {
    let target = Target::current()?;
    let dir = cache_dir();
    std::fs::create_dir_all(&dir).map_err(|source| AssetError::CacheDir {
        path: dir.clone(),
        source,
    })?;

    let url = target.url();
    info!("Fetching PDFium engine from {url}");
    let archive = fetch(&url, on_progress)?;

    let dest = dir.join(target.file_name);
    unpack_member(&archive, target.member, &dest)?;
    debug!("PDFium cached at {}", dest.display());
    Ok(dest)
}

fn fetch(url: &str, on_progress: Option<ProgressFn<'_>>) -> Result<Vec<u8>, AssetError> {
    let failed = |reason: String| AssetError::Download {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-fetch/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().map_err(|e| failed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = [0u8; 64 * 1024];
    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                body.extend_from_slice(&chunk[..n]);
                if let Some(report) = on_progress {
                    report(body.len() as u64, total);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(failed(e.to_string())),
        }
    }
    Ok(body)
}

/// Unpack `member` to `dest`. The bytes land in a sibling `.partial` file
/// first and are renamed into place, so `dest` never holds a truncated
/// library.
fn unpack_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), AssetError> {
    let unpack = |e: std::io::Error| AssetError::Unpack(e.to_string());

    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    for entry in tar.entries().map_err(unpack)? {
        let mut entry = entry.map_err(unpack)?;
        if entry.path().map_err(unpack)?.to_string_lossy() != member {
            continue;
        }

        let partial = partial_path(dest);
        let written = entry
            .unpack(&partial)
            .and_then(|_| std::fs::rename(&partial, dest));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&partial);
            return Err(unpack(e));
        }
        return Ok(());
    }
    Err(AssetError::Unpack(format!("'{member}' missing from archive")))
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.partial", std::process::id()));
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_platforms_resolve() {
        let linux = Target::for_platform("linux", "x86_64").unwrap();
        assert_eq!(linux.file_name, "libpdfium.so");
        assert!(linux.url().starts_with(ASSET_BASE_URL));
        assert!(linux.url().ends_with("pdfium-linux-x64.tgz"));

        let mac = Target::for_platform("macos", "aarch64").unwrap();
        assert_eq!(mac.member, "lib/libpdfium.dylib");
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let err = Target::for_platform("plan9", "mips").unwrap_err();
        assert!(err.to_string().contains("plan9/mips"));
    }

    #[test]
    fn cache_dir_is_versioned() {
        let dir = cache_dir();
        assert!(dir.ends_with(format!("pdfium-{PDFIUM_RELEASE}")));
        assert_eq!(dir, cache_dir());
    }

    fn tgz(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        let tar_bytes = builder.into_inner().unwrap();
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        std::io::Write::write_all(&mut gz, &tar_bytes).unwrap();
        gz.finish().unwrap()
    }

    #[test]
    fn unpack_moves_member_into_place() {
        let dir = std::env::temp_dir().join(format!("pdfium-fetch-unpack-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dest = dir.join("libpdfium.so");
        let _ = std::fs::remove_file(&dest);

        let archive = tgz(&[("LICENSE", &b"mit"[..]), ("lib/libpdfium.so", &b"\x7fELF-library"[..])]);
        unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"\x7fELF-library");
        assert!(!partial_path(&dest).exists());
        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn partial_file_is_a_sibling_of_the_target() {
        let dest = Path::new("/cache/pdfium-7690/libpdfium.so");
        let partial = partial_path(dest);
        assert_eq!(partial.parent(), dest.parent());
        assert_ne!(partial, dest);
        assert!(partial.to_string_lossy().ends_with(".partial"));
    }

    #[test]
    fn unpack_reports_missing_member() {
        // gzip of an empty tar stream
        let mut builder = tar::Builder::new(Vec::new());
        builder.finish().unwrap();
        let tar_bytes = builder.into_inner().unwrap();
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
        std::io::Write::write_all(&mut gz, &tar_bytes).unwrap();
        let archive = gz.finish().unwrap();

        let dest = std::env::temp_dir().join("pdfium-fetch-never-written");
        let err = unpack_member(&archive, "lib/libpdfium.so", &dest).unwrap_err();
        assert!(matches!(err, AssetError::Unpack(_)));
        assert!(!dest.exists());
    }
}
