//! Object storage boundary for poster images and video files.
//!
//! Assets are addressed by keys like `posters/1700000000000-cover.jpg`;
//! anything that is not such a key (an `http(s)://` URL) is an external
//! reference this store never touches.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub mod local;

pub use local::LocalAssetStore;

/// Path prefix for poster image uploads.
pub const POSTER_PREFIX: &str = "posters";
/// Path prefix for video file uploads.
pub const VIDEO_PREFIX: &str = "movies";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Poster,
    Video,
}

impl AssetKind {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Poster => POSTER_PREFIX,
            Self::Video => VIDEO_PREFIX,
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Invalid asset key: {0}")]
    InvalidKey(String),

    #[error("Download link expired or unknown")]
    LinkExpired,

    #[error("Upload too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Upload progress callback: (bytes written, total bytes).
pub type ProgressFn<'a> = &'a mut (dyn FnMut(u64, u64) + Send);

/// Returns true when `reference` is a key this store owns, as opposed to an
/// external URL that must be left untouched on update/delete.
#[must_use]
pub fn is_owned_key(reference: &str) -> bool {
    !reference.contains("://")
        && (reference.starts_with(&format!("{POSTER_PREFIX}/"))
            || reference.starts_with(&format!("{VIDEO_PREFIX}/")))
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Stores `data` under `<kind prefix>/<timestamp>-<sanitized filename>`
    /// and returns the key. `progress` is invoked as bytes land; uploads are
    /// not resumable.
    async fn save(
        &self,
        kind: AssetKind,
        filename: &str,
        data: &[u8],
        progress: ProgressFn<'_>,
    ) -> Result<String, StorageError>;

    /// Removes the asset. Missing assets are reported as [`StorageError::NotFound`];
    /// callers doing cleanup treat that as best-effort.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Issues a time-limited download URL path for an owned key.
    async fn issue_download_url(&self, key: &str) -> Result<String, StorageError>;

    /// Resolves a download token back to an on-disk path, enforcing expiry.
    async fn resolve_token(&self, token: &str) -> Result<PathBuf, StorageError>;
}

/// Strips directory components and shell-hostile characters from an uploaded
/// filename before it becomes part of a storage key.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload.bin".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_key_detection() {
        assert!(is_owned_key("posters/1700000000000-cover.jpg"));
        assert!(is_owned_key("movies/1700000000000-film.mp4"));
        assert!(!is_owned_key("https://example.com/poster.jpg"));
        assert!(!is_owned_key("other/file.bin"));
    }

    #[test]
    fn filename_sanitization() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my movie (1).mp4"), "my_movie__1_.mp4");
        assert_eq!(sanitize_filename("..."), "upload.bin");
    }
}
