use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use super::{AssetKind, AssetStore, ProgressFn, StorageError, is_owned_key, sanitize_filename};

const WRITE_CHUNK: usize = 64 * 1024;

struct TokenEntry {
    key: String,
    expires_at: Instant,
}

/// Filesystem-backed asset store rooted at a single directory. Download URLs
/// are opaque random tokens held in memory with an expiry; they do not
/// survive a restart, matching the time-limited links of the original
/// object-storage backend.
pub struct LocalAssetStore {
    root: PathBuf,
    url_ttl: Duration,
    max_upload_bytes: u64,
    tokens: Mutex<HashMap<String, TokenEntry>>,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>, url_ttl: Duration, max_upload_bytes: u64) -> Self {
        Self {
            root: root.into(),
            url_ttl,
            max_upload_bytes,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        if !is_owned_key(key) || key.contains("..") {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    fn random_token() -> String {
        use rand::Rng;

        let mut rng = rand::rng();
        let bytes: [u8; 32] = rng.random();
        bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        })
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn save(
        &self,
        kind: AssetKind,
        filename: &str,
        data: &[u8],
        progress: ProgressFn<'_>,
    ) -> Result<String, StorageError> {
        let total = data.len() as u64;
        if total > self.max_upload_bytes {
            return Err(StorageError::TooLarge {
                size: total,
                limit: self.max_upload_bytes,
            });
        }

        let key = format!(
            "{}/{}-{}",
            kind.prefix(),
            chrono::Utc::now().timestamp_millis(),
            sanitize_filename(filename)
        );
        let path = self.path_for(&key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        let mut written: u64 = 0;
        for chunk in data.chunks(WRITE_CHUNK) {
            file.write_all(chunk).await?;
            written += chunk.len() as u64;
            progress(written, total);
        }
        file.flush().await?;

        debug!(key, bytes = total, "Stored asset");
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn issue_download_url(&self, key: &str) -> Result<String, StorageError> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let token = Self::random_token();
        let now = Instant::now();
        let mut tokens = self.tokens.lock().await;
        tokens.retain(|_, entry| entry.expires_at > now);
        tokens.insert(
            token.clone(),
            TokenEntry {
                key: key.to_string(),
                expires_at: now + self.url_ttl,
            },
        );

        Ok(format!("/api/assets/{token}"))
    }

    async fn resolve_token(&self, token: &str) -> Result<PathBuf, StorageError> {
        let mut tokens = self.tokens.lock().await;
        let Some(entry) = tokens.get(token) else {
            return Err(StorageError::LinkExpired);
        };
        if entry.expires_at <= Instant::now() {
            tokens.remove(token);
            return Err(StorageError::LinkExpired);
        }
        let key = entry.key.clone();
        drop(tokens);

        let path = self.path_for(&key)?;
        if path.exists() {
            Ok(path)
        } else {
            Err(StorageError::NotFound(key))
        }
    }
}

/// Convenience for handlers that need a path without a token round-trip
/// (e.g. internal reads). Kept off the trait so fakes stay small.
impl LocalAssetStore {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> LocalAssetStore {
        LocalAssetStore::new(dir, Duration::from_secs(60), 10 * 1024 * 1024)
    }

    #[tokio::test]
    async fn save_reports_progress_and_prefixes_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut seen = Vec::new();

        let key = store
            .save(
                AssetKind::Poster,
                "cover.jpg",
                &vec![7u8; 100_000],
                &mut |done, total| seen.push((done, total)),
            )
            .await
            .unwrap();

        assert!(key.starts_with("posters/"));
        assert!(key.ends_with("-cover.jpg"));
        assert_eq!(seen.last(), Some(&(100_000, 100_000)));
        assert!(dir.path().join(&key).exists());
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path(), Duration::from_secs(60), 16);

        let err = store
            .save(AssetKind::Video, "big.mp4", &[0u8; 32], &mut |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn download_url_round_trip_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path(), Duration::ZERO, 1024);

        let key = store
            .save(AssetKind::Video, "clip.mp4", b"data", &mut |_, _| {})
            .await
            .unwrap();

        // TTL of zero: the link is already expired when resolved.
        let url = store.issue_download_url(&key).await.unwrap();
        let token = url.rsplit('/').next().unwrap();
        assert!(matches!(
            store.resolve_token(token).await,
            Err(StorageError::LinkExpired)
        ));

        let live = self::store(dir.path());
        let url = live.issue_download_url(&key).await.unwrap();
        let token = url.rsplit('/').next().unwrap();
        let path = live.resolve_token(token).await.unwrap();
        assert_eq!(tokio::fs::read(path).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn delete_missing_asset_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.delete("posters/123-gone.jpg").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
