//! Domain service for per-user state: watchlist, history, preferences, profile.

use thiserror::Error;

use crate::models::user::{HistoryEntry, Preferences, User, WatchlistEntry};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Movie not found")]
    MovieNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for LibraryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait LibraryService: Send + Sync {
    /// Adds the movie if absent, removes it if present. Returns the full list
    /// after the toggle.
    async fn toggle_watchlist(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<WatchlistEntry>, LibraryError>;

    async fn watchlist(&self, user_id: &str) -> Result<Vec<WatchlistEntry>, LibraryError>;

    /// Upserts a history entry for the movie (one per movie, latest wins).
    async fn record_watch(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<HistoryEntry>, LibraryError>;

    async fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, LibraryError>;

    /// Shallow-merges the patch into stored preferences and returns the result.
    async fn update_preferences(
        &self,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Preferences, LibraryError>;

    async fn update_profile(&self, user_id: &str, display_name: &str) -> Result<User, LibraryError>;
}
