//! Domain service for browsing the catalog and playback source resolution.

use thiserror::Error;

use crate::models::movie::{CatalogPage, CatalogQuery, GenreCount, Movie, MovieSummary, RatingEntry};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Movie not found")]
    NotFound,

    #[error("Movie has no video source")]
    NoVideoSource,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<crate::storage::StorageError> for CatalogError {
    fn from(err: crate::storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Where a movie's video actually lives, from the player's point of view.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoSource {
    /// Time-limited URL for an asset this deployment stores itself.
    Issued { url: String },
    /// External URL stored verbatim on the record.
    External { url: String },
}

impl VideoSource {
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Issued { url } | Self::External { url } => url,
        }
    }
}

#[async_trait::async_trait]
pub trait CatalogService: Send + Sync {
    /// One page of the catalog. Limits are clamped to the configured maximum;
    /// a zero/omitted limit gets the default page size.
    async fn browse(&self, query: CatalogQuery) -> Result<CatalogPage, CatalogError>;

    async fn get(&self, id: &str) -> Result<Movie, CatalogError>;

    /// Same-genre movies from the side table, excluding the movie itself.
    /// Empty when the movie has no genre or the table has no row for it.
    async fn similar(&self, id: &str) -> Result<Vec<MovieSummary>, CatalogError>;

    async fn featured(&self) -> Result<Vec<Movie>, CatalogError>;

    async fn trending(&self) -> Result<Vec<Movie>, CatalogError>;

    async fn recent(&self) -> Result<Vec<Movie>, CatalogError>;

    async fn genres(&self) -> Result<Vec<GenreCount>, CatalogError>;

    async fn record_view(&self, id: &str) -> Result<(), CatalogError>;

    async fn record_download(&self, id: &str) -> Result<(), CatalogError>;

    /// Insert or replace `user_id`'s rating and return the updated list plus
    /// the recomputed average.
    async fn rate(
        &self,
        id: &str,
        user_id: &str,
        score: f64,
        comment: String,
    ) -> Result<(Vec<RatingEntry>, f64), CatalogError>;

    /// Resolves the playable source for a movie: a fresh time-limited URL for
    /// owned assets, the stored URL verbatim for external references.
    async fn resolve_video_source(&self, id: &str) -> Result<VideoSource, CatalogError>;
}
