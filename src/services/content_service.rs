//! Admin-side domain service: movie CRUD with asset uploads, user role
//! management, and the dashboard overview.

use serde::Serialize;
use thiserror::Error;

use crate::models::movie::{Movie, MovieInput};
use crate::models::user::{Role, User};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Movie not found")]
    MovieNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Failed to upload file. Please try again.")]
    Upload(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for ContentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// An uploaded file, already buffered out of the multipart stream.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Dashboard counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OverviewStats {
    pub movies: u64,
    pub users: u64,
    pub total_views: i64,
}

#[async_trait::async_trait]
pub trait ContentService: Send + Sync {
    /// Creates a movie. Uploaded files land in the asset store and their keys
    /// replace any external poster/video URLs from `input`.
    async fn create_movie(
        &self,
        input: MovieInput,
        poster: Option<Upload>,
        video: Option<Upload>,
    ) -> Result<Movie, ContentError>;

    /// Updates metadata and optionally replaces assets. Replaced owned assets
    /// are deleted best-effort; counters and ratings are preserved.
    async fn update_movie(
        &self,
        id: &str,
        input: MovieInput,
        poster: Option<Upload>,
        video: Option<Upload>,
    ) -> Result<Movie, ContentError>;

    /// Deletes the record, then its owned assets best-effort. External URLs
    /// are never touched.
    async fn delete_movie(&self, id: &str) -> Result<(), ContentError>;

    async fn set_role(&self, user_id: &str, role: Role) -> Result<(), ContentError>;

    async fn list_users(&self) -> Result<Vec<User>, ContentError>;

    async fn overview(&self) -> Result<OverviewStats, ContentError>;

    /// Regroups every movie by genre into the similar-movies side table.
    /// Returns the number of genres written.
    async fn rebuild_genre_collections(&self) -> Result<usize, ContentError>;
}
