//! Storage-boundary traits for the catalog backend.
//!
//! Every stateful component talks to the database through these traits, so the
//! backend is swappable and services can be tested against in-memory fakes.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::movie::{CatalogQuery, GenreCount, Movie, MovieSummary, RatingEntry};
use crate::models::user::{HistoryEntry, Preferences, Role, User, WatchlistEntry};

pub mod collection;
pub mod movie;
pub mod user;

pub use collection::SeaOrmGenreCollectionRepository;
pub use movie::SeaOrmMovieRepository;
pub use user::{NewUser, SeaOrmUserRepository};

#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn insert(&self, movie: &Movie) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Movie>>;

    /// Full-record metadata write. Counters and ratings are not touched; use
    /// the dedicated operations for those.
    async fn update(&self, movie: &Movie) -> Result<()>;

    /// Returns false when no such movie existed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Fetch one page. Returns at most `query.limit` records in the requested
    /// order; the caller derives `has_more`.
    async fn query(&self, query: &CatalogQuery) -> Result<Vec<Movie>>;

    async fn featured(&self, limit: u64) -> Result<Vec<Movie>>;

    async fn trending(&self, limit: u64) -> Result<Vec<Movie>>;

    async fn recent(&self, limit: u64) -> Result<Vec<Movie>>;

    async fn genres(&self) -> Result<Vec<GenreCount>>;

    /// Atomic view counter bump + last_viewed stamp.
    async fn record_view(&self, id: &str) -> Result<bool>;

    /// Atomic download counter bump + last_downloaded stamp.
    async fn record_download(&self, id: &str) -> Result<bool>;

    /// Insert or replace this user's rating and recompute the average, in one
    /// transaction. Returns the new rating list and average.
    async fn upsert_rating(
        &self,
        id: &str,
        entry: RatingEntry,
    ) -> Result<Option<(Vec<RatingEntry>, f64)>>;

    /// Every movie as (genre, summary), for side-table rebuilds.
    async fn summaries_by_genre(&self) -> Result<Vec<(String, MovieSummary)>>;

    async fn count(&self) -> Result<u64>;

    async fn total_views(&self) -> Result<i64>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns None when the email is already taken.
    async fn insert(&self, user: NewUser) -> Result<Option<User>>;

    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// User plus stored password hash, for credential verification.
    async fn get_with_password(&self, email: &str) -> Result<Option<(User, String)>>;

    async fn touch_last_login(&self, id: &str) -> Result<()>;

    /// Atomic watchlist toggle: add if absent, remove if present. Runs inside
    /// a transaction so concurrent toggles cannot duplicate or lose entries.
    async fn toggle_watchlist(
        &self,
        user_id: &str,
        summary: MovieSummary,
    ) -> Result<Option<Vec<WatchlistEntry>>>;

    /// Atomic history upsert: one entry per movie, latest watched_at wins.
    async fn record_history(
        &self,
        user_id: &str,
        summary: MovieSummary,
    ) -> Result<Option<Vec<HistoryEntry>>>;

    /// Shallow-merges `patch` into the stored preferences map.
    async fn merge_preferences(
        &self,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Option<Preferences>>;

    async fn update_display_name(&self, user_id: &str, display_name: &str) -> Result<bool>;

    async fn set_role(&self, user_id: &str, role: Role) -> Result<bool>;

    async fn list(&self) -> Result<Vec<User>>;

    async fn count(&self) -> Result<u64>;
}

#[async_trait]
pub trait GenreCollectionRepository: Send + Sync {
    /// Similar-movies entries for a genre; empty when the side table has no
    /// row for it.
    async fn entries_for(&self, genre: &str) -> Result<Vec<MovieSummary>>;

    /// Replace the whole side table (admin rebuild).
    async fn replace_all(&self, collections: BTreeMap<String, Vec<MovieSummary>>) -> Result<()>;
}
