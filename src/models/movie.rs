use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::entities::movies;

/// One user's rating of a movie, stored denormalized on the movie record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingEntry {
    pub user_id: String,
    pub score: f64,
    #[serde(default)]
    pub comment: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Catalog movie record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub duration_minutes: Option<i32>,
    pub content_rating: Option<String>,
    pub poster: Option<String>,
    pub video_key: Option<String>,
    pub director: Option<String>,
    pub language: Option<String>,
    pub cast: Vec<String>,
    pub release_date: Option<String>,
    pub featured: bool,
    pub views: i64,
    pub downloads: i64,
    pub ratings: Vec<RatingEntry>,
    pub average_rating: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    pub last_viewed: Option<String>,
    pub last_downloaded: Option<String>,
}

impl From<movies::Model> for Movie {
    fn from(model: movies::Model) -> Self {
        let cast = model
            .cast
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        let ratings = model
            .ratings
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            genre: model.genre,
            year: model.year,
            duration_minutes: model.duration_minutes,
            content_rating: model.content_rating,
            poster: model.poster,
            video_key: model.video_key,
            director: model.director,
            language: model.language,
            cast,
            release_date: model.release_date,
            featured: model.featured,
            views: model.views,
            downloads: model.downloads,
            ratings,
            average_rating: model.average_rating,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_viewed: model.last_viewed,
            last_downloaded: model.last_downloaded,
        }
    }
}

/// Metadata supplied when creating or updating a movie. Asset keys are filled
/// in by the content service after upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub content_rating: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub featured: bool,
    /// External poster URL, used when no poster file is uploaded.
    #[serde(default)]
    pub poster: Option<String>,
    /// External video URL, used when no video file is uploaded.
    #[serde(default)]
    pub video_key: Option<String>,
}

/// Compact movie reference used by the genre_collections side table and
/// denormalized user lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovieSummary {
    pub movie_id: String,
    pub title: String,
    #[serde(default)]
    pub poster: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    Year,
    CreatedAt,
    Views,
    AverageRating,
}

impl Default for SortField {
    fn default() -> Self {
        Self::CreatedAt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Desc
    }
}

/// Catalog query parameters. Filters combine with AND; `cursor` is the id of
/// the last item of the previous page.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub genre: Option<String>,
    pub year: Option<i32>,
    /// Case-sensitive title prefix.
    pub search: Option<String>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub limit: u64,
    pub cursor: Option<String>,
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub movies: Vec<Movie>,
    /// True iff a full page was returned, i.e. more pages may exist.
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Genre with the number of movies carrying it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GenreCount {
    pub id: String,
    pub name: String,
    pub count: u64,
}

impl GenreCount {
    #[must_use]
    pub fn new(name: &str, count: u64) -> Self {
        Self {
            id: name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-"),
            name: name.to_string(),
            count,
        }
    }
}

#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}
