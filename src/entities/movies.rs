use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "movies")]
pub struct Model {
    /// UUIDv4, assigned on creation.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub year: Option<i32>,
    pub duration_minutes: Option<i32>,
    /// Content rating label ("PG-13", "R", ...).
    pub content_rating: Option<String>,
    /// Either an owned storage key ("posters/...") or an external URL.
    pub poster: Option<String>,
    /// Either an owned storage key ("movies/...") or an external URL.
    pub video_key: Option<String>,
    pub director: Option<String>,
    pub language: Option<String>,
    /// JSON array of cast member names.
    pub cast: Option<String>,
    pub release_date: Option<String>,
    pub featured: bool,
    pub views: i64,
    pub downloads: i64,
    /// JSON array of rating entries: {user_id, score, comment, created_at, updated_at}.
    pub ratings: Option<String>,
    pub average_rating: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
    pub last_viewed: Option<String>,
    pub last_downloaded: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
