use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// UUIDv4, assigned on sign-up.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub email: String,

    pub display_name: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// "admin" or "user"
    pub role: String,

    /// JSON object of user preferences.
    pub preferences: Option<String>,

    /// JSON array of watchlist entries: {movie_id, title, poster, added_at}.
    pub watchlist: Option<String>,

    /// JSON array of history entries: {movie_id, title, poster, watched_at}.
    pub watch_history: Option<String>,

    pub created_at: String,

    pub updated_at: String,

    pub last_login: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
