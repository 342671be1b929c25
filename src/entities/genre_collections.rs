use sea_orm::entity::prelude::*;

/// Precomputed "similar movies" side table, keyed by genre.
///
/// Maintained outside the request path (an admin rebuild or an external batch
/// job); request handlers only ever read it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "genre_collections")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub genre: String,

    /// JSON array of {movie_id, title, poster} summaries.
    pub entries: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
