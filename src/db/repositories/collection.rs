use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, Set, TransactionTrait};

use crate::db::repositories::GenreCollectionRepository;
use crate::entities::genre_collections;
use crate::models::movie::{MovieSummary, now_rfc3339};

pub struct SeaOrmGenreCollectionRepository {
    conn: DatabaseConnection,
}

impl SeaOrmGenreCollectionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl GenreCollectionRepository for SeaOrmGenreCollectionRepository {
    async fn entries_for(&self, genre: &str) -> Result<Vec<MovieSummary>> {
        let row = genre_collections::Entity::find_by_id(genre)
            .one(&self.conn)
            .await
            .context("Failed to query genre collection")?;

        Ok(row
            .and_then(|r| serde_json::from_str(&r.entries).ok())
            .unwrap_or_default())
    }

    async fn replace_all(&self, collections: BTreeMap<String, Vec<MovieSummary>>) -> Result<()> {
        let txn = self.conn.begin().await?;

        genre_collections::Entity::delete_many()
            .exec(&txn)
            .await
            .context("Failed to clear genre collections")?;

        let now = now_rfc3339();
        let models: Vec<genre_collections::ActiveModel> = collections
            .into_iter()
            .map(|(genre, entries)| {
                Ok(genre_collections::ActiveModel {
                    genre: Set(genre),
                    entries: Set(serde_json::to_string(&entries)
                        .context("Failed to encode collection entries")?),
                    updated_at: Set(now.clone()),
                })
            })
            .collect::<Result<_>>()?;

        if !models.is_empty() {
            genre_collections::Entity::insert_many(models)
                .exec(&txn)
                .await
                .context("Failed to write genre collections")?;
        }

        txn.commit().await?;
        Ok(())
    }
}
