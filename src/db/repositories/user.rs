use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::db::repositories::UserRepository;
use crate::entities::users;
use crate::models::movie::{MovieSummary, now_rfc3339};
use crate::models::user::{HistoryEntry, Preferences, Role, User, WatchlistEntry};

/// Fields needed to create an account. The hash is produced by the auth
/// service; this layer never sees plaintext passwords.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: Role,
}

pub struct SeaOrmUserRepository {
    conn: DatabaseConnection,
}

impl SeaOrmUserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn insert(&self, user: NewUser) -> Result<Option<User>> {
        let txn = self.conn.begin().await?;

        let taken = users::Entity::find()
            .filter(users::Column::Email.eq(user.email.clone()))
            .one(&txn)
            .await
            .context("Failed to check email uniqueness")?
            .is_some();
        if taken {
            txn.rollback().await.ok();
            return Ok(None);
        }

        let now = now_rfc3339();
        let model = users::ActiveModel {
            id: Set(user.id),
            email: Set(user.email),
            display_name: Set(user.display_name),
            password_hash: Set(user.password_hash),
            role: Set(user.role.as_str().to_string()),
            preferences: Set(Some("{}".to_string())),
            watchlist: Set(Some("[]".to_string())),
            watch_history: Set(Some("[]".to_string())),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            last_login: Set(Some(now)),
        }
        .insert(&txn)
        .await
        .context("Failed to insert user")?;

        txn.commit().await?;
        Ok(Some(User::from(model)))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let model = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by id")?;
        Ok(model.map(User::from))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;
        Ok(model.map(User::from))
    }

    async fn get_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for credential check")?;

        Ok(model.map(|m| {
            let hash = m.password_hash.clone();
            (User::from(m), hash)
        }))
    }

    async fn touch_last_login(&self, id: &str) -> Result<()> {
        let Some(model) = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to load user for login stamp")?
        else {
            return Ok(());
        };

        let mut active: users::ActiveModel = model.into();
        active.last_login = Set(Some(now_rfc3339()));
        active.update(&self.conn).await?;
        Ok(())
    }

    async fn toggle_watchlist(
        &self,
        user_id: &str,
        summary: MovieSummary,
    ) -> Result<Option<Vec<WatchlistEntry>>> {
        let txn = self.conn.begin().await?;

        let Some(model) = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .context("Failed to load user for watchlist toggle")?
        else {
            txn.rollback().await.ok();
            return Ok(None);
        };

        let mut watchlist: Vec<WatchlistEntry> = model
            .watchlist
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        if watchlist.iter().any(|e| e.movie_id == summary.movie_id) {
            watchlist.retain(|e| e.movie_id != summary.movie_id);
        } else {
            watchlist.push(WatchlistEntry {
                movie_id: summary.movie_id,
                title: summary.title,
                poster: summary.poster,
                added_at: now_rfc3339(),
            });
        }

        let encoded =
            serde_json::to_string(&watchlist).context("Failed to encode watchlist")?;
        let mut active: users::ActiveModel = model.into();
        active.watchlist = Set(Some(encoded));
        active.updated_at = Set(now_rfc3339());
        active.update(&txn).await.context("Failed to save watchlist")?;

        txn.commit().await?;
        Ok(Some(watchlist))
    }

    async fn record_history(
        &self,
        user_id: &str,
        summary: MovieSummary,
    ) -> Result<Option<Vec<HistoryEntry>>> {
        let txn = self.conn.begin().await?;

        let Some(model) = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .context("Failed to load user for history update")?
        else {
            txn.rollback().await.ok();
            return Ok(None);
        };

        let mut history: Vec<HistoryEntry> = model
            .watch_history
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        // One entry per movie, latest watch wins.
        history.retain(|e| e.movie_id != summary.movie_id);
        history.push(HistoryEntry {
            movie_id: summary.movie_id,
            title: summary.title,
            poster: summary.poster,
            watched_at: now_rfc3339(),
        });

        let encoded = serde_json::to_string(&history).context("Failed to encode history")?;
        let mut active: users::ActiveModel = model.into();
        active.watch_history = Set(Some(encoded));
        active.updated_at = Set(now_rfc3339());
        active.update(&txn).await.context("Failed to save history")?;

        txn.commit().await?;
        Ok(Some(history))
    }

    async fn merge_preferences(
        &self,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Option<Preferences>> {
        let txn = self.conn.begin().await?;

        let Some(model) = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .context("Failed to load user for preferences update")?
        else {
            txn.rollback().await.ok();
            return Ok(None);
        };

        let mut preferences: Preferences = model
            .preferences
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        preferences.extend(patch);

        let encoded =
            serde_json::to_string(&preferences).context("Failed to encode preferences")?;
        let mut active: users::ActiveModel = model.into();
        active.preferences = Set(Some(encoded));
        active.updated_at = Set(now_rfc3339());
        active
            .update(&txn)
            .await
            .context("Failed to save preferences")?;

        txn.commit().await?;
        Ok(Some(preferences))
    }

    async fn update_display_name(&self, user_id: &str, display_name: &str) -> Result<bool> {
        let Some(model) = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to load user for profile update")?
        else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = model.into();
        active.display_name = Set(display_name.to_string());
        active.updated_at = Set(now_rfc3339());
        active.update(&self.conn).await?;
        Ok(true)
    }

    async fn set_role(&self, user_id: &str, role: Role) -> Result<bool> {
        let Some(model) = users::Entity::find_by_id(user_id)
            .one(&self.conn)
            .await
            .context("Failed to load user for role change")?
        else {
            return Ok(false);
        };

        let mut active: users::ActiveModel = model.into();
        active.role = Set(role.as_str().to_string());
        active.updated_at = Set(now_rfc3339());
        active.update(&self.conn).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by(users::Column::CreatedAt, Order::Asc)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn count(&self) -> Result<u64> {
        let count = users::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count users")?;
        Ok(count)
    }
}
