//! Repository-backed implementation of the `LibraryService` trait.
//!
//! Watchlist and history entries are denormalized snapshots of the movie's
//! display fields at write time, so list screens render without joins.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::db::repositories::{MovieRepository, UserRepository};
use crate::models::movie::MovieSummary;
use crate::models::user::{HistoryEntry, Preferences, User, WatchlistEntry};
use crate::services::library_service::{LibraryError, LibraryService};

pub struct RepoLibraryService {
    users: Arc<dyn UserRepository>,
    movies: Arc<dyn MovieRepository>,
}

impl RepoLibraryService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, movies: Arc<dyn MovieRepository>) -> Self {
        Self { users, movies }
    }

    async fn summary_of(&self, movie_id: &str) -> Result<MovieSummary, LibraryError> {
        let movie = self
            .movies
            .get(movie_id)
            .await?
            .ok_or(LibraryError::MovieNotFound)?;
        Ok(MovieSummary {
            movie_id: movie.id,
            title: movie.title,
            poster: movie.poster,
        })
    }

    async fn user(&self, user_id: &str) -> Result<User, LibraryError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(LibraryError::UserNotFound)
    }
}

#[async_trait]
impl LibraryService for RepoLibraryService {
    async fn toggle_watchlist(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<WatchlistEntry>, LibraryError> {
        let summary = self.summary_of(movie_id).await?;
        let list = self
            .users
            .toggle_watchlist(user_id, summary)
            .await?
            .ok_or(LibraryError::UserNotFound)?;
        info!(user_id, movie_id, entries = list.len(), "Watchlist toggled");
        Ok(list)
    }

    async fn watchlist(&self, user_id: &str) -> Result<Vec<WatchlistEntry>, LibraryError> {
        Ok(self.user(user_id).await?.watchlist)
    }

    async fn record_watch(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> Result<Vec<HistoryEntry>, LibraryError> {
        let summary = self.summary_of(movie_id).await?;
        self.users
            .record_history(user_id, summary)
            .await?
            .ok_or(LibraryError::UserNotFound)
    }

    async fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, LibraryError> {
        Ok(self.user(user_id).await?.watch_history)
    }

    async fn update_preferences(
        &self,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Preferences, LibraryError> {
        self.users
            .merge_preferences(user_id, patch)
            .await?
            .ok_or(LibraryError::UserNotFound)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> Result<User, LibraryError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(LibraryError::Validation(
                "Display name cannot be empty".to_string(),
            ));
        }
        if !self.users.update_display_name(user_id, display_name).await? {
            return Err(LibraryError::UserNotFound);
        }
        self.user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::NewUser;
    use crate::models::movie::{Movie, now_rfc3339};
    use crate::models::user::Role;
    use crate::services::test_support::{FakeMovieRepository, FakeUserRepository};

    async fn setup() -> (RepoLibraryService, String) {
        let users = Arc::new(FakeUserRepository::default());
        let created = users
            .insert(NewUser {
                id: "u1".into(),
                email: "a@b.com".into(),
                display_name: "Ada".into(),
                password_hash: "x".into(),
                role: Role::User,
            })
            .await
            .unwrap()
            .unwrap();

        let now = now_rfc3339();
        let movies = Arc::new(FakeMovieRepository::with_movies(vec![Movie {
            id: "m1".into(),
            title: "Heat".into(),
            description: None,
            genre: Some("Crime".into()),
            year: Some(1995),
            duration_minutes: None,
            content_rating: None,
            poster: Some("posters/1-heat.jpg".into()),
            video_key: None,
            director: None,
            language: None,
            cast: Vec::new(),
            release_date: None,
            featured: false,
            views: 0,
            downloads: 0,
            ratings: Vec::new(),
            average_rating: None,
            created_at: now.clone(),
            updated_at: now,
            last_viewed: None,
            last_downloaded: None,
        }]));

        (RepoLibraryService::new(users, movies), created.id)
    }

    #[tokio::test]
    async fn toggle_adds_then_removes() {
        let (svc, user_id) = setup().await;

        let list = svc.toggle_watchlist(&user_id, "m1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Heat");
        assert_eq!(list[0].poster.as_deref(), Some("posters/1-heat.jpg"));

        let list = svc.toggle_watchlist(&user_id, "m1").await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn toggling_unknown_movie_fails() {
        let (svc, user_id) = setup().await;
        assert!(matches!(
            svc.toggle_watchlist(&user_id, "nope").await,
            Err(LibraryError::MovieNotFound)
        ));
    }

    #[tokio::test]
    async fn history_keeps_one_entry_per_movie() {
        let (svc, user_id) = setup().await;

        svc.record_watch(&user_id, "m1").await.unwrap();
        let history = svc.record_watch(&user_id, "m1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movie_id, "m1");
    }

    #[tokio::test]
    async fn preferences_merge_shallowly() {
        let (svc, user_id) = setup().await;

        let mut patch = Preferences::new();
        patch.insert("theme".into(), serde_json::json!("dark"));
        svc.update_preferences(&user_id, patch).await.unwrap();

        let mut patch = Preferences::new();
        patch.insert("volume".into(), serde_json::json!(0.5));
        let prefs = svc.update_preferences(&user_id, patch).await.unwrap();
        assert_eq!(prefs.get("theme"), Some(&serde_json::json!("dark")));
        assert_eq!(prefs.get("volume"), Some(&serde_json::json!(0.5)));
    }

    #[tokio::test]
    async fn empty_display_name_is_rejected() {
        let (svc, user_id) = setup().await;
        assert!(matches!(
            svc.update_profile(&user_id, "   ").await,
            Err(LibraryError::Validation(_))
        ));
        let user = svc.update_profile(&user_id, "Grace").await.unwrap();
        assert_eq!(user.display_name, "Grace");
    }
}
