//! Repository-backed implementation of the `ContentService` trait.
//!
//! Asset cleanup is best-effort: a record write that succeeds is never rolled
//! back because an old file could not be removed. Failures are logged and the
//! orphaned file stays on disk.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, trace, warn};

use crate::db::repositories::{GenreCollectionRepository, MovieRepository, UserRepository};
use crate::models::movie::{Movie, MovieInput, MovieSummary, now_rfc3339};
use crate::models::user::{Role, User};
use crate::services::content_service::{
    ContentError, ContentService, OverviewStats, Upload,
};
use crate::storage::{AssetKind, AssetStore, is_owned_key};

pub struct RepoContentService {
    movies: Arc<dyn MovieRepository>,
    users: Arc<dyn UserRepository>,
    collections: Arc<dyn GenreCollectionRepository>,
    assets: Arc<dyn AssetStore>,
}

impl RepoContentService {
    #[must_use]
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        users: Arc<dyn UserRepository>,
        collections: Arc<dyn GenreCollectionRepository>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            movies,
            users,
            collections,
            assets,
        }
    }

    async fn store_upload(&self, kind: AssetKind, upload: Upload) -> Result<String, ContentError> {
        let total = upload.data.len() as u64;
        self.assets
            .save(kind, &upload.filename, &upload.data, &mut |done, _| {
                trace!(done, total, "Upload progress");
            })
            .await
            .map_err(|e| ContentError::Upload(e.to_string()))
    }

    /// Removes an asset if we own it, logging instead of failing.
    async fn cleanup_asset(&self, reference: Option<&str>) {
        let Some(reference) = reference else { return };
        if !is_owned_key(reference) {
            return;
        }
        if let Err(e) = self.assets.delete(reference).await {
            warn!(key = reference, error = %e, "Asset cleanup failed; leaving orphan");
        }
    }

    fn apply_input(movie: &mut Movie, input: MovieInput) {
        movie.title = input.title;
        movie.description = input.description;
        movie.genre = input.genre;
        movie.year = input.year;
        movie.duration_minutes = input.duration_minutes;
        movie.content_rating = input.content_rating;
        movie.director = input.director;
        movie.language = input.language;
        movie.cast = input.cast;
        movie.release_date = input.release_date;
        movie.featured = input.featured;
        movie.updated_at = now_rfc3339();
    }
}

#[async_trait]
impl ContentService for RepoContentService {
    async fn create_movie(
        &self,
        input: MovieInput,
        poster: Option<Upload>,
        video: Option<Upload>,
    ) -> Result<Movie, ContentError> {
        if input.title.trim().is_empty() {
            return Err(ContentError::Validation("Title is required".to_string()));
        }

        let poster_ref = match poster {
            Some(upload) => Some(self.store_upload(AssetKind::Poster, upload).await?),
            None => input.poster.clone(),
        };
        let video_ref = match video {
            Some(upload) => match self.store_upload(AssetKind::Video, upload).await {
                Ok(key) => Some(key),
                Err(e) => {
                    // Don't leave the poster behind when the video write fails.
                    self.cleanup_asset(poster_ref.as_deref()).await;
                    return Err(e);
                }
            },
            None => input.video_key.clone(),
        };

        let now = now_rfc3339();
        let mut movie = Movie {
            id: uuid::Uuid::new_v4().to_string(),
            title: String::new(),
            description: None,
            genre: None,
            year: None,
            duration_minutes: None,
            content_rating: None,
            poster: poster_ref,
            video_key: video_ref,
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
        };
        Self::apply_input(&mut movie, input);

        self.movies.insert(&movie).await?;
        info!(movie_id = %movie.id, title = %movie.title, "Movie created");
        metrics::counter!("content_movies_created_total").increment(1);
        Ok(movie)
    }

    async fn update_movie(
        &self,
        id: &str,
        input: MovieInput,
        poster: Option<Upload>,
        video: Option<Upload>,
    ) -> Result<Movie, ContentError> {
        if input.title.trim().is_empty() {
            return Err(ContentError::Validation("Title is required".to_string()));
        }
        let mut movie = self
            .movies
            .get(id)
            .await?
            .ok_or(ContentError::MovieNotFound)?;
        let old_poster = movie.poster.clone();
        let old_video = movie.video_key.clone();

        let new_poster = match poster {
            Some(upload) => Some(self.store_upload(AssetKind::Poster, upload).await?),
            None => input.poster.clone().or_else(|| old_poster.clone()),
        };
        let new_video = match video {
            Some(upload) => Some(self.store_upload(AssetKind::Video, upload).await?),
            None => input.video_key.clone().or_else(|| old_video.clone()),
        };

        Self::apply_input(&mut movie, input);
        movie.poster = new_poster;
        movie.video_key = new_video;
        self.movies.update(&movie).await?;

        // Only after the record is safely written do we drop replaced files.
        if old_poster != movie.poster {
            self.cleanup_asset(old_poster.as_deref()).await;
        }
        if old_video != movie.video_key {
            self.cleanup_asset(old_video.as_deref()).await;
        }

        info!(movie_id = %movie.id, "Movie updated");
        Ok(movie)
    }

    async fn delete_movie(&self, id: &str) -> Result<(), ContentError> {
        let movie = self
            .movies
            .get(id)
            .await?
            .ok_or(ContentError::MovieNotFound)?;
        if !self.movies.delete(id).await? {
            return Err(ContentError::MovieNotFound);
        }

        self.cleanup_asset(movie.poster.as_deref()).await;
        self.cleanup_asset(movie.video_key.as_deref()).await;

        info!(movie_id = id, title = %movie.title, "Movie deleted");
        metrics::counter!("content_movies_deleted_total").increment(1);
        Ok(())
    }

    async fn set_role(&self, user_id: &str, role: Role) -> Result<(), ContentError> {
        if self.users.set_role(user_id, role).await? {
            info!(user_id, role = role.as_str(), "Role changed");
            Ok(())
        } else {
            Err(ContentError::UserNotFound)
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, ContentError> {
        Ok(self.users.list().await?)
    }

    async fn overview(&self) -> Result<OverviewStats, ContentError> {
        Ok(OverviewStats {
            movies: self.movies.count().await?,
            users: self.users.count().await?,
            total_views: self.movies.total_views().await?,
        })
    }

    async fn rebuild_genre_collections(&self) -> Result<usize, ContentError> {
        let mut grouped: BTreeMap<String, Vec<MovieSummary>> = BTreeMap::new();
        for (genre, summary) in self.movies.summaries_by_genre().await? {
            grouped.entry(genre).or_default().push(summary);
        }
        let genres = grouped.len();
        self.collections.replace_all(grouped).await?;
        info!(genres, "Genre collections rebuilt");
        Ok(genres)
    }
}
