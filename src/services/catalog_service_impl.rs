//! Repository-backed implementation of the `CatalogService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::db::repositories::{GenreCollectionRepository, MovieRepository};
use crate::models::movie::{
    CatalogPage, CatalogQuery, GenreCount, Movie, MovieSummary, RatingEntry, now_rfc3339,
};
use crate::services::catalog_service::{CatalogError, CatalogService, VideoSource};
use crate::storage::{AssetStore, is_owned_key};

pub struct RepoCatalogService {
    movies: Arc<dyn MovieRepository>,
    collections: Arc<dyn GenreCollectionRepository>,
    assets: Arc<dyn AssetStore>,
    catalog: CatalogConfig,
}

impl RepoCatalogService {
    #[must_use]
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        collections: Arc<dyn GenreCollectionRepository>,
        assets: Arc<dyn AssetStore>,
        catalog: CatalogConfig,
    ) -> Self {
        Self {
            movies,
            collections,
            assets,
            catalog,
        }
    }

    fn clamp_limit(&self, requested: u64) -> u64 {
        if requested == 0 {
            self.catalog.default_page_size
        } else {
            requested.min(self.catalog.max_page_size)
        }
    }
}

#[async_trait]
impl CatalogService for RepoCatalogService {
    async fn browse(&self, mut query: CatalogQuery) -> Result<CatalogPage, CatalogError> {
        query.limit = self.clamp_limit(query.limit);
        if let Some(search) = &query.search
            && search.is_empty()
        {
            query.search = None;
        }

        let movies = self.movies.query(&query).await?;
        // A short page proves there is nothing further; a full page only
        // suggests more, so the last page can come back empty.
        let has_more = movies.len() as u64 == query.limit && query.limit > 0;
        let next_cursor = if has_more {
            movies.last().map(|m| m.id.clone())
        } else {
            None
        };

        debug!(
            returned = movies.len(),
            has_more, "Catalog page served"
        );
        Ok(CatalogPage {
            movies,
            has_more,
            next_cursor,
        })
    }

    async fn get(&self, id: &str) -> Result<Movie, CatalogError> {
        self.movies.get(id).await?.ok_or(CatalogError::NotFound)
    }

    async fn similar(&self, id: &str) -> Result<Vec<MovieSummary>, CatalogError> {
        let movie = self.get(id).await?;
        let Some(genre) = movie.genre else {
            return Ok(Vec::new());
        };

        let mut entries = self.collections.entries_for(&genre).await?;
        entries.retain(|e| e.movie_id != id);
        entries.truncate(self.catalog.similar_limit as usize);
        Ok(entries)
    }

    async fn featured(&self) -> Result<Vec<Movie>, CatalogError> {
        Ok(self.movies.featured(self.catalog.rail_limit).await?)
    }

    async fn trending(&self) -> Result<Vec<Movie>, CatalogError> {
        Ok(self.movies.trending(self.catalog.rail_limit).await?)
    }

    async fn recent(&self) -> Result<Vec<Movie>, CatalogError> {
        Ok(self.movies.recent(self.catalog.rail_limit).await?)
    }

    async fn genres(&self) -> Result<Vec<GenreCount>, CatalogError> {
        Ok(self.movies.genres().await?)
    }

    async fn record_view(&self, id: &str) -> Result<(), CatalogError> {
        if self.movies.record_view(id).await? {
            metrics::counter!("catalog_views_total").increment(1);
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }

    async fn record_download(&self, id: &str) -> Result<(), CatalogError> {
        if self.movies.record_download(id).await? {
            metrics::counter!("catalog_downloads_total").increment(1);
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }

    async fn rate(
        &self,
        id: &str,
        user_id: &str,
        score: f64,
        comment: String,
    ) -> Result<(Vec<RatingEntry>, f64), CatalogError> {
        if !(1.0..=5.0).contains(&score) {
            return Err(CatalogError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let now = now_rfc3339();
        let entry = RatingEntry {
            user_id: user_id.to_string(),
            score,
            comment,
            created_at: now.clone(),
            updated_at: now,
        };
        self.movies
            .upsert_rating(id, entry)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    async fn resolve_video_source(&self, id: &str) -> Result<VideoSource, CatalogError> {
        let movie = self.get(id).await?;
        let Some(reference) = movie.video_key else {
            return Err(CatalogError::NoVideoSource);
        };

        if is_owned_key(&reference) {
            let url = self.assets.issue_download_url(&reference).await?;
            Ok(VideoSource::Issued { url })
        } else {
            Ok(VideoSource::External { url: reference })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::movie::{SortDirection, SortField};
    use crate::services::test_support::{
        FakeAssetStore, FakeGenreCollectionRepository, FakeMovieRepository,
    };

    fn movie(id: &str, title: &str, genre: &str, created_at: &str) -> Movie {
        Movie {
            id: id.to_string(),
            title: title.to_string(),
            description: None,
            genre: Some(genre.to_string()),
            year: Some(2020),
            duration_minutes: None,
            content_rating: None,
            poster: None,
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
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
            last_viewed: None,
            last_downloaded: None,
        }
    }

    fn service(movies: Vec<Movie>) -> (RepoCatalogService, Arc<FakeMovieRepository>) {
        let repo = Arc::new(FakeMovieRepository::with_movies(movies));
        let svc = RepoCatalogService::new(
            repo.clone(),
            Arc::new(FakeGenreCollectionRepository::default()),
            Arc::new(FakeAssetStore::default()),
            CatalogConfig::default(),
        );
        (svc, repo)
    }

    #[tokio::test]
    async fn full_page_reports_has_more_and_cursor() {
        let movies = (0..5)
            .map(|i| movie(&format!("m{i}"), &format!("Movie {i}"), "Drama", "2024-01-01"))
            .collect();
        let (svc, _) = service(movies);

        let page = svc
            .browse(CatalogQuery {
                limit: 3,
                sort_field: SortField::Title,
                sort_direction: SortDirection::Asc,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.movies.len(), 3);
        assert!(page.has_more);
        let cursor = page.next_cursor.clone().unwrap();

        let page2 = svc
            .browse(CatalogQuery {
                limit: 3,
                sort_field: SortField::Title,
                sort_direction: SortDirection::Asc,
                cursor: Some(cursor),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page2.movies.len(), 2);
        assert!(!page2.has_more);
        assert!(page2.next_cursor.is_none());
    }

    #[tokio::test]
    async fn short_page_never_claims_more() {
        let (svc, _) = service(vec![movie("m1", "Solo", "Drama", "2024-01-01")]);
        let page = svc
            .browse(CatalogQuery {
                limit: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn limit_is_clamped_and_defaulted() {
        let movies = (0..60)
            .map(|i| movie(&format!("m{i:03}"), &format!("T{i:03}"), "Drama", "2024-01-01"))
            .collect();
        let (svc, _) = service(movies);
        let cfg = CatalogConfig::default();

        let page = svc.browse(CatalogQuery::default()).await.unwrap();
        assert_eq!(page.movies.len() as u64, cfg.default_page_size);

        let page = svc
            .browse(CatalogQuery {
                limit: 10_000,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.movies.len() as u64, cfg.max_page_size);
    }

    #[tokio::test]
    async fn similar_excludes_the_movie_itself() {
        let repo = Arc::new(FakeMovieRepository::with_movies(vec![movie(
            "m1", "Heat", "Crime", "2024-01-01",
        )]));
        let collections = Arc::new(FakeGenreCollectionRepository::default());
        collections.collections.lock().unwrap().insert(
            "Crime".to_string(),
            vec![
                MovieSummary {
                    movie_id: "m1".into(),
                    title: "Heat".into(),
                    poster: None,
                },
                MovieSummary {
                    movie_id: "m2".into(),
                    title: "Ronin".into(),
                    poster: None,
                },
            ],
        );
        let svc = RepoCatalogService::new(
            repo,
            collections,
            Arc::new(FakeAssetStore::default()),
            CatalogConfig::default(),
        );

        let similar = svc.similar("m1").await.unwrap();
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].movie_id, "m2");
    }

    #[tokio::test]
    async fn rating_replaces_and_recomputes_average() {
        let (svc, _) = service(vec![movie("m1", "Heat", "Crime", "2024-01-01")]);

        svc.rate("m1", "u1", 4.0, String::new()).await.unwrap();
        let (ratings, average) = svc.rate("m1", "u2", 2.0, String::new()).await.unwrap();
        assert_eq!(ratings.len(), 2);
        assert!((average - 3.0).abs() < f64::EPSILON);

        // Same user again replaces rather than appends.
        let (ratings, average) = svc.rate("m1", "u1", 5.0, String::new()).await.unwrap();
        assert_eq!(ratings.len(), 2);
        assert!((average - 3.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn out_of_range_score_is_rejected() {
        let (svc, _) = service(vec![movie("m1", "Heat", "Crime", "2024-01-01")]);
        assert!(matches!(
            svc.rate("m1", "u1", 0.5, String::new()).await,
            Err(CatalogError::Validation(_))
        ));
        assert!(matches!(
            svc.rate("m1", "u1", 5.5, String::new()).await,
            Err(CatalogError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn video_source_distinguishes_owned_and_external() {
        let mut owned = movie("m1", "Heat", "Crime", "2024-01-01");
        owned.video_key = Some("movies/1700000000000-heat.mp4".to_string());
        let mut external = movie("m2", "Ronin", "Crime", "2024-01-01");
        external.video_key = Some("https://cdn.example.com/ronin.mp4".to_string());
        let none = movie("m3", "Blank", "Crime", "2024-01-01");

        let assets = Arc::new(FakeAssetStore::default());
        let svc = RepoCatalogService::new(
            Arc::new(FakeMovieRepository::with_movies(vec![owned, external, none])),
            Arc::new(FakeGenreCollectionRepository::default()),
            assets,
            CatalogConfig::default(),
        );

        assert!(matches!(
            svc.resolve_video_source("m1").await.unwrap(),
            VideoSource::Issued { .. }
        ));
        assert_eq!(
            svc.resolve_video_source("m2").await.unwrap(),
            VideoSource::External {
                url: "https://cdn.example.com/ronin.mp4".to_string()
            }
        );
        assert!(matches!(
            svc.resolve_video_source("m3").await,
            Err(CatalogError::NoVideoSource)
        ));
    }
}
