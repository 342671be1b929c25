//! In-memory repository and store fakes for service unit tests.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use crate::db::repositories::{
    GenreCollectionRepository, MovieRepository, NewUser, UserRepository,
};
use crate::models::movie::{
    CatalogQuery, GenreCount, Movie, MovieSummary, RatingEntry, SortDirection, SortField,
    now_rfc3339,
};
use crate::models::user::{HistoryEntry, Preferences, Role, User, WatchlistEntry};
use crate::storage::{AssetKind, AssetStore, ProgressFn, StorageError, sanitize_filename};

#[derive(Default)]
pub struct FakeUserRepository {
    // id -> (user, password hash)
    users: Mutex<HashMap<String, (User, String)>>,
}

#[async_trait]
impl UserRepository for FakeUserRepository {
    async fn insert(&self, new: NewUser) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|(u, _)| u.email == new.email) {
            return Ok(None);
        }
        let now = now_rfc3339();
        let user = User {
            id: new.id.clone(),
            email: new.email,
            display_name: new.display_name,
            role: new.role,
            preferences: Preferences::new(),
            watchlist: Vec::new(),
            watch_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            last_login: None,
        };
        users.insert(new.id, (user.clone(), new.password_hash));
        Ok(Some(user))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.lock().unwrap().get(id).map(|(u, _)| u.clone()))
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn get_with_password(&self, email: &str) -> Result<Option<(User, String)>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|(u, _)| u.email == email)
            .map(|(u, h)| (u.clone(), h.clone())))
    }

    async fn touch_last_login(&self, id: &str) -> Result<()> {
        if let Some((u, _)) = self.users.lock().unwrap().get_mut(id) {
            u.last_login = Some(now_rfc3339());
        }
        Ok(())
    }

    async fn toggle_watchlist(
        &self,
        user_id: &str,
        summary: MovieSummary,
    ) -> Result<Option<Vec<WatchlistEntry>>> {
        let mut users = self.users.lock().unwrap();
        let Some((u, _)) = users.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(pos) = u.watchlist.iter().position(|e| e.movie_id == summary.movie_id) {
            u.watchlist.remove(pos);
        } else {
            u.watchlist.push(WatchlistEntry {
                movie_id: summary.movie_id,
                title: summary.title,
                poster: summary.poster,
                added_at: now_rfc3339(),
            });
        }
        Ok(Some(u.watchlist.clone()))
    }

    async fn record_history(
        &self,
        user_id: &str,
        summary: MovieSummary,
    ) -> Result<Option<Vec<HistoryEntry>>> {
        let mut users = self.users.lock().unwrap();
        let Some((u, _)) = users.get_mut(user_id) else {
            return Ok(None);
        };
        u.watch_history.retain(|e| e.movie_id != summary.movie_id);
        u.watch_history.push(HistoryEntry {
            movie_id: summary.movie_id,
            title: summary.title,
            poster: summary.poster,
            watched_at: now_rfc3339(),
        });
        Ok(Some(u.watch_history.clone()))
    }

    async fn merge_preferences(
        &self,
        user_id: &str,
        patch: Preferences,
    ) -> Result<Option<Preferences>> {
        let mut users = self.users.lock().unwrap();
        let Some((u, _)) = users.get_mut(user_id) else {
            return Ok(None);
        };
        u.preferences.extend(patch);
        Ok(Some(u.preferences.clone()))
    }

    async fn update_display_name(&self, user_id: &str, display_name: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(user_id) {
            Some((u, _)) => {
                u.display_name = display_name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_role(&self, user_id: &str, role: Role) -> Result<bool> {
        let mut users = self.users.lock().unwrap();
        match users.get_mut(user_id) {
            Some((u, _)) => {
                u.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<User>> {
        let mut all: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .values()
            .map(|(u, _)| u.clone())
            .collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(all)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.lock().unwrap().len() as u64)
    }
}

#[derive(Default)]
pub struct FakeMovieRepository {
    movies: Mutex<Vec<Movie>>,
}

impl FakeMovieRepository {
    pub fn with_movies(movies: Vec<Movie>) -> Self {
        Self {
            movies: Mutex::new(movies),
        }
    }

    fn sorted_filtered(&self, query: &CatalogQuery) -> Vec<Movie> {
        let mut out: Vec<Movie> = self
            .movies
            .lock()
            .unwrap()
            .iter()
            .filter(|m| query.genre.as_ref().is_none_or(|g| m.genre.as_deref() == Some(g)))
            .filter(|m| query.year.is_none_or(|y| m.year == Some(y)))
            .filter(|m| {
                query
                    .search
                    .as_ref()
                    .is_none_or(|q| m.title.starts_with(q.as_str()))
            })
            .filter(|m| match query.sort_field {
                SortField::Year => m.year.is_some(),
                SortField::AverageRating => m.average_rating.is_some(),
                _ => true,
            })
            .cloned()
            .collect();

        out.sort_by(|a, b| {
            let ord = match query.sort_field {
                SortField::Title => a.title.cmp(&b.title),
                SortField::Year => a.year.cmp(&b.year),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::Views => a.views.cmp(&b.views),
                SortField::AverageRating => a
                    .average_rating
                    .partial_cmp(&b.average_rating)
                    .unwrap_or(std::cmp::Ordering::Equal),
            }
            .then_with(|| a.id.cmp(&b.id));
            match query.sort_direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        out
    }
}

#[async_trait]
impl MovieRepository for FakeMovieRepository {
    async fn insert(&self, movie: &Movie) -> Result<()> {
        self.movies.lock().unwrap().push(movie.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Movie>> {
        Ok(self
            .movies
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn update(&self, movie: &Movie) -> Result<()> {
        let mut movies = self.movies.lock().unwrap();
        if let Some(existing) = movies.iter_mut().find(|m| m.id == movie.id) {
            *existing = movie.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut movies = self.movies.lock().unwrap();
        let before = movies.len();
        movies.retain(|m| m.id != id);
        Ok(movies.len() < before)
    }

    async fn query(&self, query: &CatalogQuery) -> Result<Vec<Movie>> {
        let all = self.sorted_filtered(query);
        let start = match &query.cursor {
            Some(cursor) => all
                .iter()
                .position(|m| &m.id == cursor)
                .map_or(0, |i| i + 1),
            None => 0,
        };
        Ok(all
            .into_iter()
            .skip(start)
            .take(query.limit as usize)
            .collect())
    }

    async fn featured(&self, limit: u64) -> Result<Vec<Movie>> {
        Ok(self
            .movies
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.featured)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn trending(&self, limit: u64) -> Result<Vec<Movie>> {
        let mut all = self.movies.lock().unwrap().clone();
        all.sort_by(|a, b| b.views.cmp(&a.views));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn recent(&self, limit: u64) -> Result<Vec<Movie>> {
        let mut all = self.movies.lock().unwrap().clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn genres(&self) -> Result<Vec<GenreCount>> {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for m in self.movies.lock().unwrap().iter() {
            if let Some(g) = &m.genre {
                *counts.entry(g.clone()).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(name, count)| GenreCount::new(&name, count))
            .collect())
    }

    async fn record_view(&self, id: &str) -> Result<bool> {
        let mut movies = self.movies.lock().unwrap();
        match movies.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.views += 1;
                m.last_viewed = Some(now_rfc3339());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_download(&self, id: &str) -> Result<bool> {
        let mut movies = self.movies.lock().unwrap();
        match movies.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.downloads += 1;
                m.last_downloaded = Some(now_rfc3339());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_rating(
        &self,
        id: &str,
        entry: RatingEntry,
    ) -> Result<Option<(Vec<RatingEntry>, f64)>> {
        let mut movies = self.movies.lock().unwrap();
        let Some(m) = movies.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        m.ratings.retain(|r| r.user_id != entry.user_id);
        m.ratings.push(entry);
        let average =
            m.ratings.iter().map(|r| r.score).sum::<f64>() / m.ratings.len() as f64;
        m.average_rating = Some(average);
        Ok(Some((m.ratings.clone(), average)))
    }

    async fn summaries_by_genre(&self) -> Result<Vec<(String, MovieSummary)>> {
        Ok(self
            .movies
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| {
                m.genre.clone().map(|g| {
                    (
                        g,
                        MovieSummary {
                            movie_id: m.id.clone(),
                            title: m.title.clone(),
                            poster: m.poster.clone(),
                        },
                    )
                })
            })
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.movies.lock().unwrap().len() as u64)
    }

    async fn total_views(&self) -> Result<i64> {
        Ok(self.movies.lock().unwrap().iter().map(|m| m.views).sum())
    }
}

#[derive(Default)]
pub struct FakeGenreCollectionRepository {
    pub collections: Mutex<BTreeMap<String, Vec<MovieSummary>>>,
}

#[async_trait]
impl GenreCollectionRepository for FakeGenreCollectionRepository {
    async fn entries_for(&self, genre: &str) -> Result<Vec<MovieSummary>> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(genre)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_all(&self, collections: BTreeMap<String, Vec<MovieSummary>>) -> Result<()> {
        *self.collections.lock().unwrap() = collections;
        Ok(())
    }
}

/// Asset store fake. Saved keys are deterministic (`<prefix>/<seq>-<name>`)
/// and deletions are recorded so tests can assert on cleanup behavior.
#[derive(Default)]
pub struct FakeAssetStore {
    seq: AtomicU64,
    pub saved: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub fail_saves: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl AssetStore for FakeAssetStore {
    async fn save(
        &self,
        kind: AssetKind,
        filename: &str,
        data: &[u8],
        progress: ProgressFn<'_>,
    ) -> Result<String, StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}/{}-{}", kind.prefix(), seq, sanitize_filename(filename));
        progress(data.len() as u64, data.len() as u64);
        self.saved.lock().unwrap().push(key.clone());
        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.deleted.lock().unwrap().push(key.to_string());
        if self.saved.lock().unwrap().iter().any(|k| k == key) {
            Ok(())
        } else {
            Err(StorageError::NotFound(key.to_string()))
        }
    }

    async fn issue_download_url(&self, key: &str) -> Result<String, StorageError> {
        Ok(format!("/api/assets/token-for-{}", key.replace('/', "_")))
    }

    async fn resolve_token(&self, _token: &str) -> Result<PathBuf, StorageError> {
        Err(StorageError::LinkExpired)
    }
}
