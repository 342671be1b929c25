use anyhow::{Context, Result};
use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, FromQueryResult,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, Value,
};

use crate::db::repositories::MovieRepository;
use crate::entities::movies;
use crate::models::movie::{
    CatalogQuery, GenreCount, Movie, MovieSummary, RatingEntry, SortDirection, SortField,
    now_rfc3339,
};

/// Upper bound for title prefix scans; everything that starts with the prefix
/// sorts below `prefix + U+F8FF`.
const PREFIX_SENTINEL: char = '\u{f8ff}';

pub struct SeaOrmMovieRepository {
    conn: DatabaseConnection,
}

impl SeaOrmMovieRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

const fn sort_column(field: SortField) -> (movies::Column, bool) {
    match field {
        SortField::Title => (movies::Column::Title, false),
        SortField::Year => (movies::Column::Year, true),
        SortField::CreatedAt => (movies::Column::CreatedAt, false),
        SortField::Views => (movies::Column::Views, false),
        SortField::AverageRating => (movies::Column::AverageRating, true),
    }
}

/// Sort-key value of a row, for keyset pagination. None when the row has no
/// value for a nullable sort column.
fn sort_key_value(field: SortField, row: &movies::Model) -> Option<Value> {
    match field {
        SortField::Title => Some(row.title.clone().into()),
        SortField::Year => row.year.map(Value::from),
        SortField::CreatedAt => Some(row.created_at.clone().into()),
        SortField::Views => Some(row.views.into()),
        SortField::AverageRating => row.average_rating.map(Value::from),
    }
}

fn to_active(movie: &Movie) -> Result<movies::ActiveModel> {
    Ok(movies::ActiveModel {
        id: Set(movie.id.clone()),
        title: Set(movie.title.clone()),
        description: Set(movie.description.clone()),
        genre: Set(movie.genre.clone()),
        year: Set(movie.year),
        duration_minutes: Set(movie.duration_minutes),
        content_rating: Set(movie.content_rating.clone()),
        poster: Set(movie.poster.clone()),
        video_key: Set(movie.video_key.clone()),
        director: Set(movie.director.clone()),
        language: Set(movie.language.clone()),
        cast: Set(Some(
            serde_json::to_string(&movie.cast).context("Failed to encode cast list")?,
        )),
        release_date: Set(movie.release_date.clone()),
        featured: Set(movie.featured),
        views: Set(movie.views),
        downloads: Set(movie.downloads),
        ratings: Set(Some(
            serde_json::to_string(&movie.ratings).context("Failed to encode ratings")?,
        )),
        average_rating: Set(movie.average_rating),
        created_at: Set(movie.created_at.clone()),
        updated_at: Set(movie.updated_at.clone()),
        last_viewed: Set(movie.last_viewed.clone()),
        last_downloaded: Set(movie.last_downloaded.clone()),
    })
}

#[async_trait]
impl MovieRepository for SeaOrmMovieRepository {
    async fn insert(&self, movie: &Movie) -> Result<()> {
        to_active(movie)?
            .insert(&self.conn)
            .await
            .context("Failed to insert movie")?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Movie>> {
        let model = movies::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query movie by id")?;
        Ok(model.map(Movie::from))
    }

    async fn update(&self, movie: &Movie) -> Result<()> {
        to_active(movie)?
            .update(&self.conn)
            .await
            .context("Failed to update movie")?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = movies::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete movie")?;
        Ok(result.rows_affected > 0)
    }

    async fn query(&self, query: &CatalogQuery) -> Result<Vec<Movie>> {
        let (sort_col, nullable) = sort_column(query.sort_field);
        let order = match query.sort_direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };

        let mut cond = Condition::all();
        if let Some(genre) = &query.genre {
            cond = cond.add(movies::Column::Genre.eq(genre.clone()));
        }
        if let Some(year) = query.year {
            cond = cond.add(movies::Column::Year.eq(year));
        }
        if let Some(prefix) = &query.search {
            cond = cond.add(movies::Column::Title.gte(prefix.clone()));
            cond = cond.add(movies::Column::Title.lte(format!("{prefix}{PREFIX_SENTINEL}")));
        }
        // Rows with no value for the sort key fall out of the ordering,
        // matching the document store's behavior for missing fields.
        if nullable {
            cond = cond.add(sort_col.is_not_null());
        }

        // Keyset continuation from the cursor row. A cursor whose row has
        // been deleted (or lacks the sort key) restarts from the beginning.
        if let Some(cursor_id) = &query.cursor {
            let cursor_row = movies::Entity::find_by_id(cursor_id.clone())
                .one(&self.conn)
                .await
                .context("Failed to resolve pagination cursor")?;
            if let Some(row) = cursor_row {
                if let Some(key) = sort_key_value(query.sort_field, &row) {
                    let cols = Expr::tuple([
                        Expr::col(sort_col).into(),
                        Expr::col(movies::Column::Id).into(),
                    ]);
                    let vals =
                        Expr::tuple([Expr::val(key).into(), Expr::val(row.id.clone()).into()]);
                    let cmp = match query.sort_direction {
                        SortDirection::Asc => cols.gt(vals),
                        SortDirection::Desc => cols.lt(vals),
                    };
                    cond = cond.add(cmp);
                }
            }
        }

        let rows = movies::Entity::find()
            .filter(cond)
            .order_by(sort_col, order.clone())
            .order_by(movies::Column::Id, order)
            .limit(query.limit)
            .all(&self.conn)
            .await
            .context("Failed to run catalog query")?;

        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn featured(&self, limit: u64) -> Result<Vec<Movie>> {
        let rows = movies::Entity::find()
            .filter(movies::Column::Featured.eq(true))
            .order_by(movies::Column::CreatedAt, Order::Desc)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query featured movies")?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn trending(&self, limit: u64) -> Result<Vec<Movie>> {
        let rows = movies::Entity::find()
            .order_by(movies::Column::Views, Order::Desc)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query trending movies")?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn recent(&self, limit: u64) -> Result<Vec<Movie>> {
        let rows = movies::Entity::find()
            .order_by(movies::Column::CreatedAt, Order::Desc)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to query recent movies")?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn genres(&self) -> Result<Vec<GenreCount>> {
        #[derive(FromQueryResult)]
        struct GenreRow {
            genre: Option<String>,
            count: i64,
        }

        let rows = movies::Entity::find()
            .select_only()
            .column(movies::Column::Genre)
            .column_as(movies::Column::Id.count(), "count")
            .filter(movies::Column::Genre.is_not_null())
            .group_by(movies::Column::Genre)
            .into_model::<GenreRow>()
            .all(&self.conn)
            .await
            .context("Failed to aggregate genres")?;

        let mut genres: Vec<GenreCount> = rows
            .into_iter()
            .filter_map(|r| {
                let name = r.genre?;
                let count = u64::try_from(r.count).unwrap_or(0);
                Some(GenreCount::new(&name, count))
            })
            .collect();
        genres.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(genres)
    }

    async fn record_view(&self, id: &str) -> Result<bool> {
        let result = movies::Entity::update_many()
            .col_expr(
                movies::Column::Views,
                Expr::col(movies::Column::Views).add(1),
            )
            .col_expr(movies::Column::LastViewed, Expr::value(now_rfc3339()))
            .filter(movies::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record view")?;
        Ok(result.rows_affected > 0)
    }

    async fn record_download(&self, id: &str) -> Result<bool> {
        let result = movies::Entity::update_many()
            .col_expr(
                movies::Column::Downloads,
                Expr::col(movies::Column::Downloads).add(1),
            )
            .col_expr(movies::Column::LastDownloaded, Expr::value(now_rfc3339()))
            .filter(movies::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to record download")?;
        Ok(result.rows_affected > 0)
    }

    async fn upsert_rating(
        &self,
        id: &str,
        entry: RatingEntry,
    ) -> Result<Option<(Vec<RatingEntry>, f64)>> {
        let txn = self.conn.begin().await?;

        let Some(model) = movies::Entity::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to load movie for rating")?
        else {
            txn.rollback().await.ok();
            return Ok(None);
        };

        let mut ratings: Vec<RatingEntry> = model
            .ratings
            .as_deref()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        if let Some(existing) = ratings.iter_mut().find(|r| r.user_id == entry.user_id) {
            existing.score = entry.score;
            existing.comment = entry.comment;
            existing.updated_at = entry.updated_at;
        } else {
            ratings.push(entry);
        }

        #[allow(clippy::cast_precision_loss)]
        let average = ratings.iter().map(|r| r.score).sum::<f64>() / ratings.len() as f64;

        let mut active: movies::ActiveModel = model.into();
        active.ratings = Set(Some(
            serde_json::to_string(&ratings).context("Failed to encode ratings")?,
        ));
        active.average_rating = Set(Some(average));
        active.updated_at = Set(now_rfc3339());
        active.update(&txn).await.context("Failed to save rating")?;

        txn.commit().await?;
        Ok(Some((ratings, average)))
    }

    async fn summaries_by_genre(&self) -> Result<Vec<(String, MovieSummary)>> {
        let rows = movies::Entity::find()
            .filter(movies::Column::Genre.is_not_null())
            .order_by(movies::Column::CreatedAt, Order::Desc)
            .all(&self.conn)
            .await
            .context("Failed to list movies for collection rebuild")?;

        Ok(rows
            .into_iter()
            .filter_map(|m| {
                let genre = m.genre.clone()?;
                Some((
                    genre,
                    MovieSummary {
                        movie_id: m.id,
                        title: m.title,
                        poster: m.poster,
                    },
                ))
            })
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        let count = movies::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count movies")?;
        Ok(count)
    }

    async fn total_views(&self) -> Result<i64> {
        #[derive(FromQueryResult)]
        struct SumRow {
            total: Option<i64>,
        }

        let row = movies::Entity::find()
            .select_only()
            .column_as(movies::Column::Views.sum(), "total")
            .into_model::<SumRow>()
            .one(&self.conn)
            .await
            .context("Failed to sum views")?;

        Ok(row.and_then(|r| r.total).unwrap_or(0))
    }
}
