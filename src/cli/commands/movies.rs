use crate::config::Config;
use crate::db::Store;
use crate::db::repositories::MovieRepository;
use crate::models::movie::{CatalogQuery, SortDirection, SortField};

const PAGE: u64 = 50;

pub async fn cmd_list_movies(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let movies = store.movies();

    let total = movies.count().await?;
    if total == 0 {
        println!("The catalog is empty.");
        println!();
        println!("Add movies through the admin UI or API (POST /api/movies).");
        return Ok(());
    }

    let page = movies
        .query(&CatalogQuery {
            sort_field: SortField::Title,
            sort_direction: SortDirection::Asc,
            limit: PAGE,
            ..Default::default()
        })
        .await?;

    println!("Catalog ({} total)", total);
    println!("{:-<70}", "");

    for movie in &page {
        let year = movie.year.map_or("----".to_string(), |y| y.to_string());
        let genre = movie.genre.as_deref().unwrap_or("-");
        let featured = if movie.featured { " ★" } else { "" };

        println!("• {} ({}){}", movie.title, year, featured);
        println!(
            "  Genre: {} | Views: {} | Rating: {}",
            genre,
            movie.views,
            movie
                .average_rating
                .map_or("unrated".to_string(), |r| format!("{r:.1}/5"))
        );
    }

    if total > PAGE {
        println!();
        println!("... and {} more. Use the web UI to browse the rest.", total - PAGE);
    }

    Ok(())
}
