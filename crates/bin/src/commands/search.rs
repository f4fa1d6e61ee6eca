//! One-shot search against a hosted catalog.

use cinelog::{MovieCatalog, RestCatalog, RestCatalogConfig};
use url::Url;

pub async fn run(query: &str, page: u32, base_url: Url, api_key: &str) -> cinelog::Result<()> {
    let catalog = RestCatalog::new(RestCatalogConfig::new(base_url, api_key))?;
    let results = catalog.search(query, page).await?;

    if results.movies.is_empty() {
        println!("no results for {query:?}");
        return Ok(());
    }
    for movie in &results.movies {
        let year = movie
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());
        println!("{:>8}  {}  {}", movie.id, year, movie.title);
    }
    println!("page {} of {}", results.page, results.total_pages);
    Ok(())
}
