//! Fixture-backed catalog for tests and the demo CLI.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{CatalogError, MovieCatalog, MovieDetails, MovieSummary, SearchPage, normalize_query};
use crate::Result;

const PAGE_SIZE: usize = 10;

/// In-memory [`MovieCatalog`] over a fixed movie list.
///
/// Search is a case-insensitive substring match on the title. Per-query
/// latency can be injected to exercise the stale-result handling in
/// [`SearchFeed`](super::SearchFeed).
pub struct InMemoryCatalog {
    movies: Vec<MovieDetails>,
    latency: Mutex<HashMap<String, Duration>>,
    search_calls: AtomicU64,
}

impl InMemoryCatalog {
    pub fn new(movies: Vec<MovieDetails>) -> Self {
        Self {
            movies,
            latency: Mutex::new(HashMap::new()),
            search_calls: AtomicU64::new(0),
        }
    }

    /// A small built-in catalog, enough to demo search and ratings.
    pub fn sample() -> Self {
        Self::new(sample_movies())
    }

    /// Delay every search for `query` (after normalization) by `delay`.
    pub fn set_latency(&self, query: &str, delay: Duration) {
        self.latency
            .lock()
            .unwrap()
            .insert(query.trim().to_lowercase(), delay);
    }

    /// How many searches reached this catalog.
    pub fn search_calls(&self) -> u64 {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MovieCatalog for InMemoryCatalog {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage> {
        let query = normalize_query(query)?.to_lowercase();
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.latency.lock().unwrap().get(&query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let matches: Vec<MovieSummary> = self
            .movies
            .iter()
            .filter(|m| m.title.to_lowercase().contains(&query))
            .map(summary_of)
            .collect();
        let total_pages = (matches.len().div_ceil(PAGE_SIZE)).max(1) as u32;
        let page = page.max(1);
        let start = (page as usize - 1) * PAGE_SIZE;
        let movies = matches.into_iter().skip(start).take(PAGE_SIZE).collect();
        Ok(SearchPage {
            page,
            total_pages,
            movies,
        })
    }

    async fn details(&self, id: &str) -> Result<MovieDetails> {
        self.movies
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::MovieNotFound { id: id.to_string() }.into())
    }
}

fn summary_of(details: &MovieDetails) -> MovieSummary {
    MovieSummary {
        id: details.id.clone(),
        title: details.title.clone(),
        year: details
            .release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok()),
        poster_url: details.poster_url.clone(),
    }
}

fn sample_movies() -> Vec<MovieDetails> {
    let movie = |id: &str,
                 title: &str,
                 release_date: &str,
                 runtime: u32,
                 genres: &[&str],
                 vote: f32| MovieDetails {
        id: id.to_string(),
        title: title.to_string(),
        overview: format!("{title} ({release_date})."),
        release_date: Some(release_date.to_string()),
        runtime_minutes: Some(runtime),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        poster_url: None,
        vote_average: vote,
    };
    vec![
        movie("603", "The Matrix", "1999-03-31", 136, &["Action", "Science Fiction"], 8.2),
        movie("604", "The Matrix Reloaded", "2003-05-15", 138, &["Action", "Science Fiction"], 7.0),
        movie("27205", "Inception", "2010-07-16", 148, &["Action", "Thriller"], 8.4),
        movie("129", "Spirited Away", "2001-07-20", 125, &["Animation", "Fantasy"], 8.5),
        movie("496243", "Parasite", "2019-05-30", 132, &["Drama", "Thriller"], 8.5),
        movie("238", "The Godfather", "1972-03-14", 175, &["Crime", "Drama"], 8.7),
        movie("157336", "Interstellar", "2014-11-05", 169, &["Science Fiction", "Drama"], 8.4),
        movie("100", "Lock, Stock and Two Smoking Barrels", "1998-08-28", 105, &["Comedy", "Crime"], 8.1),
    ]
}
