//! Movie catalog: search and detail lookup against a third-party movie
//! database, plus the race-safe [`SearchFeed`] coordinator for live
//! search boxes.
//!
//! The [`MovieCatalog`] trait is the seam; [`RestCatalog`] speaks a
//! TMDB-style HTTP API and [`InMemoryCatalog`] serves fixtures for tests
//! and the demo CLI.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub mod errors;
pub mod memory;
pub mod rest;
pub mod search;

pub use errors::CatalogError;
pub use memory::InMemoryCatalog;
pub use rest::{RestCatalog, RestCatalogConfig};
pub use search::{SearchFeed, SearchState};

/// One movie in a search result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieSummary {
    /// Catalog id, stringly typed so different backends can coexist.
    pub id: String,

    pub title: String,

    /// Release year, when the catalog knows it.
    pub year: Option<u16>,

    /// Full poster image URL, when the movie has one.
    pub poster_url: Option<String>,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub page: u32,
    pub total_pages: u32,
    pub movies: Vec<MovieSummary>,
}

/// Full detail record for one movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: String,
    pub title: String,
    pub overview: String,
    pub release_date: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub poster_url: Option<String>,
    pub vote_average: f32,
}

/// Search and detail lookup.
///
/// Implementations answer each call at most once; retry and request
/// de-duplication belong to the caller (see [`SearchFeed`]).
#[async_trait]
pub trait MovieCatalog: Send + Sync {
    /// One page of results for `query`. Blank queries fail with
    /// [`CatalogError::InvalidQuery`].
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage>;

    /// Full record for one movie.
    ///
    /// Fails with [`CatalogError::MovieNotFound`] for unknown ids.
    async fn details(&self, id: &str) -> Result<MovieDetails>;
}

/// Trim a query and reject it when nothing remains.
pub(crate) fn normalize_query(query: &str) -> Result<&str> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::InvalidQuery.into());
    }
    Ok(trimmed)
}
