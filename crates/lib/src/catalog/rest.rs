//! Catalog client for a TMDB-style HTTP API.
//!
//! Wire types mirror the service's JSON and are mapped into the crate's
//! own catalog types at the edge; poster paths are joined onto a
//! configurable image base so callers always see complete URLs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::{CatalogError, MovieCatalog, MovieDetails, MovieSummary, SearchPage, normalize_query};
use crate::Result;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";

/// Connection settings for a [`RestCatalog`].
#[derive(Debug, Clone)]
pub struct RestCatalogConfig {
    /// API root, e.g. `https://api.themoviedb.org/3`.
    pub base_url: Url,

    /// API key, sent as the `api_key` query parameter.
    pub api_key: String,

    /// Base joined in front of relative poster paths.
    pub image_base_url: String,

    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl RestCatalogConfig {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
            image_base_url: DEFAULT_IMAGE_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// HTTP [`MovieCatalog`].
pub struct RestCatalog {
    config: RestCatalogConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    page: u32,
    total_pages: u32,
    results: Vec<MovieResult>,
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    id: i64,
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    id: i64,
    title: String,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    poster_path: Option<String>,
    #[serde(default)]
    vote_average: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

impl RestCatalog {
    pub fn new(config: RestCatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CatalogError::Unavailable {
                reason: format!("http client init failed: {e}"),
            })?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path
        )
    }

    fn poster_url(&self, path: Option<String>) -> Option<String> {
        path.map(|p| {
            format!(
                "{}/{}",
                self.config.image_base_url.trim_end_matches('/'),
                p.trim_start_matches('/')
            )
        })
    }
}

#[async_trait]
impl MovieCatalog for RestCatalog {
    async fn search(&self, query: &str, page: u32) -> Result<SearchPage> {
        let query = normalize_query(query)?;
        let page = page.max(1).to_string();
        let response = self
            .client
            .get(self.endpoint("search/movie"))
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("query", query),
                ("page", page.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable {
                reason: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(catalog_failure(status, response.text().await.unwrap_or_default()).into());
        }
        let body: SearchResponse =
            response.json().await.map_err(|e| CatalogError::InvalidResponse {
                reason: format!("malformed search response: {e}"),
            })?;
        Ok(SearchPage {
            page: body.page,
            total_pages: body.total_pages,
            movies: body
                .results
                .into_iter()
                .map(|m| MovieSummary {
                    id: m.id.to_string(),
                    title: m.title,
                    year: year_of(m.release_date.as_deref()),
                    poster_url: self.poster_url(m.poster_path),
                })
                .collect(),
        })
    }

    async fn details(&self, id: &str) -> Result<MovieDetails> {
        let response = self
            .client
            .get(self.endpoint(&format!("movie/{id}")))
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable {
                reason: e.to_string(),
            })?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::MovieNotFound { id: id.to_string() }.into());
        }
        if !status.is_success() {
            return Err(catalog_failure(status, response.text().await.unwrap_or_default()).into());
        }
        let body: DetailsResponse =
            response.json().await.map_err(|e| CatalogError::InvalidResponse {
                reason: format!("malformed details response: {e}"),
            })?;
        Ok(MovieDetails {
            id: body.id.to_string(),
            title: body.title,
            overview: body.overview.unwrap_or_default(),
            release_date: body.release_date,
            runtime_minutes: body.runtime,
            genres: body.genres.into_iter().map(|g| g.name).collect(),
            poster_url: self.poster_url(body.poster_path),
            vote_average: body.vote_average.unwrap_or(0.0),
        })
    }
}

fn year_of(release_date: Option<&str>) -> Option<u16> {
    release_date.and_then(|d| d.get(..4)).and_then(|y| y.parse().ok())
}

fn catalog_failure(status: StatusCode, body: String) -> CatalogError {
    if status.is_server_error() {
        CatalogError::Unavailable {
            reason: format!("{status}: {body}"),
        }
    } else {
        CatalogError::InvalidResponse {
            reason: format!("{status}: {body}"),
        }
    }
}
