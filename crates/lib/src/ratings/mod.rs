//! Per-user movie ratings.
//!
//! Ratings are local data: they live in whatever [`KvStore`] the front end
//! provides, serialized as one JSON array per user under the key
//! `ratings:<user_id>`. Keying by user id keeps accounts on a shared
//! device isolated from each other.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::store::KvStore;
use crate::Result;

pub mod errors;

pub use errors::RatingsError;

/// One rated movie.
///
/// Title and poster are denormalized from the catalog at rating time so a
/// rating list renders without further lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRating {
    pub movie_id: String,
    pub title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    /// 1 through 5.
    pub score: u8,
    /// Unix milliseconds of the most recent rating of this movie.
    pub rated_at: u64,
}

/// Store-backed rating collection, one list per user.
pub struct RatingBook {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl RatingBook {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Build a book with an injected clock for deterministic timestamps.
    #[cfg(any(test, feature = "testing"))]
    pub fn with_clock(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Rate a movie, replacing any earlier rating of it by the same user.
    /// The timestamp is refreshed on every call.
    pub fn rate(
        &self,
        user_id: &str,
        movie_id: &str,
        title: &str,
        poster_url: Option<&str>,
        score: u8,
    ) -> Result<MovieRating> {
        if movie_id.trim().is_empty() {
            return Err(RatingsError::MissingMovieId.into());
        }
        if !(1..=5).contains(&score) {
            return Err(RatingsError::InvalidScore { score }.into());
        }

        let rating = MovieRating {
            movie_id: movie_id.to_string(),
            title: title.to_string(),
            poster_url: poster_url.map(str::to_string),
            score,
            rated_at: self.clock.now_millis(),
        };
        let mut ratings = self.load(user_id)?;
        ratings.retain(|r| r.movie_id != movie_id);
        ratings.push(rating.clone());
        self.persist(user_id, &ratings)?;
        debug!(user_id, movie_id, score, "movie rated");
        Ok(rating)
    }

    /// This user's rating of one movie, if any.
    pub fn get(&self, user_id: &str, movie_id: &str) -> Result<Option<MovieRating>> {
        let ratings = self.load(user_id)?;
        Ok(ratings.into_iter().find(|r| r.movie_id == movie_id))
    }

    /// Remove one rating. Returns whether anything was removed.
    pub fn remove(&self, user_id: &str, movie_id: &str) -> Result<bool> {
        let mut ratings = self.load(user_id)?;
        let before = ratings.len();
        ratings.retain(|r| r.movie_id != movie_id);
        if ratings.len() == before {
            return Ok(false);
        }
        self.persist(user_id, &ratings)?;
        Ok(true)
    }

    /// All of this user's ratings, most recent first.
    pub fn list(&self, user_id: &str) -> Result<Vec<MovieRating>> {
        let mut ratings = self.load(user_id)?;
        ratings.sort_by(|a, b| b.rated_at.cmp(&a.rated_at));
        Ok(ratings)
    }

    /// Drop every rating this user has.
    pub fn clear(&self, user_id: &str) -> Result<()> {
        self.store.remove(&key_for(user_id))?;
        Ok(())
    }

    fn load(&self, user_id: &str) -> Result<Vec<MovieRating>> {
        match self.store.get(&key_for(user_id))? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn persist(&self, user_id: &str, ratings: &[MovieRating]) -> Result<()> {
        let json = serde_json::to_string(ratings)?;
        self.store.set(&key_for(user_id), &json)
    }
}

fn key_for(user_id: &str) -> String {
    format!("ratings:{user_id}")
}
