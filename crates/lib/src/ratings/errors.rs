//! Rating validation errors.

use thiserror::Error;

/// Errors surfaced by [`RatingBook`](super::RatingBook).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RatingsError {
    /// Scores run from 1 (hated it) to 5 (loved it).
    #[error("score {score} out of range, expected 1 through 5")]
    InvalidScore { score: u8 },

    /// A rating must reference a movie.
    #[error("movie id must not be empty")]
    MissingMovieId,
}

impl RatingsError {
    pub fn is_invalid_score(&self) -> bool {
        matches!(self, RatingsError::InvalidScore { .. })
    }

    pub fn is_missing_movie_id(&self) -> bool {
        matches!(self, RatingsError::MissingMovieId)
    }
}

impl From<RatingsError> for crate::Error {
    fn from(err: RatingsError) -> Self {
        crate::Error::Ratings(err)
    }
}
