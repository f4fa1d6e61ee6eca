//! Catalog-level errors.

use thiserror::Error;

/// Errors surfaced by [`MovieCatalog`](super::MovieCatalog) implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    /// The search query was empty or blank.
    #[error("search query must not be blank")]
    InvalidQuery,

    /// No movie exists under the given id.
    #[error("movie not found: {id}")]
    MovieNotFound { id: String },

    /// The catalog service could not be reached or answered with a server
    /// fault.
    #[error("catalog unavailable: {reason}")]
    Unavailable { reason: String },

    /// The catalog answered with something this client cannot interpret.
    #[error("invalid catalog response: {reason}")]
    InvalidResponse { reason: String },
}

impl CatalogError {
    /// Check if this is a query-validation failure.
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, CatalogError::InvalidQuery)
    }

    /// Check if this is a missing-movie failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::MovieNotFound { .. })
    }

    /// Check if the catalog was unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CatalogError::Unavailable { .. })
    }
}

impl From<CatalogError> for crate::Error {
    fn from(err: CatalogError) -> Self {
        crate::Error::Catalog(err)
    }
}
