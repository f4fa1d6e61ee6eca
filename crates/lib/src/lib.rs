//! Headless client core for a movie-rating application.
//!
//! Cinelog is the logic layer a movie app front end sits on: account
//! registration and sign-in, catalog search, and per-user ratings of
//! watched movies, with no UI assumptions. Everything observable is
//! exposed as snapshot values over `tokio::sync::watch` channels, so any
//! front end (native, web, TUI) can subscribe and render.
//!
//! The heart of the crate is the session reconciler
//! ([`SessionManager`]): it merges interactive auth calls, the identity
//! provider's own event stream, eventually-consistent profile reads, and
//! process startup into one coherent session value. See the
//! [`session`] module docs for the rules.
//!
//! # Architecture
//!
//! * [`session`] reconciles authentication state ([`SessionManager`]).
//! * [`provider`] is the backend seam: [`IdentityProvider`] +
//!   [`ProfileStore`], with [`InMemoryProvider`] and a Supabase-flavored
//!   [`RestProvider`].
//! * [`catalog`] searches a movie database: [`RestCatalog`] (TMDB-style)
//!   or [`InMemoryCatalog`], and the race-safe [`SearchFeed`].
//! * [`store`] + [`ratings`] persist per-user ratings through the
//!   [`KvStore`] seam.
//! * [`clock`] injects time so timestamps are testable.
//!
//! # Quick start
//!
//! ```
//! use std::sync::Arc;
//! use cinelog::{InMemoryKv, InMemoryProvider, RatingBook, SessionManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cinelog::Result<()> {
//! let provider = Arc::new(InMemoryProvider::new());
//! let sessions = SessionManager::new(provider.clone());
//! sessions.start();
//!
//! let user = sessions.register("Ana", "ana@test.com", "abcdef", None).await?;
//! assert_eq!(user.name, "Ana");
//!
//! let ratings = RatingBook::new(Arc::new(InMemoryKv::new()));
//! ratings.rate(&user.id, "603", "The Matrix", None, 5)?;
//! assert_eq!(ratings.list(&user.id)?[0].title, "The Matrix");
//! # sessions.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod clock;
pub mod config;
pub mod provider;
pub mod ratings;
pub mod session;
pub mod store;

use thiserror::Error;

pub use catalog::{
    CatalogError, InMemoryCatalog, MovieCatalog, MovieDetails, MovieSummary, RestCatalog,
    RestCatalogConfig, SearchFeed, SearchPage, SearchState,
};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use clock::{Clock, SystemClock};
pub use config::SessionConfig;
pub use provider::{
    AuthIdentity, IdentityProvider, InMemoryProvider, ProfilePatch, ProfileRow, ProfileStore,
    Provider, ProviderError, ProviderSession, RestConfig, RestProvider, SessionChange,
    SessionEventKind, SessionEvents,
};
pub use ratings::{MovieRating, RatingBook, RatingsError};
pub use session::{SessionError, SessionManager, SessionSnapshot, SessionState, User};
pub use store::{InMemoryKv, KvStore};

/// Result type returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error, aggregating each module's error type.
///
/// Module errors convert in with `?`; the classifier methods answer the
/// questions callers actually ask without matching the full tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// File I/O failed.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed.
    #[error("serialization error")]
    Serialize(#[from] serde_json::Error),

    /// Session operation failed.
    #[error(transparent)]
    Session(session::SessionError),

    /// Identity provider or profile store failed.
    #[error(transparent)]
    Provider(provider::ProviderError),

    /// Movie catalog failed.
    #[error(transparent)]
    Catalog(catalog::CatalogError),

    /// Rating validation failed.
    #[error(transparent)]
    Ratings(ratings::RatingsError),
}

impl Error {
    /// Check if this is any kind of not-found error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Provider(e) => e.is_not_found(),
            Error::Catalog(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is an authentication failure, either bad credentials
    /// or a missing session.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Session(e) => e.is_authentication_failed() || e.is_not_authenticated(),
            Error::Provider(e) => e.is_invalid_credentials(),
            _ => false,
        }
    }

    /// Check if this is an input-validation failure raised before any
    /// network or storage call.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Session(e) => e.is_invalid_input(),
            Error::Catalog(e) => e.is_invalid_query(),
            Error::Ratings(_) => true,
            _ => false,
        }
    }

    /// Check if this is a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        match self {
            Error::Session(e) => e.is_already_registered(),
            Error::Provider(e) => e.is_conflict(),
            _ => false,
        }
    }

    /// Check if a remote service was unreachable or failing.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Session(e) => e.is_unavailable(),
            Error::Provider(e) => e.is_unavailable(),
            Error::Catalog(e) => e.is_unavailable(),
            _ => false,
        }
    }
}
