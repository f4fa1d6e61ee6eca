//! Session-level errors.

use thiserror::Error;

/// Errors surfaced by [`SessionManager`](super::SessionManager) operations.
///
/// Validation failures are raised synchronously, before any provider
/// traffic. Provider failures are translated here so callers match on one
/// vocabulary regardless of which backend is plugged in.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Input rejected before any network call.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The email/password pair did not match an account.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Registration hit an existing account.
    #[error("an account already exists for {email}")]
    AlreadyRegistered { email: String },

    /// The operation requires an authenticated session.
    #[error("no authenticated session")]
    NotAuthenticated,

    /// The provider could not be reached or answered with a server fault.
    #[error("provider unavailable: {reason}")]
    ProviderUnavailable { reason: String },
}

impl SessionError {
    /// Check if this is a pre-network validation failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SessionError::InvalidInput { .. })
    }

    /// Check if this is a credential mismatch.
    pub fn is_authentication_failed(&self) -> bool {
        matches!(self, SessionError::AuthenticationFailed)
    }

    /// Check if this is a duplicate-registration failure.
    pub fn is_already_registered(&self) -> bool {
        matches!(self, SessionError::AlreadyRegistered { .. })
    }

    /// Check if the operation was attempted without a session.
    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, SessionError::NotAuthenticated)
    }

    /// Check if the provider was unreachable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SessionError::ProviderUnavailable { .. })
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        crate::Error::Session(err)
    }
}
