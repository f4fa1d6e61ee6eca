//! Error types for the external identity and profile collaborators.

use thiserror::Error;

/// Errors surfaced by identity-provider and profile-store implementations.
///
/// These are the raw collaborator failures; the session layer maps them into
/// the caller-facing [`SessionError`](crate::session::SessionError) taxonomy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Credentials did not match any account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account creation collided with an existing email.
    #[error("email already registered: {email}")]
    EmailTaken { email: String },

    /// Profile insertion collided with an existing row.
    #[error("profile already exists for identity {id}")]
    ProfileExists { id: String },

    /// Profile update targeted a row that does not exist (or is not yet
    /// visible to this replica).
    #[error("no profile row for identity {id}")]
    ProfileMissing { id: String },

    /// Network or backend failure, not otherwise classified.
    #[error("provider unavailable: {reason}")]
    Unavailable { reason: String },

    /// The provider answered with something this client cannot interpret.
    #[error("invalid provider response: {reason}")]
    InvalidResponse { reason: String },
}

impl ProviderError {
    /// Check if this error means the presented credentials were rejected.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, ProviderError::InvalidCredentials)
    }

    /// Check if this error is a uniqueness conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ProviderError::EmailTaken { .. } | ProviderError::ProfileExists { .. }
        )
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::ProfileMissing { .. })
    }

    /// Check if this error is transient (network/backend trouble).
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable { .. } | ProviderError::InvalidResponse { .. }
        )
    }
}

impl From<ProviderError> for crate::Error {
    fn from(err: ProviderError) -> Self {
        crate::Error::Provider(err)
    }
}
