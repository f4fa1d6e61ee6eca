//! External collaborator seams: identity provider and profile store.
//!
//! Cinelog does not own authentication or profile persistence; both are
//! delegated to an external backend. This module defines the traits the
//! session reconciler consumes, the session/profile data types exchanged
//! across that boundary, and two implementations:
//!
//! * [`InMemoryProvider`] - self-contained provider for tests, local
//!   development, and the demo CLI, with injectable replication lag.
//! * [`RestProvider`] - client for a hosted backend exposing
//!   Supabase-flavored auth and row endpoints.
//!
//! Session-change notifications are push-based: [`IdentityProvider::subscribe`]
//! returns a channel receiver, and dropping that receiver is the unsubscribe.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::Result;

pub mod errors;
pub mod memory;
pub mod rest;

pub use errors::ProviderError;
pub use memory::{InMemoryProvider, ProviderMetrics};
pub use rest::{RestConfig, RestProvider};

/// Buffered events per subscriber before the provider starts dropping.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Identity attributes known directly from an auth response.
///
/// This is what the provider can vouch for without consulting the profile
/// store; post-auth flows fall back to it when the profile row is not yet
/// visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    /// Opaque stable identifier assigned at registration.
    pub id: String,

    /// Normalized account email.
    pub email: String,

    /// Display name attached to the account at registration, if any.
    pub display_name: Option<String>,
}

/// An authenticated session as issued by the identity provider.
///
/// The access token is opaque to this crate; token storage and renewal are
/// the provider's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    /// The identity this session belongs to.
    pub identity: AuthIdentity,

    /// Opaque bearer token for authenticated calls.
    pub access_token: String,
}

/// Kind of a provider-emitted session notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    /// Fired once when the provider restores a persisted session at startup.
    InitialSession,
    /// A session was established (login or registration).
    SignedIn,
    /// The session's token was renewed; same identity as before.
    TokenRefreshed,
    /// The session ended.
    SignedOut,
}

/// A change notification from the provider's session stream.
#[derive(Debug, Clone)]
pub struct SessionChange {
    /// What happened.
    pub event: SessionEventKind,
    /// The session after the change; `None` for sign-out shaped events.
    pub session: Option<ProviderSession>,
}

/// Subscription handle for session changes.
///
/// Dropping the receiver unsubscribes; the provider prunes closed
/// subscribers on the next emission.
pub type SessionEvents = mpsc::Receiver<SessionChange>;

/// Mutable user attributes stored in the external profile table, keyed by
/// identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    /// Identity id; primary key.
    pub id: String,

    /// Account email, mirrored from the identity provider.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Reference to a locally- or remotely-stored avatar image, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Row creation time (RFC3339), stamped by whoever created the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Last update time (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Partial profile update.
///
/// `None` leaves a field untouched. The avatar field is doubly optional:
/// `Some(None)` clears the avatar, `Some(Some(url))` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    /// New display name, if changing.
    pub name: Option<String>,

    /// New avatar reference, if changing; inner `None` clears it.
    pub avatar_url: Option<Option<String>>,
}

impl ProfilePatch {
    /// Patch that renames the profile.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            avatar_url: None,
        }
    }

    /// Patch that sets the avatar reference.
    pub fn set_avatar(url: impl Into<String>) -> Self {
        Self {
            name: None,
            avatar_url: Some(Some(url.into())),
        }
    }

    /// Patch that clears the avatar reference.
    pub fn clear_avatar() -> Self {
        Self {
            name: None,
            avatar_url: Some(None),
        }
    }

    /// True when the patch names no field at all.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.avatar_url.is_none()
    }
}

/// External service performing authentication and issuing session tokens.
///
/// Persistence of the session token is the provider's own concern; this
/// crate only ever asks for the current session and listens for changes.
/// Identity operations are attempted at most once per call; retries, if
/// any, belong to the caller.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new account and open a session for it.
    ///
    /// Fails with [`ProviderError::EmailTaken`] on an email collision.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<ProviderSession>;

    /// Authenticate an existing account.
    ///
    /// Fails with [`ProviderError::InvalidCredentials`] when the pair does
    /// not match an account.
    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession>;

    /// Invalidate the current session. Ending a session that does not exist
    /// is a no-op, which keeps sign-out idempotent.
    async fn end_session(&self) -> Result<()>;

    /// The session the provider currently has persisted, if any.
    async fn current_session(&self) -> Result<Option<ProviderSession>>;

    /// Subscribe to session-change notifications.
    ///
    /// Dropping the returned receiver is the unsubscribe.
    fn subscribe(&self) -> SessionEvents;
}

/// External structured store holding mutable user attributes keyed by
/// identity id.
///
/// Reads may lag writes (the backing store is eventually consistent);
/// callers own the retry policy.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Read a profile row. `Ok(None)` means the row is not (yet) visible.
    async fn read_profile(&self, id: &str) -> Result<Option<ProfileRow>>;

    /// Insert a new profile row.
    ///
    /// Fails with [`ProviderError::ProfileExists`] if the row is already
    /// present.
    async fn insert_profile(&self, row: &ProfileRow) -> Result<()>;

    /// Apply a partial update and return the row as stored afterwards.
    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<ProfileRow>;
}

/// Combined seam the session manager consumes.
///
/// Blanket-implemented for anything that is both an [`IdentityProvider`]
/// and a [`ProfileStore`], so a single backend object can serve as both.
pub trait Provider: IdentityProvider + ProfileStore {}

impl<T: IdentityProvider + ProfileStore> Provider for T {}

/// Fanout list for session-change subscribers.
///
/// Shared by the provider implementations: emission never blocks a provider
/// call, so a subscriber that stops draining loses events rather than
/// stalling authentication.
pub(crate) struct Subscribers {
    senders: Mutex<Vec<mpsc::Sender<SessionChange>>>,
}

impl Subscribers {
    pub(crate) fn new() -> Self {
        Self {
            senders: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber and hand back its receiving end.
    pub(crate) fn subscribe(&self) -> SessionEvents {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        self.senders.lock().unwrap().push(tx);
        rx
    }

    /// Deliver a change to every live subscriber, pruning closed ones.
    pub(crate) fn emit(&self, change: SessionChange) {
        let mut senders = self.senders.lock().unwrap();
        senders.retain(|tx| match tx.try_send(change.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event = ?change.event, "session event dropped for slow subscriber");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }
}
