//! Observable session state and the commit discipline behind it.
//!
//! All mutation funnels through [`SharedState`]: operations take a token at
//! their start, do their async work, and try to commit the outcome. A commit
//! lands only if its token is newer than the newest already-committed one,
//! so whichever operation finished last (by start order) wins and slow
//! stragglers are discarded. Observers watch [`SessionSnapshot`] values
//! through a `watch` channel and never see intermediate states.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::provider::{AuthIdentity, ProfileRow};

/// The authenticated user as presented to the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity id, stable across sessions.
    pub id: String,

    /// Account email.
    pub email: String,

    /// Display name.
    pub name: String,

    /// Avatar reference, if one is set.
    pub avatar_url: Option<String>,
}

impl User {
    /// Build a user from its profile row.
    pub(crate) fn from_row(row: &ProfileRow) -> Self {
        Self {
            id: row.id.clone(),
            email: row.email.clone(),
            name: row.name.clone(),
            avatar_url: row.avatar_url.clone(),
        }
    }

    /// Build a minimal user from the auth identity alone, for when the
    /// profile row never became visible. Falls back to the email local
    /// part when the identity carries no display name.
    pub(crate) fn from_identity(identity: &AuthIdentity) -> Self {
        let name = identity
            .display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| fallback_name(&identity.email));
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            name,
            avatar_url: None,
        }
    }
}

fn fallback_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("");
    if local.is_empty() {
        email.to_string()
    } else {
        local.to_string()
    }
}

/// Authoritative session state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No authoritative answer yet for this process run.
    #[default]
    Unknown,
    /// A user is signed in.
    Authenticated(User),
    /// Nobody is signed in.
    Unauthenticated,
}

impl SessionState {
    pub fn is_unknown(&self) -> bool {
        matches!(self, SessionState::Unknown)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    /// The signed-in user, when there is one.
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

/// Immutable view of the session at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionState,

    /// True while no authoritative answer exists yet, or while a login or
    /// registration call is in flight.
    pub is_loading: bool,
}

impl SessionSnapshot {
    /// The signed-in user, when there is one.
    pub fn user(&self) -> Option<&User> {
        self.state.user()
    }
}

#[derive(Debug, Default)]
struct StateInner {
    state: SessionState,
    /// Newest committed operation token; 0 before the first commit.
    committed: u64,
    /// Login/registration calls currently in flight.
    inflight: usize,
    /// Identity id last claimed for profile resolution (or currently
    /// authenticated). Drives event de-duplication.
    claimed_identity: Option<String>,
}

impl StateInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            is_loading: self.state.is_unknown() || self.inflight > 0,
        }
    }
}

/// Shared mutable core behind `SessionManager` and the reconciler actor.
pub(crate) struct SharedState {
    inner: Mutex<StateInner>,
    tx: watch::Sender<SessionSnapshot>,
    op_counter: AtomicU64,
}

impl SharedState {
    pub(crate) fn new() -> Arc<Self> {
        let inner = StateInner::default();
        let (tx, _rx) = watch::channel(inner.snapshot());
        Arc::new(Self {
            inner: Mutex::new(inner),
            tx,
            op_counter: AtomicU64::new(0),
        })
    }

    /// Allocate the next operation token. Tokens are taken at operation
    /// start, so start order decides which result wins.
    pub(crate) fn next_token(&self) -> u64 {
        self.op_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `state` if `token` is newer than everything committed so far.
    /// Returns false when the result is stale and was discarded.
    pub(crate) fn commit(&self, token: u64, state: SessionState) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if token <= inner.committed {
            debug!(
                token,
                committed = inner.committed,
                "discarding stale session result"
            );
            return false;
        }
        inner.committed = token;
        inner.claimed_identity = match &state {
            SessionState::Authenticated(user) => Some(user.id.clone()),
            _ => None,
        };
        inner.state = state;
        self.tx.send_replace(inner.snapshot());
        true
    }

    /// Claim an identity id for profile resolution. Returns false when the
    /// id is already claimed or reflected, in which case the caller must
    /// not start another resolution.
    pub(crate) fn claim_identity(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.claimed_identity.as_deref() == Some(id) {
            return false;
        }
        inner.claimed_identity = Some(id.to_string());
        true
    }

    /// Force `Unknown` to `Unauthenticated` if nothing has committed yet.
    /// Consumes no token, so any in-flight operation still commits later.
    pub(crate) fn settle_if_unresolved(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.committed == 0 && inner.state.is_unknown() {
            inner.state = SessionState::Unauthenticated;
            inner.claimed_identity = None;
            self.tx.send_replace(inner.snapshot());
            return true;
        }
        false
    }

    /// Mark a login/registration as in flight for the guard's lifetime.
    pub(crate) fn loading_guard(self: &Arc<Self>) -> LoadingGuard {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.inflight += 1;
            self.tx.send_replace(inner.snapshot());
        }
        LoadingGuard {
            state: Arc::clone(self),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().unwrap().snapshot()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }
}

/// Keeps `is_loading` true while an interactive auth call runs; releasing
/// it on every path (including early error returns) is what guarantees the
/// flag can never stick.
pub(crate) struct LoadingGuard {
    state: Arc<SharedState>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut inner = self.state.inner.lock().unwrap();
        inner.inflight = inner.inflight.saturating_sub(1);
        self.state.tx.send_replace(inner.snapshot());
    }
}
