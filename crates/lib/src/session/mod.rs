//! Session reconciliation.
//!
//! This module turns the asynchronous soup around authentication (sign-up
//! and sign-in calls, profile reads racing replication lag, the provider's
//! own session-change stream, process startup) into one consistent,
//! observable session value. The rules:
//!
//! * Every state-committing flow takes a monotonic operation token at its
//!   start; only the newest token's result lands, stale results are
//!   discarded. Whatever the interleaving, the state reflects the
//!   operation the user performed last.
//! * Profile reads retry on a fixed backoff with a bounded budget. Post-auth
//!   flows that exhaust the budget still sign the user in with a minimal
//!   `User` synthesized from the auth identity; hydration and event handling
//!   fall back to signed-out instead.
//! * `is_loading` is true exactly while the state is still [`SessionState::Unknown`]
//!   or a login/registration is in flight, and a safety timeout forces an
//!   answer even if nothing else ever resolves.
//!
//! ```
//! use std::sync::Arc;
//! use cinelog::{InMemoryProvider, SessionManager};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> cinelog::Result<()> {
//! let provider = Arc::new(InMemoryProvider::new());
//! let manager = SessionManager::new(provider.clone());
//! manager.start();
//!
//! let user = manager.register("Ana", "ana@test.com", "abcdef", None).await?;
//! assert_eq!(user.name, "Ana");
//! assert!(manager.snapshot().state.is_authenticated());
//!
//! manager.logout().await?;
//! assert!(manager.current_user().is_none());
//! # manager.shutdown().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, OnceLock};

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::provider::{ProfilePatch, ProfileRow, Provider, ProviderError};
use crate::{Error, Result};

pub mod errors;
mod reconciler;
mod retry;
mod state;

pub use errors::SessionError;
pub use state::{SessionSnapshot, SessionState, User};

use reconciler::{Reconciler, ReconcilerCommand};
use retry::resolve_profile;
use state::SharedState;

struct ManagerInner {
    provider: Arc<dyn Provider>,
    state: Arc<SharedState>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    commands: OnceLock<mpsc::Sender<ReconcilerCommand>>,
}

/// Handle to the session reconciler.
///
/// Cheap to clone; all clones share one state and one background actor.
/// The actor stops when [`shutdown`](Self::shutdown) is called or every
/// handle is dropped.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    /// Create a manager with the default [`SessionConfig`].
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self::with_config(provider, SessionConfig::default())
    }

    pub fn with_config(provider: Arc<dyn Provider>, config: SessionConfig) -> Self {
        Self::build(provider, config, Arc::new(SystemClock))
    }

    /// Create a manager with an injected clock for deterministic
    /// timestamps.
    #[cfg(any(test, feature = "testing"))]
    pub fn with_clock(
        provider: Arc<dyn Provider>,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(provider, config, clock)
    }

    fn build(provider: Arc<dyn Provider>, config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                provider,
                state: SharedState::new(),
                config,
                clock,
                commands: OnceLock::new(),
            }),
        }
    }

    /// Start the background reconciler: subscribe to the provider's event
    /// stream and arm the startup safety timeout. Idempotent; must be
    /// called from within a Tokio runtime. Restoring a persisted session
    /// is a separate, explicit [`hydrate`](Self::hydrate) call.
    pub fn start(&self) {
        if self.inner.commands.get().is_some() {
            warn!("session manager already started");
            return;
        }
        let tx = Reconciler::spawn(
            Arc::clone(&self.inner.provider),
            Arc::clone(&self.inner.state),
            self.inner.config.clone(),
        );
        if self.inner.commands.set(tx).is_err() {
            warn!("session manager already started");
        }
    }

    /// Restore the provider's persisted session, if any.
    ///
    /// Resolves to `Authenticated` when a session exists and its profile
    /// becomes visible within the hydration retry budget; everything else,
    /// including provider failure, settles to `Unauthenticated`. Never
    /// returns an error: startup must always reach an answer.
    pub async fn hydrate(&self) {
        reconciler::hydrate(
            Arc::clone(&self.inner.provider),
            Arc::clone(&self.inner.state),
            self.inner.config.clone(),
        )
        .await;
    }

    /// Authenticate an existing account and resolve its profile.
    ///
    /// The provider is asked exactly once; profile resolution retries up
    /// to the post-auth budget and falls back to a minimal user built from
    /// the auth identity, so a laggy profile store never blocks sign-in.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(SessionError::InvalidInput {
                reason: "password must not be empty".to_string(),
            }
            .into());
        }

        let _loading = self.inner.state.loading_guard();
        let token = self.inner.state.next_token();
        let session = self
            .inner
            .provider
            .authenticate(&email, password)
            .await
            .map_err(translate_provider)?;
        self.inner.state.claim_identity(&session.identity.id);

        let user = match resolve_profile(
            self.inner.provider.as_ref(),
            &session.identity.id,
            self.inner.config.post_auth_profile_attempts,
            self.inner.config.profile_retry_backoff,
        )
        .await
        {
            Some(row) => User::from_row(&row),
            None => User::from_identity(&session.identity),
        };
        self.inner
            .state
            .commit(token, SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Create an account, seed its profile row, and sign the user in.
    ///
    /// Validation runs before any provider call. The profile insert
    /// tolerates an already-existing row, and an avatar is attached best
    /// effort; neither can fail the registration.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        avatar_url: Option<&str>,
    ) -> Result<User> {
        let name = normalize_name(name)?;
        let email = normalize_email(email)?;
        validate_password(password)?;

        let _loading = self.inner.state.loading_guard();
        let token = self.inner.state.next_token();
        let session = self
            .inner
            .provider
            .create_account(&email, password, &name)
            .await
            .map_err(translate_provider)?;
        self.inner.state.claim_identity(&session.identity.id);

        let row = ProfileRow {
            id: session.identity.id.clone(),
            email: email.clone(),
            name: name.clone(),
            avatar_url: avatar_url.map(str::to_string),
            created_at: Some(self.inner.clock.now_rfc3339()),
            updated_at: None,
        };
        match self.inner.provider.insert_profile(&row).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                debug!(id = %row.id, "profile row already present");
                if let Some(avatar) = &row.avatar_url
                    && let Err(e) = self
                        .inner
                        .provider
                        .update_profile(&row.id, &ProfilePatch::set_avatar(avatar.clone()))
                        .await
                {
                    warn!(error = %e, "avatar attach failed");
                }
            }
            Err(e) => warn!(error = %e, "profile insert failed"),
        }

        let user = match resolve_profile(
            self.inner.provider.as_ref(),
            &session.identity.id,
            self.inner.config.post_auth_profile_attempts,
            self.inner.config.profile_retry_backoff,
        )
        .await
        {
            Some(row) => User::from_row(&row),
            None => User::from_identity(&session.identity),
        };
        self.inner
            .state
            .commit(token, SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// End the session.
    ///
    /// The local state is cleared to `Unauthenticated` no matter what the
    /// provider answers; a provider failure is still surfaced after the
    /// fact. Signing out while signed out is a no-op.
    pub async fn logout(&self) -> Result<()> {
        let token = self.inner.state.next_token();
        let result = self.inner.provider.end_session().await;
        self.inner
            .state
            .commit(token, SessionState::Unauthenticated);
        result.map_err(|e| {
            warn!(error = %e, "provider sign-out failed; local session cleared");
            translate_provider(e)
        })
    }

    /// Apply a partial profile update and refresh the local user from the
    /// row the store returns.
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<User> {
        if patch.is_empty() {
            return Err(SessionError::InvalidInput {
                reason: "profile patch names no fields".to_string(),
            }
            .into());
        }
        let patch = match patch.name {
            Some(name) => ProfilePatch {
                name: Some(normalize_name(&name)?),
                avatar_url: patch.avatar_url,
            },
            None => patch,
        };
        let user_id = match self.inner.state.snapshot().user() {
            Some(user) => user.id.clone(),
            None => return Err(SessionError::NotAuthenticated.into()),
        };

        let token = self.inner.state.next_token();
        let row = self
            .inner
            .provider
            .update_profile(&user_id, &patch)
            .await
            .map_err(translate_provider)?;
        let user = User::from_row(&row);
        self.inner
            .state
            .commit(token, SessionState::Authenticated(user.clone()));
        Ok(user)
    }

    /// Current state and loading flag.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.snapshot()
    }

    /// Watch the session; the receiver always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// The signed-in user, when there is one.
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.snapshot().user().cloned()
    }

    /// Stop the background reconciler and wait for it to finish.
    pub async fn shutdown(&self) {
        let Some(tx) = self.inner.commands.get() else {
            return;
        };
        let (done, ack) = oneshot::channel();
        if tx
            .send(ReconcilerCommand::Shutdown { done })
            .await
            .is_ok()
        {
            let _ = ack.await;
        }
    }
}

/// Map provider failures into the session vocabulary; anything without a
/// session-level meaning passes through untouched.
fn translate_provider(err: Error) -> Error {
    match err {
        Error::Provider(ProviderError::InvalidCredentials) => {
            SessionError::AuthenticationFailed.into()
        }
        Error::Provider(ProviderError::EmailTaken { email }) => {
            SessionError::AlreadyRegistered { email }.into()
        }
        Error::Provider(ProviderError::Unavailable { reason }) => {
            SessionError::ProviderUnavailable { reason }.into()
        }
        other => other,
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(SessionError::InvalidInput {
            reason: "email must not be empty".to_string(),
        }
        .into());
    }
    Ok(email)
}

fn normalize_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::InvalidInput {
            reason: "name must not be blank".to_string(),
        }
        .into());
    }
    Ok(name.to_string())
}

const MIN_PASSWORD_CHARS: usize = 6;

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(SessionError::InvalidInput {
            reason: format!("password must be at least {MIN_PASSWORD_CHARS} characters"),
        }
        .into());
    }
    Ok(())
}
