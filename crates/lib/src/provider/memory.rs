//! Self-contained provider backed by process memory.
//!
//! Accounts, profile rows, and the active session live in a [`Mutex`]-held
//! map; passwords are stored as Argon2id PHC strings, never in plain text.
//! Besides serving the demo CLI and local development, the type carries
//! injectable fault hooks (replication lag, offline mode, per-account auth
//! delay) so callers can exercise retry and race behavior without a real
//! backend.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::{
    AuthIdentity, IdentityProvider, ProfilePatch, ProfileRow, ProfileStore, ProviderError,
    ProviderSession, SessionChange, SessionEventKind, SessionEvents, Subscribers,
};
use crate::Result;

/// One registered account.
#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    display_name: Option<String>,
    password_hash: String,
}

#[derive(Debug, Default)]
struct State {
    /// Accounts keyed by normalized email.
    accounts: HashMap<String, Account>,
    /// Profile rows keyed by identity id.
    profiles: HashMap<String, ProfileRow>,
    /// The provider's persisted session, if any.
    active: Option<ProviderSession>,
    /// Remaining profile reads to answer with `None` despite the row
    /// existing. Models replication lag between auth and the row store.
    profile_lag: u32,
    /// When set, every call fails with `Unavailable`.
    offline: bool,
    /// Artificial latency applied to `authenticate`, keyed by email.
    auth_delay: HashMap<String, Duration>,
}

#[derive(Debug, Default)]
struct Counters {
    create_account: AtomicU64,
    authenticate: AtomicU64,
    end_session: AtomicU64,
    profile_reads: AtomicU64,
    profile_inserts: AtomicU64,
    profile_updates: AtomicU64,
}

/// Snapshot of how often each provider operation has been called.
///
/// Lets tests assert interaction counts, e.g. that input validation short-
/// circuits before any provider traffic, or that event dedup avoided a
/// second profile read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProviderMetrics {
    pub create_account_calls: u64,
    pub authenticate_calls: u64,
    pub end_session_calls: u64,
    pub profile_reads: u64,
    pub profile_inserts: u64,
    pub profile_updates: u64,
}

/// In-memory [`IdentityProvider`] + [`ProfileStore`].
pub struct InMemoryProvider {
    state: Mutex<State>,
    subscribers: Subscribers,
    counters: Counters,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            subscribers: Subscribers::new(),
            counters: Counters::default(),
        }
    }

    /// Seed an established account with a matching profile row, without
    /// opening a session or emitting events. Returns the new identity id.
    pub fn add_account(&self, email: &str, password: &str, name: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let mut state = self.state.lock().unwrap();
        state.accounts.insert(
            email.to_string(),
            Account {
                id: id.clone(),
                email: email.to_string(),
                display_name: Some(name.to_string()),
                password_hash: hash_password(password)?,
            },
        );
        state.profiles.insert(
            id.clone(),
            ProfileRow {
                id: id.clone(),
                email: email.to_string(),
                name: name.to_string(),
                avatar_url: None,
                created_at: Some(now.clone()),
                updated_at: Some(now),
            },
        );
        Ok(id)
    }

    /// Answer the next `reads` profile lookups with `None` even when the
    /// row exists.
    pub fn set_profile_lag(&self, reads: u32) {
        self.state.lock().unwrap().profile_lag = reads;
    }

    /// Toggle offline mode; while set, every call fails with
    /// [`ProviderError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Delay `authenticate` for the given email by `delay` before it
    /// answers. Lets tests race a slow login against a fast one.
    pub fn set_auth_delay(&self, email: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .auth_delay
            .insert(email.to_string(), delay);
    }

    /// Push an arbitrary change onto the session-event stream.
    pub fn emit_event(&self, change: SessionChange) {
        self.subscribers.emit(change);
    }

    /// Current interaction counts.
    pub fn metrics(&self) -> ProviderMetrics {
        ProviderMetrics {
            create_account_calls: self.counters.create_account.load(Ordering::SeqCst),
            authenticate_calls: self.counters.authenticate.load(Ordering::SeqCst),
            end_session_calls: self.counters.end_session.load(Ordering::SeqCst),
            profile_reads: self.counters.profile_reads.load(Ordering::SeqCst),
            profile_inserts: self.counters.profile_inserts.load(Ordering::SeqCst),
            profile_updates: self.counters.profile_updates.load(Ordering::SeqCst),
        }
    }

    fn ensure_online(state: &State) -> Result<()> {
        if state.offline {
            return Err(ProviderError::Unavailable {
                reason: "provider offline".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn open_session(state: &mut State, account: &Account) -> ProviderSession {
        let session = ProviderSession {
            identity: AuthIdentity {
                id: account.id.clone(),
                email: account.email.clone(),
                display_name: account.display_name.clone(),
            },
            access_token: Uuid::new_v4().simple().to_string(),
        };
        state.active = Some(session.clone());
        session
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryProvider {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<ProviderSession> {
        self.counters.create_account.fetch_add(1, Ordering::SeqCst);
        let session = {
            let mut state = self.state.lock().unwrap();
            Self::ensure_online(&state)?;
            if state.accounts.contains_key(email) {
                return Err(ProviderError::EmailTaken {
                    email: email.to_string(),
                }
                .into());
            }
            let account = Account {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                display_name: Some(display_name.to_string()),
                password_hash: hash_password(password)?,
            };
            let session = Self::open_session(&mut state, &account);
            state.accounts.insert(email.to_string(), account);
            session
        };
        self.subscribers.emit(SessionChange {
            event: SessionEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<ProviderSession> {
        self.counters.authenticate.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().unwrap().auth_delay.get(email).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let session = {
            let mut state = self.state.lock().unwrap();
            Self::ensure_online(&state)?;
            let account = state
                .accounts
                .get(email)
                .filter(|account| verify_password(&account.password_hash, password))
                .cloned()
                .ok_or(ProviderError::InvalidCredentials)?;
            Self::open_session(&mut state, &account)
        };
        self.subscribers.emit(SessionChange {
            event: SessionEventKind::SignedIn,
            session: Some(session.clone()),
        });
        Ok(session)
    }

    async fn end_session(&self) -> Result<()> {
        self.counters.end_session.fetch_add(1, Ordering::SeqCst);
        let ended = {
            let mut state = self.state.lock().unwrap();
            Self::ensure_online(&state)?;
            state.active.take()
        };
        if ended.is_some() {
            self.subscribers.emit(SessionChange {
                event: SessionEventKind::SignedOut,
                session: None,
            });
        }
        Ok(())
    }

    async fn current_session(&self) -> Result<Option<ProviderSession>> {
        let state = self.state.lock().unwrap();
        Self::ensure_online(&state)?;
        Ok(state.active.clone())
    }

    fn subscribe(&self) -> SessionEvents {
        self.subscribers.subscribe()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProvider {
    async fn read_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.counters.profile_reads.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::ensure_online(&state)?;
        if !state.profiles.contains_key(id) {
            return Ok(None);
        }
        if state.profile_lag > 0 {
            state.profile_lag -= 1;
            debug!(id, remaining = state.profile_lag, "profile read lagged");
            return Ok(None);
        }
        Ok(state.profiles.get(id).cloned())
    }

    async fn insert_profile(&self, row: &ProfileRow) -> Result<()> {
        self.counters.profile_inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::ensure_online(&state)?;
        if state.profiles.contains_key(&row.id) {
            return Err(ProviderError::ProfileExists { id: row.id.clone() }.into());
        }
        let mut row = row.clone();
        if row.created_at.is_none() {
            row.created_at = Some(Utc::now().to_rfc3339());
        }
        state.profiles.insert(row.id.clone(), row);
        Ok(())
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<ProfileRow> {
        self.counters.profile_updates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::ensure_online(&state)?;
        let row = state
            .profiles
            .get_mut(id)
            .ok_or_else(|| ProviderError::ProfileMissing { id: id.to_string() })?;
        if let Some(name) = &patch.name {
            row.name = name.clone();
        }
        if let Some(avatar) = &patch.avatar_url {
            row.avatar_url = avatar.clone();
        }
        row.updated_at = Some(Utc::now().to_rfc3339());
        Ok(row.clone())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ProviderError::Unavailable {
            reason: format!("password hashing failed: {e}"),
        })?;
    Ok(hash.to_string())
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
