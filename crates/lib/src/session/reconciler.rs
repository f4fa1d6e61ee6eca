//! Background actor consuming the provider's session-change stream.
//!
//! One task per `SessionManager`, spawned at `start()`. It owns the event
//! subscription, the shutdown command channel, and the startup safety
//! timeout; all three are multiplexed through one `tokio::select!` loop so
//! the actor dies cleanly with its channels and takes its timer with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info_span, warn};

use super::retry::resolve_profile;
use super::state::{SessionState, SharedState, User};
use crate::config::SessionConfig;
use crate::provider::{Provider, ProviderSession, SessionChange, SessionEventKind, SessionEvents};

const COMMAND_CHANNEL_SIZE: usize = 16;

pub(crate) enum ReconcilerCommand {
    Shutdown { done: oneshot::Sender<()> },
}

/// Resolve the profile behind `session` and commit the outcome under
/// `token`. Exhaustion means the identity cannot be presented, so the
/// commit falls back to signed-out.
pub(crate) async fn resolve_session(
    provider: &dyn Provider,
    state: &SharedState,
    token: u64,
    session: &ProviderSession,
    attempts: u32,
    backoff: Duration,
) {
    let outcome = match resolve_profile(provider, &session.identity.id, attempts, backoff).await {
        Some(row) => SessionState::Authenticated(User::from_row(&row)),
        None => SessionState::Unauthenticated,
    };
    state.commit(token, outcome);
}

/// Establish the starting session state: restore the provider's persisted
/// session if there is one, otherwise settle signed-out. Runs as its own
/// task so a slow restore never blocks event handling or the safety
/// timeout.
pub(crate) async fn hydrate(
    provider: Arc<dyn Provider>,
    state: Arc<SharedState>,
    config: SessionConfig,
) {
    let token = state.next_token();
    match provider.current_session().await {
        Ok(Some(session)) => {
            if !state.claim_identity(&session.identity.id) {
                debug!(
                    id = %session.identity.id,
                    "identity already being resolved; skipping restore"
                );
                return;
            }
            resolve_session(
                provider.as_ref(),
                &state,
                token,
                &session,
                config.hydrate_profile_attempts,
                config.profile_retry_backoff,
            )
            .await;
        }
        Ok(None) => {
            state.commit(token, SessionState::Unauthenticated);
        }
        Err(e) => {
            warn!(error = %e, "session restore failed; presenting signed-out");
            state.commit(token, SessionState::Unauthenticated);
        }
    }
}

pub(crate) struct Reconciler {
    provider: Arc<dyn Provider>,
    state: Arc<SharedState>,
    config: SessionConfig,
    commands: mpsc::Receiver<ReconcilerCommand>,
    events: SessionEvents,
}

impl Reconciler {
    /// Subscribe to the provider and start the actor. The returned sender
    /// is the only handle; dropping it stops the task.
    pub(crate) fn spawn(
        provider: Arc<dyn Provider>,
        state: Arc<SharedState>,
        config: SessionConfig,
    ) -> mpsc::Sender<ReconcilerCommand> {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let events = provider.subscribe();
        let actor = Self {
            provider,
            state,
            config,
            commands: rx,
            events,
        };
        tokio::spawn(actor.run().instrument(info_span!("session_reconciler")));
        tx
    }

    async fn run(mut self) {
        debug!(
            startup_timeout = ?self.config.startup_timeout,
            "session reconciler started"
        );
        let deadline = tokio::time::sleep(self.config.startup_timeout);
        tokio::pin!(deadline);
        let mut deadline_armed = true;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(ReconcilerCommand::Shutdown { done }) => {
                        let _ = done.send(());
                        break;
                    }
                    // All manager handles are gone.
                    None => break,
                },
                Some(change) = self.events.recv() => {
                    self.handle_change(change).await;
                }
                _ = &mut deadline, if deadline_armed => {
                    deadline_armed = false;
                    if self.state.settle_if_unresolved() {
                        warn!("session unresolved at startup timeout; presenting signed-out");
                    }
                }
            }
        }
        debug!("session reconciler stopped");
    }

    async fn handle_change(&mut self, change: SessionChange) {
        debug!(event = ?change.event, "session change received");
        let session = match change.session {
            Some(session) if change.event != SessionEventKind::SignedOut => session,
            _ => {
                // Sign-out, or a sign-in shaped event with no session.
                let token = self.state.next_token();
                self.state.commit(token, SessionState::Unauthenticated);
                return;
            }
        };
        if !self.state.claim_identity(&session.identity.id) {
            debug!(
                id = %session.identity.id,
                "identity already reflected; skipping resolution"
            );
            return;
        }
        let token = self.state.next_token();
        resolve_session(
            self.provider.as_ref(),
            &self.state,
            token,
            &session,
            self.config.post_auth_profile_attempts,
            self.config.profile_retry_backoff,
        )
        .await;
    }
}
