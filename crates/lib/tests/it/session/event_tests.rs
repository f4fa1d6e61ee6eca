//! Provider-pushed session changes: sign-ins from other surfaces, token
//! refreshes, and sign-outs, deduplicated against what the local state
//! already reflects.

use std::time::Duration;

use cinelog::{AuthIdentity, ProviderSession, SessionChange, SessionEventKind};

use super::helpers::*;

fn session_for(id: &str, email: &str, name: &str) -> ProviderSession {
    ProviderSession {
        identity: AuthIdentity {
            id: id.to_string(),
            email: email.to_string(),
            display_name: Some(name.to_string()),
        },
        access_token: "tok-events".to_string(),
    }
}

fn signed_in(id: &str) -> SessionChange {
    SessionChange {
        event: SessionEventKind::SignedIn,
        session: Some(session_for(id, ANA_EMAIL, "Ana")),
    }
}

#[tokio::test]
async fn sign_in_event_reconciles_to_authenticated() {
    let (provider, manager, id) = setup_with_ana();

    provider.emit_event(signed_in(&id));

    let snapshot =
        wait_for_snapshot(&manager, Duration::from_secs(1), |s| s.state.is_authenticated()).await;
    assert_eq!(snapshot.user().map(|u| u.id.as_str()), Some(id.as_str()));
}

#[tokio::test]
async fn initial_session_event_behaves_like_a_sign_in() {
    let (provider, manager, id) = setup_with_ana();

    provider.emit_event(SessionChange {
        event: SessionEventKind::InitialSession,
        session: Some(session_for(&id, ANA_EMAIL, "Ana")),
    });

    let snapshot =
        wait_for_snapshot(&manager, Duration::from_secs(1), |s| s.state.is_authenticated()).await;
    assert_eq!(snapshot.user().map(|u| u.id.as_str()), Some(id.as_str()));
}

#[tokio::test]
async fn duplicate_sign_in_events_read_the_profile_once() {
    let (provider, manager, id) = setup_with_ana();

    provider.emit_event(signed_in(&id));
    provider.emit_event(signed_in(&id));

    wait_for_snapshot(&manager, Duration::from_secs(1), |s| s.state.is_authenticated()).await;
    // Give the actor time to drain the second event before counting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.metrics().profile_reads, 1);
}

#[tokio::test]
async fn token_refresh_after_login_is_deduplicated() {
    let (provider, manager, id) = setup_with_ana();
    manager.login(ANA_EMAIL, ANA_PASSWORD).await.unwrap();
    let reads = provider.metrics().profile_reads;

    provider.emit_event(SessionChange {
        event: SessionEventKind::TokenRefreshed,
        session: Some(session_for(&id, ANA_EMAIL, "Ana")),
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(manager.snapshot().state.is_authenticated());
    assert_eq!(provider.metrics().profile_reads, reads);
}

#[tokio::test]
async fn signed_out_event_clears_the_session() {
    let (provider, manager, _id) = setup_with_ana();
    manager.login(ANA_EMAIL, ANA_PASSWORD).await.unwrap();

    provider.emit_event(SessionChange {
        event: SessionEventKind::SignedOut,
        session: None,
    });

    wait_for_snapshot(&manager, Duration::from_secs(1), |s| !s.state.is_authenticated()).await;
    assert!(manager.current_user().is_none());
}

#[tokio::test]
async fn sign_out_then_sign_in_resolves_the_profile_again() {
    let (provider, manager, id) = setup_with_ana();
    manager.login(ANA_EMAIL, ANA_PASSWORD).await.unwrap();
    assert_eq!(provider.metrics().profile_reads, 1);

    provider.emit_event(SessionChange {
        event: SessionEventKind::SignedOut,
        session: None,
    });
    wait_for_snapshot(&manager, Duration::from_secs(1), |s| !s.state.is_authenticated()).await;

    // The sign-out released the identity claim, so this is fresh again.
    provider.emit_event(signed_in(&id));
    wait_for_snapshot(&manager, Duration::from_secs(1), |s| s.state.is_authenticated()).await;
    assert_eq!(provider.metrics().profile_reads, 2);
}

#[tokio::test]
async fn sign_in_event_without_a_session_means_signed_out() {
    let (provider, manager, _id) = setup_with_ana();

    provider.emit_event(SessionChange {
        event: SessionEventKind::SignedIn,
        session: None,
    });

    let snapshot = wait_for_snapshot(&manager, Duration::from_secs(1), |s| {
        !s.state.is_unknown() && !s.is_loading
    })
    .await;
    assert!(!snapshot.state.is_authenticated());
}

#[tokio::test]
async fn event_profile_exhaustion_falls_back_to_signed_out() {
    let (provider, manager, id) = setup_with_ana();
    // More lag than the post-auth budget of 5 attempts.
    provider.set_profile_lag(10);

    provider.emit_event(signed_in(&id));

    let snapshot = wait_for_snapshot(&manager, Duration::from_secs(2), |s| {
        !s.state.is_unknown() && !s.is_loading
    })
    .await;
    assert!(!snapshot.state.is_authenticated());
    assert_eq!(provider.metrics().profile_reads, 5);
}
