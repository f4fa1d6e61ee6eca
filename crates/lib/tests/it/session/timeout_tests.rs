//! The startup safety timeout: loading always ends, and the forced answer
//! never overrides work that is still in flight.

use std::time::Duration;

use super::helpers::*;

#[tokio::test]
async fn startup_settles_signed_out_within_the_timeout() {
    // No hydrate call, no events: nothing will ever resolve on its own.
    let (_provider, manager) = setup();

    let snapshot = manager.snapshot();
    assert!(snapshot.state.is_unknown());
    assert!(snapshot.is_loading);

    let snapshot = wait_for_snapshot(&manager, Duration::from_secs(1), |s| !s.is_loading).await;
    assert!(!snapshot.state.is_authenticated());
    assert!(snapshot.user().is_none());
}

#[tokio::test]
async fn the_forced_answer_never_tramples_an_in_flight_login() {
    let mut config = fast_config();
    config.startup_timeout = Duration::from_millis(50);
    let (provider, manager) = setup_with_config(config);
    provider.add_account(ANA_EMAIL, ANA_PASSWORD, "Ana").unwrap();
    provider.set_auth_delay(ANA_EMAIL, Duration::from_millis(300));

    let login = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.login(ANA_EMAIL, ANA_PASSWORD).await })
    };

    // Past the timeout but before the login resolves: the state has been
    // forced to signed-out while the operation still shows as loading.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let snapshot = manager.snapshot();
    assert!(!snapshot.state.is_unknown());
    assert!(!snapshot.state.is_authenticated());
    assert!(snapshot.is_loading);

    // The login lands afterwards and wins: the forced answer consumed no
    // operation token.
    let user = login.await.unwrap().unwrap();
    assert_eq!(user.email, ANA_EMAIL);
    let snapshot = manager.snapshot();
    assert!(snapshot.state.is_authenticated());
    assert!(!snapshot.is_loading);
}

#[tokio::test]
async fn start_is_idempotent() {
    let (_provider, manager, _id) = setup_with_ana();
    manager.start();
    manager.start();

    let user = manager.login(ANA_EMAIL, ANA_PASSWORD).await.unwrap();
    assert_eq!(user.email, ANA_EMAIL);
}
