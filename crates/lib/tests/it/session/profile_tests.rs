//! Profile updates on a live session.

use cinelog::{ProfilePatch, ProfileStore};

use super::helpers::*;

#[tokio::test]
async fn rename_updates_the_user_everywhere() {
    let (provider, manager) = setup();
    let user = manager.register("Ana", ANA_EMAIL, "abcdef", None).await.unwrap();

    let renamed = manager
        .update_profile(ProfilePatch::rename("Ana Luiza"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Ana Luiza");
    assert_eq!(renamed.id, user.id);

    // Visible in the snapshot and in the backing row.
    assert_eq!(manager.current_user().map(|u| u.name), Some("Ana Luiza".to_string()));
    let row = provider.read_profile(&user.id).await.unwrap().unwrap();
    assert_eq!(row.name, "Ana Luiza");
    assert!(row.updated_at.is_some());
}

#[tokio::test]
async fn blank_rename_is_rejected_before_the_network() {
    let (provider, manager) = setup();
    manager.register("Ana", ANA_EMAIL, "abcdef", None).await.unwrap();

    let err = manager
        .update_profile(ProfilePatch::rename("   "))
        .await
        .unwrap_err();
    assert!(err.is_validation_error());

    // No update call went out and the stored name is untouched.
    assert_eq!(provider.metrics().profile_updates, 0);
    assert_eq!(manager.current_user().map(|u| u.name), Some("Ana".to_string()));
}

#[tokio::test]
async fn an_empty_patch_is_rejected() {
    let (_provider, manager) = setup();
    manager.register("Ana", ANA_EMAIL, "abcdef", None).await.unwrap();

    let err = manager.update_profile(ProfilePatch::default()).await.unwrap_err();
    assert!(err.is_validation_error());
}

#[tokio::test]
async fn updating_without_a_session_is_rejected() {
    let (provider, manager) = setup();
    manager.hydrate().await;

    let err = manager
        .update_profile(ProfilePatch::rename("Ana"))
        .await
        .unwrap_err();
    assert!(err.is_authentication_error());
    assert_eq!(provider.metrics().profile_updates, 0);
}

#[tokio::test]
async fn the_avatar_can_be_set_and_cleared() {
    let (_provider, manager) = setup();
    manager.register("Ana", ANA_EMAIL, "abcdef", None).await.unwrap();

    let user = manager
        .update_profile(ProfilePatch::set_avatar("https://cdn.test/ana.png"))
        .await
        .unwrap();
    assert_eq!(user.avatar_url.as_deref(), Some("https://cdn.test/ana.png"));

    let user = manager.update_profile(ProfilePatch::clear_avatar()).await.unwrap();
    assert_eq!(user.avatar_url, None);
}
