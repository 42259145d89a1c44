//! Functional tests for session precedence and view-mode authorization.
//!
//! These exercise the resolver over the in-memory providers end to end:
//! - a real session always wins over a persisted demo blob
//! - demo-to-real transitions replace identity, never merge it
//! - persisted overlays are revalidated server-side and discarded for
//!   non-super-admins

use agora_identity::{AuthEvent, AuthSession, Profile, Role, SessionCache};
use agora_test_utils::{
    demo_session, identity_fixture, seed_signed_in, super_admin_profile,
};
use pretty_assertions::assert_eq;

/// Tenet: with both a persisted demo blob and a live provider session at
/// startup, the real session is the identity and the demo blob is cleared.
#[tokio::test]
async fn real_session_wins_over_demo_blob_at_startup() {
    let fixture = identity_fixture();
    fixture
        .cache
        .store_demo(&demo_session(Role::Citizen))
        .await
        .unwrap();

    let profile = Profile::new(agora_identity::ActorId::new(), Role::Business, "Biz");
    seed_signed_in(&fixture, profile.clone());

    fixture.resolver.bootstrap().await.unwrap();

    let actor = fixture.resolver.current_actor().await.unwrap();
    assert!(actor.state.is_real());
    assert_eq!(actor.effective_role, Some(Role::Business));
    assert_eq!(actor.actor_id, Some(profile.actor_id));
    assert!(fixture.cache.load_demo().await.unwrap().is_none());
}

/// Tenet: an actor in a demo session whose provider later reports a real
/// session for a *different* actor ends up with the real actor's role; the
/// demo identity is replaced, not merged.
#[tokio::test]
async fn demo_to_real_transition_replaces_identity() {
    let fixture = identity_fixture();
    fixture.resolver.bootstrap().await.unwrap();
    fixture
        .resolver
        .start_demo(demo_session(Role::Citizen))
        .await
        .unwrap();
    assert_eq!(
        fixture.resolver.current_actor().await.unwrap().effective_role,
        Some(Role::Citizen)
    );

    let admin = super_admin_profile();
    let admin_id = admin.actor_id;
    fixture.profiles.insert(admin);
    fixture
        .resolver
        .handle_event(AuthEvent::SignedIn(AuthSession::new(
            admin_id,
            "root@agora.test",
            "tok",
        )))
        .await;

    let actor = fixture.resolver.current_actor().await.unwrap();
    assert!(actor.state.is_real());
    assert_eq!(actor.actor_id, Some(admin_id));
    assert_eq!(actor.effective_role, Some(Role::Admin));
    assert!(fixture.cache.load_demo().await.unwrap().is_none());
}

/// Tenet: a persisted overlay survives bootstrap only for actors the
/// authoritative check confirms as super-admin; everyone else falls back to
/// their stored role and the stale overlay is purged.
#[tokio::test]
async fn persisted_overlay_requires_server_side_confirmation() {
    // Non-super-admin with a (client-forged) persisted overlay.
    let fixture = identity_fixture();
    fixture.cache.store_overlay(Role::Admin).await.unwrap();
    let profile = Profile::new(agora_identity::ActorId::new(), Role::Ngo, "NGO");
    seed_signed_in(&fixture, profile);
    fixture.resolver.bootstrap().await.unwrap();

    let actor = fixture.resolver.current_actor().await.unwrap();
    assert_eq!(actor.view_overlay, None);
    assert_eq!(actor.effective_role, Some(Role::Ngo));
    assert!(fixture.cache.load_overlay().await.unwrap().is_none());

    // Confirmed super-admin keeps the overlay.
    let fixture = identity_fixture();
    fixture.cache.store_overlay(Role::Citizen).await.unwrap();
    let admin = super_admin_profile();
    fixture.verifier.grant_super_admin(admin.actor_id);
    seed_signed_in(&fixture, admin);
    fixture.resolver.bootstrap().await.unwrap();

    let actor = fixture.resolver.current_actor().await.unwrap();
    assert_eq!(actor.view_overlay, Some(Role::Citizen));
    assert_eq!(actor.effective_role, Some(Role::Citizen));
}

/// Tenet: sign-in through the resolver establishes a real session and a
/// failed sign-in surfaces a typed authentication error without state change.
#[tokio::test]
async fn sign_in_flow_and_typed_failure() {
    let fixture = identity_fixture();
    let profile = Profile::new(agora_identity::ActorId::new(), Role::Expert, "Expert");
    fixture
        .auth
        .seed_account("expert@agora.test", "hunter2", profile.actor_id);
    fixture.profiles.insert(profile);
    fixture.resolver.bootstrap().await.unwrap();

    let err = fixture
        .resolver
        .sign_in("expert@agora.test", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, agora_identity::IdentityError::Authentication(_)));
    assert!(!fixture.resolver.session_state().await.is_real());

    fixture
        .resolver
        .sign_in("expert@agora.test", "hunter2")
        .await
        .unwrap();
    let actor = fixture.resolver.current_actor().await.unwrap();
    assert_eq!(actor.effective_role, Some(Role::Expert));
}

/// Tenet: auth events flowing through the spawned listener drive the same
/// transitions as direct calls.
#[tokio::test]
async fn listener_applies_provider_events() {
    let fixture = identity_fixture();
    fixture.resolver.bootstrap().await.unwrap();

    let profile = Profile::new(agora_identity::ActorId::new(), Role::Government, "Gov");
    let actor_id = profile.actor_id;
    fixture.profiles.insert(profile);

    let handle = fixture.resolver.spawn_listener();
    fixture.auth.emit(AuthEvent::SignedIn(AuthSession::new(
        actor_id,
        "gov@agora.test",
        "tok",
    )));

    // Give the listener a chance to run.
    tokio::task::yield_now().await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let actor = fixture.resolver.current_actor().await.unwrap();
    assert_eq!(actor.effective_role, Some(Role::Government));
    handle.abort();
}
