//! Joining, creating and administering stores after sign-in.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use tienda_access::{AuthView, StoreError, StoreProvider};
use tienda_core::{Destination, Role, StoreId, StoreSettings};
use tienda_integration_tests::{Harness, secret};

async fn signed_in(harness: &Harness, email: &str, role: Role) {
    harness.backend.add_account("Cliente", email, "pw", role);
    harness
        .flow(AuthView::Login)
        .submit_login(email, &secret("pw"))
        .await
        .unwrap();
}

async fn owner_signed_in(harness: &Harness) {
    harness
        .flow(AuthView::Login)
        .submit_login("rosa@x.com", &secret("pw"))
        .await
        .unwrap();
}

fn with_store(harness: &Harness) {
    let rosa = harness
        .backend
        .add_account("Rosa", "rosa@x.com", "pw", Role::Owner);
    harness.backend.add_store(42, "Abarrotes Lupita", rosa.user_id, "1234");
}

#[tokio::test]
async fn test_wrong_pin_leaves_staff_on_join_store() {
    let harness = Harness::new();
    with_store(&harness);
    signed_in(&harness, "luis@x.com", Role::Staff).await;

    let err = harness
        .onboarding()
        .join(StoreId::new(42), &secret("0000"))
        .await
        .unwrap_err();

    assert_eq!(err, StoreError::InvalidPin);
    assert_eq!(harness.backend.calls("assign_store"), 0);
    assert!(!harness.session.current().unwrap().has_store());
    assert_eq!(harness.guard().navigate("/home"), Destination::JoinStore);
}

#[tokio::test]
async fn test_join_updates_session_and_lands() {
    let harness = Harness::new();
    with_store(&harness);
    signed_in(&harness, "luis@x.com", Role::Staff).await;

    let destination = harness
        .onboarding()
        .join(StoreId::new(42), &secret("1234"))
        .await
        .unwrap();

    assert_eq!(destination, Destination::Landing);
    assert_eq!(harness.navigator.last(), Some(Destination::Landing));
    assert_eq!(
        harness.session.current().unwrap().store_id,
        Some(StoreId::new(42))
    );
}

#[tokio::test]
async fn test_owner_creates_store_and_opens_admin() {
    let harness = Harness::new();
    signed_in(&harness, "pepe@x.com", Role::Owner).await;
    assert_eq!(harness.guard().navigate("/admin"), Destination::CreateStore);

    let destination = harness.onboarding().create("Tortillería Pepe").await.unwrap();

    assert_eq!(destination, Destination::AdminPanel);
    assert!(harness.session.current().unwrap().has_store());
    assert_eq!(harness.guard().navigate("/create-store"), Destination::AdminPanel);
}

#[tokio::test]
async fn test_search_lists_owner_names() {
    let harness = Harness::new();
    with_store(&harness);
    signed_in(&harness, "luis@x.com", Role::Staff).await;

    let onboarding = harness.onboarding();
    let listings = onboarding.search("lupita").await.unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].owner_name, "Rosa");
    assert!(onboarding.search("panadería").await.unwrap().is_empty());
    assert!(onboarding.search("  ").await.unwrap().is_empty());
    assert_eq!(harness.backend.calls("search_stores"), 2);
}

#[tokio::test]
async fn test_unknown_store() {
    let harness = Harness::new();
    signed_in(&harness, "luis@x.com", Role::Staff).await;

    assert_eq!(
        harness.onboarding().store(StoreId::new(99)).await.unwrap_err(),
        StoreError::NotFound
    );
}

#[tokio::test]
async fn test_backend_outage_during_join_keeps_session() {
    let harness = Harness::new();
    with_store(&harness);
    signed_in(&harness, "luis@x.com", Role::Staff).await;
    harness.backend.take_down();

    let err = harness
        .onboarding()
        .join(StoreId::new(42), &secret("1234"))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(harness.session.is_signed_in());
    assert!(!harness.session.current().unwrap().has_store());
}

#[tokio::test]
async fn test_owner_changes_pin_and_staff_must_use_the_new_one() {
    let harness = Harness::new();
    with_store(&harness);
    owner_signed_in(&harness).await;

    harness.onboarding().update_pin(&secret("5678")).await.unwrap();
    assert_eq!(harness.backend.pin(StoreId::new(42)).as_deref(), Some("5678"));
    harness.flow(AuthView::Login).logout();

    signed_in(&harness, "luis@x.com", Role::Staff).await;
    let onboarding = harness.onboarding();
    assert_eq!(
        onboarding.join(StoreId::new(42), &secret("1234")).await.unwrap_err(),
        StoreError::InvalidPin
    );
    assert_eq!(
        onboarding.join(StoreId::new(42), &secret("5678")).await.unwrap(),
        Destination::Landing
    );
}

#[tokio::test]
async fn test_owner_updates_settings_and_lists_staff() {
    let harness = Harness::new();
    with_store(&harness);
    let luis = harness
        .backend
        .add_account("Luis", "luis@x.com", "pw", Role::Staff);
    harness
        .backend
        .assign_store(luis.user_id, StoreId::new(42))
        .await
        .unwrap();
    owner_signed_in(&harness).await;

    let onboarding = harness.onboarding();
    let settings = StoreSettings {
        name: "Abarrotes Doña Lupita".to_string(),
        email: Some("lupita@x.com".to_string()),
        phone: Some("  ".to_string()),
        image: None,
    };
    onboarding.update_settings(settings).await.unwrap();

    let store = onboarding.store(StoreId::new(42)).await.unwrap();
    assert_eq!(store.name, "Abarrotes Doña Lupita");
    assert_eq!(store.email.as_deref(), Some("lupita@x.com"));
    assert!(store.phone.is_none());

    let staff = onboarding.staff().await.unwrap();
    let names: Vec<&str> = staff.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["Rosa", "Luis"]);
}

#[tokio::test]
async fn test_staff_cannot_administer_their_store() {
    let harness = Harness::new();
    with_store(&harness);
    signed_in(&harness, "luis@x.com", Role::Staff).await;
    harness
        .onboarding()
        .join(StoreId::new(42), &secret("1234"))
        .await
        .unwrap();

    let onboarding = harness.onboarding();
    assert_eq!(
        onboarding.update_pin(&secret("0000")).await.unwrap_err(),
        StoreError::Forbidden
    );
    assert_eq!(onboarding.staff().await.unwrap_err(), StoreError::Forbidden);
    assert_eq!(harness.backend.calls("update_pin"), 0);
    assert_eq!(harness.backend.pin(StoreId::new(42)).as_deref(), Some("1234"));
}
