//! End-to-end gateway scenarios over the in-memory provider

use std::sync::Arc;

use rolegate::gateway::{RoleLookup, SessionGateway};
use rolegate::provider::MemoryProvider;
use rolegate::shared::{AccessDecision, AuthEvent, GatewayConfig, Role};
use serde_json::json;

fn gateway() -> (Arc<MemoryProvider>, SessionGateway) {
    let provider = Arc::new(MemoryProvider::new());
    let gateway = SessionGateway::from_provider(provider.clone());
    (provider, gateway)
}

#[tokio::test]
async fn test_promotion_flow() {
    let (provider, gateway) = gateway();

    // bootstrap admin exists out of band
    let admin = provider.register("admin@example.com", "password123").await;
    provider
        .seed("user_roles", vec![json!({ "user_id": admin.id, "role": "admin" })])
        .await;

    let signup = gateway.sign_up("writer@example.com", "password123").await;
    let writer_id = crate::assert_success!(signup).user.expect("user created").id;
    assert_eq!(
        gateway.check_access(Role::Editor).evaluate().await,
        AccessDecision::deny("Permission denied: editor role required")
    );

    // a plain user cannot promote themselves
    assert!(!gateway.update_user_role(writer_id, Role::Editor).await);
    gateway.sign_out().await;

    assert!(gateway.sign_in("admin@example.com", "password123").await.success);
    assert!(gateway.is_admin().await);
    assert!(gateway.update_user_role(writer_id, Role::Editor).await);
    gateway.sign_out().await;

    assert!(gateway.sign_in("writer@example.com", "password123").await.success);
    let current = gateway.current_user().await.expect("signed in");
    assert_eq!(current.role, Role::Editor);
    assert!(gateway.check_access(Role::Editor).evaluate().await.allowed);
    assert!(!gateway.check_access(Role::Admin).evaluate().await.allowed);
    assert!(!gateway.is_admin().await);
}

#[tokio::test]
async fn test_demotion_requires_removing_the_row() {
    let (provider, gateway) = gateway();
    let admin = provider.register("admin@example.com", "password123").await;
    let other = provider.register("other@example.com", "password123").await;
    provider
        .seed(
            "user_roles",
            vec![
                json!({ "user_id": admin.id, "role": "admin" }),
                json!({ "user_id": other.id, "role": "admin" }),
            ],
        )
        .await;
    gateway.sign_in("admin@example.com", "password123").await;

    // writes add rows; the admin row still wins
    assert!(gateway.update_user_role(other.id, Role::User).await);
    assert_eq!(gateway.get_user_role(other.id).await, Role::Admin);

    assert!(gateway.revoke_admin(other.id).await);
    assert_eq!(
        gateway.resolve_role(other.id).await,
        RoleLookup::Assigned(Role::User)
    );
}

#[tokio::test]
async fn test_configured_tables_are_used() {
    let provider = Arc::new(MemoryProvider::new());
    provider.define_table("app_roles", &["user_id", "role"]).await;
    let config = GatewayConfig::builder()
        .url("http://localhost:54321")
        .anon_key("anon")
        .role_table("app_roles")
        .login_redirect("/signin")
        .build()
        .unwrap();
    let gateway = SessionGateway::from_provider(provider.clone()).with_config(&config);

    let signup = gateway.sign_up("user@example.com", "password123").await;
    assert!(signup.success);
    assert_eq!(provider.rows("app_roles").await.len(), 1);
    assert!(provider.rows("user_roles").await.is_empty());
    assert_eq!(gateway.login_redirect(), "/signin");
}

#[tokio::test]
async fn test_unrecognized_role_is_denied_everywhere() {
    let (provider, gateway) = gateway();
    let identity = provider.register("guest@example.com", "password123").await;
    provider
        .seed("user_roles", vec![json!({ "user_id": identity.id, "role": "guest" })])
        .await;
    gateway.sign_in("guest@example.com", "password123").await;

    let current = gateway.current_user().await.unwrap();
    assert_eq!(current.role, Role::from("guest"));
    for required in Role::KNOWN {
        assert!(!gateway.check_access(required).evaluate().await.allowed);
    }
}

#[tokio::test]
async fn test_expired_session_is_refreshed_transparently() {
    let (provider, gateway) = gateway();
    provider.register("user@example.com", "password123").await;
    let first = gateway.sign_in("user@example.com", "password123").await;
    let first_token = crate::assert_success!(first).access_token;
    provider.expire_session().await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let subscription = gateway
        .init_auth(move |change| {
            let _ = tx.send(change);
        })
        .await;

    let initial = rx.recv().await.unwrap();
    assert_eq!(initial.event, AuthEvent::InitialSession);
    let refreshed = initial.session.expect("refreshed session");
    assert_ne!(refreshed.access_token, first_token);
    assert_eq!(rx.recv().await.map(|c| c.event), Some(AuthEvent::TokenRefreshed));

    assert!(gateway.check_access(Role::User).evaluate().await.allowed);
    subscription.unsubscribe();
}

#[tokio::test]
async fn test_current_user_serializes_flat() {
    let (_, gateway) = gateway();
    gateway.sign_up("user@example.com", "password123").await;

    let current = gateway.current_user().await.unwrap();
    let value = serde_json::to_value(&current).unwrap();
    assert_eq!(value["email"], "user@example.com");
    assert_eq!(value["role"], "user");
    assert_eq!(value["id"], json!(current.id()));
}
