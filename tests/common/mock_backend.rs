//! Mock backend helpers for integration tests
//!
//! Starts a wiremock server standing in for the hosted auth/database backend
//! and wires an `HttpProvider` + `SessionGateway` to it.

use std::sync::Arc;

use rolegate::gateway::SessionGateway;
use rolegate::provider::HttpProvider;
use rolegate::shared::GatewayConfig;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::auth_helpers::TestUser;

pub const ANON_KEY: &str = "test-anon-key";

/// Mock backend with a provider and gateway pointed at it
pub struct MockBackend {
    pub server: MockServer,
    pub provider: Arc<HttpProvider>,
    pub gateway: SessionGateway,
}

impl MockBackend {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let config = GatewayConfig::builder()
            .url(server.uri())
            .anon_key(ANON_KEY)
            .build()
            .expect("mock server URI is a valid config");
        let provider = Arc::new(HttpProvider::new(config.clone()).expect("provider builds"));
        let gateway = SessionGateway::from_provider(provider.clone()).with_config(&config);
        Self {
            server,
            provider,
            gateway,
        }
    }

    /// Password grant for `user` answers with a session
    pub async fn accept_sign_in(&self, user: &TestUser) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", ANON_KEY))
            .and(body_json(user.credentials_json()))
            .respond_with(ResponseTemplate::new(200).set_body_json(user.session_json()))
            .mount(&self.server)
            .await;
    }

    /// Role rows of `user` as seen with their bearer token
    pub async fn serve_roles(&self, user: &TestUser, roles: &[&str]) {
        let rows: Vec<_> = roles
            .iter()
            .map(|role| serde_json::json!({ "role": role }))
            .collect();
        Mock::given(method("GET"))
            .and(path("/rest/v1/user_roles"))
            .and(query_param("select", "role"))
            .and(query_param("user_id", format!("eq.{}", user.id)))
            .and(header("authorization", super::auth_header(&user.token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.server)
            .await;
    }

    /// Sign `user` in through the gateway, asserting success
    pub async fn sign_in(&self, user: &TestUser) {
        self.accept_sign_in(user).await;
        let result = self.gateway.sign_in(&user.email, &user.password).await;
        assert!(result.success, "sign-in failed: {:?}", result.error);
    }
}
