//! Authentication test helpers
//!
//! Builders for the JSON bodies the auth backend returns.

use serde_json::{json, Value};
use uuid::Uuid;

/// Test user credentials
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl TestUser {
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password: "password123".to_string(),
            token: format!("token-{}", Uuid::new_v4()),
        }
    }

    /// GoTrue user object
    pub fn user_json(&self) -> Value {
        json!({
            "id": self.id,
            "aud": "authenticated",
            "role": "authenticated",
            "email": self.email,
            "created_at": "2024-01-01T00:00:00Z",
            "user_metadata": {}
        })
    }

    /// GoTrue token response
    pub fn session_json(&self) -> Value {
        json!({
            "access_token": self.token,
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": format!("refresh-{}", self.id),
            "user": self.user_json()
        })
    }

    pub fn credentials_json(&self) -> Value {
        json!({ "email": self.email, "password": self.password })
    }
}

/// Create authorization header value
pub fn auth_header(token: &str) -> String {
    format!("Bearer {}", token)
}
