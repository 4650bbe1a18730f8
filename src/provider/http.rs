/**
 * HTTP Provider
 *
 * Speaks the GoTrue auth API (`/auth/v1/...`) and the PostgREST table API
 * (`/rest/v1/{table}`) of a hosted backend over reqwest.
 *
 * Every request carries the project's `apikey` header and an
 * `Authorization: Bearer` header holding the session's access token, or the
 * anon key when no session exists. The session itself lives only in memory;
 * callers that persist it across runs hand it back through
 * [`HttpProvider::set_session`].
 */

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

use crate::provider::error::ErrorBody;
use crate::provider::{AuthProvider, ProviderError, Query, RecordStore, EVENT_CHANNEL_CAPACITY};
use crate::shared::config::GatewayConfig;
use crate::shared::event::{AuthEvent, AuthStateChange};
use crate::shared::types::{Credentials, Identity, Session, SignUpData};

/// Backend client over HTTP
pub struct HttpProvider {
    config: GatewayConfig,
    client: Client,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthStateChange>,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("url", &self.config.url)
            .finish_non_exhaustive()
    }
}

impl HttpProvider {
    pub fn new(config: GatewayConfig) -> Result<Self, ProviderError> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            client,
            session: RwLock::new(None),
            events,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Adopt a previously issued session, e.g. one restored from storage
    pub async fn set_session(&self, session: Session) {
        let session = session.stamped(Utc::now());
        *self.session.write().await = Some(session.clone());
        self.emit(AuthStateChange::signed_in(session));
    }

    fn emit(&self, change: AuthStateChange) {
        match self.events.send(change) {
            Ok(count) => tracing::debug!("[Auth] session change sent to {} subscribers", count),
            Err(_) => tracing::debug!("[Auth] no subscribers for session change"),
        }
    }

    fn with_keys(&self, request: RequestBuilder, bearer: &str) -> RequestBuilder {
        request
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    /// Bearer for table requests: the session token if signed in
    async fn table_bearer(&self) -> String {
        match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.config.anon_key.clone(),
        }
    }

    /// Turn a non-success response into `ProviderError::Api`
    async fn check(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let fallback = status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
        let body = response.text().await.unwrap_or_default();
        Err(ErrorBody::into_error(status.as_u16(), &body, &fallback))
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
        let response = Self::check(request.send().await?).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("{} in body: {}", e, truncate(&body, 200)))
        })
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), ProviderError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        tracing::debug!("[Auth] refreshing expired session");
        let request = self
            .with_keys(
                self.client
                    .post(self.config.auth_url("/token"))
                    .query(&[("grant_type", "refresh_token")]),
                &self.config.anon_key,
            )
            .json(&serde_json::json!({ "refresh_token": refresh_token }));

        let session: Session = Self::send_json(request).await?;
        Ok(session.stamped(Utc::now()))
    }
}

fn truncate(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// GoTrue answers `/signup` with a session when confirmation is off and with
/// the bare user when it is on.
fn parse_sign_up(body: Value) -> Result<SignUpData, ProviderError> {
    if body.get("access_token").is_some() {
        let session: Session = serde_json::from_value(body)?;
        let session = session.stamped(Utc::now());
        return Ok(SignUpData {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }
    if let Some(user) = body.get("user") {
        let user: Identity = serde_json::from_value(user.clone())?;
        return Ok(SignUpData {
            user: Some(user),
            session: None,
        });
    }
    if body.get("id").is_some() {
        let user: Identity = serde_json::from_value(body)?;
        return Ok(SignUpData {
            user: Some(user),
            session: None,
        });
    }
    Err(ProviderError::InvalidResponse(
        "sign-up response has neither a session nor a user".to_string(),
    ))
}

#[async_trait]
impl AuthProvider for HttpProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpData, ProviderError> {
        let request = self
            .with_keys(self.client.post(self.config.auth_url("/signup")), &self.config.anon_key)
            .json(credentials);

        let body: Value = Self::send_json(request).await?;
        let data = parse_sign_up(body)?;

        if let Some(session) = &data.session {
            *self.session.write().await = Some(session.clone());
            self.emit(AuthStateChange::signed_in(session.clone()));
        }
        Ok(data)
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, ProviderError> {
        let request = self
            .with_keys(
                self.client
                    .post(self.config.auth_url("/token"))
                    .query(&[("grant_type", "password")]),
                &self.config.anon_key,
            )
            .json(credentials);

        let session: Session = Self::send_json(request).await?;
        let session = session.stamped(Utc::now());

        *self.session.write().await = Some(session.clone());
        self.emit(AuthStateChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let token = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => return Ok(()),
        };

        let request = self.with_keys(self.client.post(self.config.auth_url("/logout")), &token);
        match Self::send_empty(request).await {
            Ok(()) => {}
            // token already revoked or expired server side; clear locally anyway
            Err(ProviderError::Api { status: 401 | 403 | 404, .. }) => {
                tracing::debug!("[Auth] logout for an already invalid session");
            }
            Err(e) => return Err(e),
        }

        *self.session.write().await = None;
        self.emit(AuthStateChange::signed_out());
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let current = self.session.read().await.clone();
        let session = match current {
            Some(session) => session,
            None => return Ok(None),
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let refresh_token = match session.refresh_token.as_deref() {
            Some(token) => token.to_string(),
            None => {
                *self.session.write().await = None;
                self.emit(AuthStateChange::signed_out());
                return Ok(None);
            }
        };

        match self.refresh(&refresh_token).await {
            Ok(refreshed) => {
                *self.session.write().await = Some(refreshed.clone());
                self.emit(AuthStateChange::token_refreshed(refreshed.clone()));
                Ok(Some(refreshed))
            }
            // outage: keep the expired session so a later call can retry
            Err(e) if e.is_retryable() => {
                tracing::warn!("[Auth] session refresh failed, will retry: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("[Auth] session refresh rejected: {}", e);
                *self.session.write().await = None;
                self.emit(AuthStateChange::signed_out());
                Err(e)
            }
        }
    }

    async fn get_user(&self) -> Result<Option<Identity>, ProviderError> {
        let session = match self.get_session().await? {
            Some(session) => session,
            None => return Ok(None),
        };

        let request = self.with_keys(
            self.client.get(self.config.auth_url("/user")),
            &session.access_token,
        );
        let user: Identity = Self::send_json(request).await?;

        if user != session.user {
            let updated = {
                let mut guard = self.session.write().await;
                guard.as_mut().map(|stored| {
                    stored.user = user.clone();
                    stored.clone()
                })
            };
            if let Some(updated) = updated {
                self.emit(AuthStateChange::new(AuthEvent::UserUpdated, Some(updated)));
            }
        }
        Ok(Some(user))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RecordStore for HttpProvider {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ProviderError> {
        let bearer = self.table_bearer().await;
        let request = self.with_keys(
            self.client
                .get(self.config.rest_url(&query.table))
                .query(&query.to_query_pairs()),
            &bearer,
        );
        Self::send_json(request).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), ProviderError> {
        let bearer = self.table_bearer().await;
        let request = self
            .with_keys(self.client.post(self.config.rest_url(table)), &bearer)
            .header("Prefer", "return=minimal")
            .json(&rows);
        Self::send_empty(request).await
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<(), ProviderError> {
        let bearer = self.table_bearer().await;
        let request = self
            .with_keys(self.client.post(self.config.rest_url(table)), &bearer)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&rows);
        Self::send_empty(request).await
    }

    async fn delete(&self, query: &Query) -> Result<(), ProviderError> {
        let bearer = self.table_bearer().await;
        let request = self.with_keys(
            self.client
                .delete(self.config.rest_url(&query.table))
                .query(&query.to_query_pairs()),
            &bearer,
        );
        Self::send_empty(request).await
    }
}
