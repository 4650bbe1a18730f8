//! In-memory backend
//!
//! Implements both provider traits against process-local state so the
//! gateway can run without a hosted backend. Accounts, the current session
//! and table rows sit behind one `tokio::sync::RwLock`.
//!
//! Tables upsert on a primary key declared with [`MemoryProvider::define_table`].
//! The defaults mirror the hosted schema: `user_roles` keyed on
//! `(user_id, role)` and `profiles` keyed on `id`.
//!
//! Failures can be injected per table ([`MemoryProvider::fail_table`]) or for
//! every call ([`MemoryProvider::set_unavailable`]).

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::provider::{AuthProvider, ProviderError, Query, RecordStore, EVENT_CHANNEL_CAPACITY};
use crate::shared::config::{DEFAULT_PROFILE_TABLE, DEFAULT_ROLE_TABLE};
use crate::shared::event::AuthStateChange;
use crate::shared::types::{Credentials, Identity, Session, SignUpData};

/// Minimum password length enforced on sign-up
pub const MIN_PASSWORD_LEN: usize = 6;

const SESSION_LIFETIME_SECS: i64 = 3600;

struct Account {
    identity: Identity,
    password: String,
}

#[derive(Default)]
struct Table {
    key: Vec<String>,
    rows: Vec<Value>,
}

impl Table {
    fn keyed(key: &[&str]) -> Self {
        Self {
            key: key.iter().map(|k| k.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn same_key(&self, a: &Value, b: &Value) -> bool {
        !self.key.is_empty() && self.key.iter().all(|k| a.get(k) == b.get(k))
    }
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    tables: HashMap<String, Table>,
    failing: HashSet<String>,
    unavailable: bool,
}

impl MemoryState {
    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable {
            return Err(ProviderError::api(503, None, "Service Unavailable"));
        }
        Ok(())
    }

    fn check_table(&self, table: &str) -> Result<(), ProviderError> {
        self.check_available()?;
        if self.failing.contains(table) {
            return Err(ProviderError::api(
                500,
                Some("XX000"),
                format!("injected failure on table {}", table),
            ));
        }
        Ok(())
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut Table, ProviderError> {
        self.tables.get_mut(table).ok_or_else(|| unknown_table(table))
    }
}

fn unknown_table(table: &str) -> ProviderError {
    ProviderError::api(
        404,
        Some("42P01"),
        format!("relation \"public.{}\" does not exist", table),
    )
}

fn issue_session(identity: Identity) -> Session {
    Session {
        access_token: format!("mem-{}", Uuid::new_v4()),
        refresh_token: Some(format!("mem-refresh-{}", Uuid::new_v4())),
        token_type: "bearer".to_string(),
        expires_in: SESSION_LIFETIME_SECS,
        expires_at: None,
        user: identity,
    }
    .stamped(Utc::now())
}

/// Process-local stand-in for the hosted backend
pub struct MemoryProvider {
    state: RwLock<MemoryState>,
    events: broadcast::Sender<AuthStateChange>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        let mut tables = HashMap::new();
        tables.insert(DEFAULT_ROLE_TABLE.to_string(), Table::keyed(&["user_id", "role"]));
        tables.insert(DEFAULT_PROFILE_TABLE.to_string(), Table::keyed(&["id"]));

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(MemoryState {
                tables,
                ..MemoryState::default()
            }),
            events,
        }
    }

    /// Create or replace a table with the given primary key columns.
    ///
    /// An empty key makes every upsert an insert.
    pub async fn define_table(&self, table: &str, key: &[&str]) {
        self.state
            .write()
            .await
            .tables
            .insert(table.to_string(), Table::keyed(key));
    }

    /// Append rows without key checks
    pub async fn seed(&self, table: &str, rows: Vec<Value>) {
        let mut state = self.state.write().await;
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .rows
            .extend(rows);
    }

    /// Snapshot of a table's rows
    pub async fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Make every call touching `table` fail
    pub async fn fail_table(&self, table: &str, failing: bool) {
        let mut state = self.state.write().await;
        if failing {
            state.failing.insert(table.to_string());
        } else {
            state.failing.remove(table);
        }
    }

    /// Make every call fail with 503
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.write().await.unavailable = unavailable;
    }

    /// Create an account directly, without signing in
    pub async fn register(&self, email: &str, password: &str) -> Identity {
        let identity = Identity {
            created_at: Some(Utc::now()),
            ..Identity::new(Uuid::new_v4(), email)
        };
        self.state.write().await.accounts.insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        identity
    }

    /// Expire the current session in place, keeping its refresh token
    pub async fn expire_session(&self) {
        if let Some(session) = self.state.write().await.session.as_mut() {
            session.expires_at = Some(Utc::now().timestamp() - 1);
        }
    }

    fn emit(&self, change: AuthStateChange) {
        if self.events.send(change).is_err() {
            tracing::debug!("[Auth] no subscribers for session change");
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryProvider {
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpData, ProviderError> {
        let session = {
            let mut state = self.state.write().await;
            state.check_available()?;

            if credentials.password.len() < MIN_PASSWORD_LEN {
                return Err(ProviderError::api(
                    422,
                    Some("weak_password"),
                    format!("Password should be at least {} characters.", MIN_PASSWORD_LEN),
                ));
            }
            if state.accounts.contains_key(&credentials.email) {
                return Err(ProviderError::api(
                    422,
                    Some("user_already_exists"),
                    "User already registered",
                ));
            }

            let identity = Identity {
                created_at: Some(Utc::now()),
                last_sign_in_at: Some(Utc::now()),
                ..Identity::new(Uuid::new_v4(), credentials.email.clone())
            };
            state.accounts.insert(
                credentials.email.clone(),
                Account {
                    identity: identity.clone(),
                    password: credentials.password.clone(),
                },
            );
            let session = issue_session(identity);
            state.session = Some(session.clone());
            session
        };

        self.emit(AuthStateChange::signed_in(session.clone()));
        Ok(SignUpData {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, ProviderError> {
        let session = {
            let mut state = self.state.write().await;
            state.check_available()?;

            let identity = match state.accounts.get_mut(&credentials.email) {
                Some(account) if account.password == credentials.password => {
                    account.identity.last_sign_in_at = Some(Utc::now());
                    account.identity.clone()
                }
                _ => {
                    return Err(ProviderError::api(
                        400,
                        Some("invalid_credentials"),
                        "Invalid login credentials",
                    ))
                }
            };
            let session = issue_session(identity);
            state.session = Some(session.clone());
            session
        };

        self.emit(AuthStateChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let had_session = {
            let mut state = self.state.write().await;
            state.check_available()?;
            state.session.take().is_some()
        };
        if had_session {
            self.emit(AuthStateChange::signed_out());
        }
        Ok(())
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let refreshed = {
            let mut state = self.state.write().await;
            state.check_available()?;

            let session = match state.session.clone() {
                Some(session) => session,
                None => return Ok(None),
            };
            if !session.is_expired(Utc::now()) {
                return Ok(Some(session));
            }
            let refreshed = issue_session(session.user);
            state.session = Some(refreshed.clone());
            refreshed
        };

        self.emit(AuthStateChange::token_refreshed(refreshed.clone()));
        Ok(Some(refreshed))
    }

    async fn get_user(&self) -> Result<Option<Identity>, ProviderError> {
        Ok(self.get_session().await?.map(|session| session.user))
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }
}

#[async_trait]
impl RecordStore for MemoryProvider {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ProviderError> {
        let state = self.state.read().await;
        state.check_table(&query.table)?;

        let table = state
            .tables
            .get(&query.table)
            .ok_or_else(|| unknown_table(&query.table))?;
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(table
            .rows
            .iter()
            .filter(|row| query.matches(row))
            .take(limit)
            .map(|row| query.project(row))
            .collect())
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), ProviderError> {
        let mut state = self.state.write().await;
        state.check_table(table)?;
        let target = state.table_mut(table)?;

        for row in &rows {
            if target.rows.iter().any(|existing| target.same_key(existing, row)) {
                return Err(ProviderError::api(
                    409,
                    Some("23505"),
                    format!("duplicate key value violates unique constraint on {}", table),
                ));
            }
        }
        target.rows.extend(rows);
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<(), ProviderError> {
        let mut state = self.state.write().await;
        state.check_table(table)?;
        let target = state.table_mut(table)?;

        for row in rows {
            let position = target
                .rows
                .iter()
                .position(|existing| target.same_key(existing, &row));
            match position {
                Some(idx) => {
                    if let (Some(existing), Value::Object(fields)) =
                        (target.rows[idx].as_object_mut(), row)
                    {
                        existing.extend(fields);
                    }
                }
                None => target.rows.push(row),
            }
        }
        Ok(())
    }

    async fn delete(&self, query: &Query) -> Result<(), ProviderError> {
        let mut state = self.state.write().await;
        state.check_table(&query.table)?;
        let target = state.table_mut(&query.table)?;
        target.rows.retain(|row| !query.matches(row));
        Ok(())
    }
}
