//! Auth/Database Provider Boundary
//!
//! The gateway never talks to the backend directly. It holds two injected
//! trait objects:
//!
//! - **[`AuthProvider`]** - account creation, password sign-in, sign-out,
//!   current session and a stream of session changes
//! - **[`RecordStore`]** - table reads and writes with equality filters and
//!   single / maybe-single fetch modes
//!
//! # Implementations
//!
//! ```text
//! provider/
//! ├── mod.rs    - Traits and the table query type
//! ├── error.rs  - ProviderError and backend error body parsing
//! ├── http.rs   - GoTrue + PostgREST over reqwest
//! └── memory.rs - In-process backend for tests and demos
//! ```

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::shared::event::AuthStateChange;
use crate::shared::types::{Credentials, Identity, Session, SignUpData};

pub mod error;
pub mod http;
pub mod memory;

pub use error::ProviderError;
pub use http::HttpProvider;
pub use memory::MemoryProvider;

/// Capacity of the session change channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Identity operations of the backend
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a new account
    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpData, ProviderError>;

    /// Exchange email and password for a session
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, ProviderError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Session held by this client, refreshed if it has expired
    async fn get_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Identity behind the current session, revalidated with the backend
    async fn get_user(&self) -> Result<Option<Identity>, ProviderError>;

    /// Receive every session change from now on
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;
}

/// Table operations of the backend
///
/// Rows travel as JSON objects; typed decoding happens in the gateway.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, ProviderError>;

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), ProviderError>;

    /// Insert, or merge into the row with the same primary key
    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<(), ProviderError>;

    /// Delete every row matching the query's filters
    async fn delete(&self, query: &Query) -> Result<(), ProviderError>;

    /// Exactly one row, otherwise [`ProviderError::RowCount`]
    async fn fetch_single(&self, query: &Query) -> Result<Value, ProviderError> {
        let mut rows = self.select(query).await?;
        if rows.len() != 1 {
            return Err(ProviderError::RowCount {
                expected: 1,
                found: rows.len(),
            });
        }
        Ok(rows.remove(0))
    }

    /// Zero or one row; more than one is an error
    async fn fetch_maybe_single(&self, query: &Query) -> Result<Option<Value>, ProviderError> {
        let mut rows = self.select(query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(Some(rows.remove(0))),
            found => Err(ProviderError::RowCount { expected: 1, found }),
        }
    }
}

/// A filtered read or delete against one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    /// Column list for reads; `None` selects every column
    pub columns: Option<String>,
    /// `(column, value)` equality filters, all of which must match
    pub filters: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((column.into(), value.to_string()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `row` satisfies every equality filter.
    ///
    /// Strings compare by content, other JSON values by their JSON text.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(column, expected)| match row.get(column) {
            Some(Value::String(actual)) => actual == expected,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == *expected,
        })
    }

    /// Keeps only the selected columns of `row`
    pub fn project(&self, row: &Value) -> Value {
        let columns = match self.columns.as_deref() {
            None | Some("*") => return row.clone(),
            Some(columns) => columns,
        };
        let mut projected = serde_json::Map::new();
        for column in columns.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if let Some(value) = row.get(column) {
                projected.insert(column.to_string(), value.clone());
            }
        }
        Value::Object(projected)
    }

    /// PostgREST query string pairs: `select=...`, `col=eq.value`, `limit=n`
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.filters.len() + 2);
        if let Some(columns) = &self.columns {
            pairs.push(("select".to_string(), columns.clone()));
        }
        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{}", value)));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }
}
