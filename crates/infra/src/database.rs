//! Database connection lifecycle.
//!
//! The pool is created lazily, then probed with bounded exponential backoff.
//! If every attempt fails the process keeps running in the `Disconnected`
//! state: callers see `StoreError::Unavailable` and the first caller to
//! notice kicks off a single background reconnect.
//!
//! ```text
//! Disconnected ──connect()──▶ Connecting ──probe ok──▶ Connected
//!      ▲                          │                        │
//!      └──── retries exhausted ───┘◀── store reports ──────┘
//!                                      Unavailable
//! ```

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::store::{StoreError, SCHEMA};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Bounded exponential backoff for the connection probe.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
    /// Upper bound on a single attempt, including pool acquisition.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

struct Inner {
    pool: Option<PgPool>,
    state: RwLock<ConnectionState>,
    policy: RetryPolicy,
}

/// Shared handle to the database and its connection state.
///
/// Cloning is cheap. Without a pool (in-memory mode) the handle is
/// permanently `Connected`.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for Database {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &if self.is_persistent() { "postgres" } else { "memory" })
            .field("state", &self.state())
            .finish()
    }
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Inner {
                pool: None,
                state: RwLock::new(ConnectionState::Connected),
                policy: RetryPolicy::default(),
            }),
        }
    }

    /// Build a lazy pool for `url`. No connection is attempted until
    /// [`Database::connect`].
    pub fn postgres(url: &str, policy: RetryPolicy) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(policy.attempt_timeout)
            .connect_lazy(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid database url: {e}")))?;
        Ok(Self {
            inner: Arc::new(Inner {
                pool: Some(pool),
                state: RwLock::new(ConnectionState::Disconnected),
                policy,
            }),
        })
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.pool.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner
            .state
            .read()
            .map(|s| *s)
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn pool(&self) -> Result<&PgPool, StoreError> {
        self.inner
            .pool
            .as_ref()
            .ok_or_else(|| StoreError::Unavailable("no database configured".to_string()))
    }

    fn set_state(&self, next: ConnectionState) {
        if let Ok(mut state) = self.inner.state.write() {
            *state = next;
        }
    }

    /// Claim the `Disconnected -> Connecting` transition. Only one caller wins.
    fn begin_connecting(&self) -> bool {
        match self.inner.state.write() {
            Ok(mut state) if *state == ConnectionState::Disconnected => {
                *state = ConnectionState::Connecting;
                true
            }
            _ => false,
        }
    }

    /// Probe the database until it answers or the retry budget runs out.
    ///
    /// A no-op (returning the current state) when another connect is already
    /// in flight or the handle is already connected.
    pub async fn connect(&self) -> ConnectionState {
        if !self.begin_connecting() {
            return self.state();
        }
        let Some(pool) = self.inner.pool.as_ref() else {
            self.set_state(ConnectionState::Connected);
            return ConnectionState::Connected;
        };

        let policy = self.inner.policy;
        for attempt in 1..=policy.max_attempts {
            match probe(pool).await {
                Ok(()) => {
                    self.set_state(ConnectionState::Connected);
                    tracing::info!(attempt, "database connected");
                    return ConnectionState::Connected;
                }
                Err(err) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "database connection attempt failed"
                    );
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.backoff(attempt)).await;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        tracing::error!(
            attempts = policy.max_attempts,
            "database unreachable, serving without persistence until reconnect"
        );
        ConnectionState::Disconnected
    }

    /// Start a reconnect on the runtime unless one is already running.
    pub fn reconnect_in_background(&self) {
        if self.state() != ConnectionState::Disconnected {
            return;
        }
        let db = self.clone();
        tokio::spawn(async move {
            db.connect().await;
        });
    }

    /// Gate for request handling. Fails fast while the database is not
    /// connected and triggers a reconnect if nobody is trying yet.
    pub fn ensure_ready(&self) -> Result<(), StoreError> {
        match self.state() {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Connecting => Err(StoreError::Unavailable(
                "database connection in progress".to_string(),
            )),
            ConnectionState::Disconnected => {
                self.reconnect_in_background();
                Err(StoreError::Unavailable("database unavailable".to_string()))
            }
        }
    }

    /// Feed back a store failure. Connectivity loss flips the handle to
    /// `Disconnected` so the next request starts a reconnect.
    pub fn observe(&self, err: &StoreError) {
        if matches!(err, StoreError::Unavailable(_)) && self.is_persistent() {
            let mut changed = false;
            if let Ok(mut state) = self.inner.state.write() {
                if *state == ConnectionState::Connected {
                    *state = ConnectionState::Disconnected;
                    changed = true;
                }
            }
            if changed {
                tracing::warn!(error = %err, "lost database connection");
            }
        }
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.inner.pool {
            pool.close().await;
        }
    }
}

async fn probe(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
