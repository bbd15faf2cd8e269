//! Service wiring: stores, credential service, token service, database handle.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};

use albiero_auth::{Hs256TokenService, TokenService, User};
use albiero_infra::{
    CredentialService, Database, InMemoryLeadStore, InMemoryUserStore, LeadStore, PgLeadStore,
    PgUserStore, RetryPolicy, UserStore,
};
use albiero_leads::Lead;

use crate::app::dto::{self, AuthPayload, LeadView};
use crate::app::errors::ApiError;
use crate::config::AppConfig;

pub struct AppServices {
    pub db: Database,
    pub users: Arc<dyn UserStore>,
    pub leads: Arc<dyn LeadStore>,
    pub credentials: CredentialService,
    pub tokens: Arc<dyn TokenService>,
}

impl AppServices {
    pub fn new(
        db: Database,
        users: Arc<dyn UserStore>,
        leads: Arc<dyn LeadStore>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            db,
            credentials: CredentialService::new(users.clone()),
            users,
            leads,
            tokens,
        }
    }

    /// Non-persistent wiring for tests and local runs without a database.
    pub fn in_memory(tokens: Arc<dyn TokenService>) -> Self {
        Self::new(
            Database::in_memory(),
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryLeadStore::new()),
            tokens,
        )
    }

    /// Mint a token for `user` and package the login/registration payload.
    pub fn session(&self, user: User, now: DateTime<Utc>) -> Result<AuthPayload, ApiError> {
        let issued = self.tokens.issue(user.id, now)?;
        Ok(AuthPayload { user, token: issued.token })
    }

    /// Resolve the user references of `leads` in one store round-trip.
    pub async fn lead_views(&self, leads: Vec<Lead>) -> Result<Vec<LeadView>, ApiError> {
        let ids = dto::referenced_users(&leads);
        let users: HashMap<_, _> = self
            .users
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        Ok(leads.into_iter().map(|l| LeadView::build(l, &users)).collect())
    }

    pub async fn lead_view(&self, lead: Lead) -> Result<LeadView, ApiError> {
        let mut views = self.lead_views(vec![lead]).await?;
        views
            .pop()
            .ok_or_else(|| ApiError::Internal("lead view lost during population".to_string()))
    }
}

/// Build services from configuration.
///
/// With `DATABASE_URL` set, the database is probed with retries; if it never
/// answers the service still starts and requests get 503 until a reconnect
/// succeeds.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let tokens: Arc<dyn TokenService> = Arc::new(Hs256TokenService::new(
        config.jwt_secret.as_bytes(),
        config.token_ttl,
    ));

    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores, data is lost on restart");
        return Ok(AppServices::in_memory(tokens));
    };

    let db = Database::postgres(url, RetryPolicy::default()).context("configuring database")?;
    let state = db.connect().await;
    tracing::info!(database = ?state, "database initialized");

    Ok(AppServices::new(
        db.clone(),
        Arc::new(PgUserStore::new(db.clone())),
        Arc::new(PgLeadStore::new(db)),
        tokens,
    ))
}
