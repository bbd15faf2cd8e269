//! Postgres-backed user and lead stores.
//!
//! Both stores share one [`Database`] handle. Every failure is routed through
//! [`Database::observe`], so a dropped connection flips the handle to
//! `Disconnected` and the next request triggers a reconnect.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `DuplicateEmail` | Email taken (unique index on `users.email`) |
//! | Database (other) | Any other | `Query` | Constraint or syntax failure |
//! | PoolTimedOut / PoolClosed / Io / Tls | N/A | `Unavailable` | Database unreachable |
//! | ColumnDecode / Decode / ColumnNotFound | N/A | `Corrupt` | Row does not match the schema |
//! | Other | N/A | `Query` | Anything else |
//!
//! ## Notes
//!
//! Lead notes are stored as a JSONB array and appended with `notes || $n`,
//! which is a single-statement update, so concurrent note additions never
//! lose each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use albiero_auth::{PasswordHash, ProfileUpdate, Role, User, UserRecord};
use albiero_core::{Email, LeadId, UserId, ValueObject};
use albiero_leads::{Lead, LeadNote, LeadQuery, LeadStatus, LeadUpdate, Page, Pagination};

use super::{LeadStore, StoreError, UserStore};
use crate::database::Database;

/// Idempotent schema, applied on every successful connect.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            UUID PRIMARY KEY,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role          TEXT NOT NULL CHECK (role IN ('user', 'admin')),
    phone         TEXT NULL,
    is_active     BOOLEAN NOT NULL DEFAULT TRUE,
    last_login    TIMESTAMPTZ NULL,
    created_at    TIMESTAMPTZ NOT NULL,
    updated_at    TIMESTAMPTZ NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (email);

CREATE TABLE IF NOT EXISTS leads (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL,
    service     TEXT NOT NULL,
    phone       TEXT NOT NULL,
    message     TEXT NULL,
    source      TEXT NOT NULL,
    status      TEXT NOT NULL CHECK (status IN ('nuevo', 'contactado', 'convertido', 'perdido')),
    assigned_to UUID NULL REFERENCES users (id) ON DELETE SET NULL,
    notes       JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at  TIMESTAMPTZ NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL
);
CREATE INDEX IF NOT EXISTS leads_created_at_idx ON leads (created_at DESC);
CREATE INDEX IF NOT EXISTS leads_status_idx ON leads (status);
CREATE INDEX IF NOT EXISTS leads_email_idx ON leads (email);
CREATE INDEX IF NOT EXISTS leads_assigned_to_idx ON leads (assigned_to);
"#;

const USER_COLUMNS: &str =
    "id, name, email, role, phone, is_active, last_login, created_at, updated_at";
const CREDENTIAL_COLUMNS: &str =
    "id, name, email, role, phone, is_active, last_login, created_at, updated_at, password_hash";
const LEAD_COLUMNS: &str = "id, name, email, service, phone, message, source, status, \
     assigned_to, notes, created_at, updated_at";

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: Database,
}

impl PgUserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn fail(&self, operation: &str, err: sqlx::Error) -> StoreError {
        let err = map_sqlx_error(operation, err);
        self.db.observe(&err);
        err
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip_all, fields(user_id = %record.user.id))]
    async fn insert(&self, record: UserRecord) -> Result<User, StoreError> {
        let user = &record.user;
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, phone, is_active, \
             last_login, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(record.password_hash.as_str())
        .bind(user.role.as_str())
        .bind(user.phone.as_deref())
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.db.pool()?)
        .await
        .map_err(|e| self.fail("insert_user", e))?;

        Ok(record.user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(self.db.pool()?)
            .await
            .map_err(|e| self.fail("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_many(&self, ids: &[UserId]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(&ids[..])
            .fetch_all(self.db.pool()?)
            .await
            .map_err(|e| self.fail("get_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(self.db.pool()?)
            .await
            .map_err(|e| self.fail("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_credentials(&self, email: &Email) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {CREDENTIAL_COLUMNS} FROM users WHERE email = $1"))
            .bind(email.as_str())
            .fetch_optional(self.db.pool()?)
            .await
            .map_err(|e| self.fail("find_credentials", e))?;

        row.as_ref()
            .map(|row| -> Result<UserRecord, StoreError> {
                Ok(UserRecord {
                    user: user_from_row(row)?,
                    password_hash: PasswordHash::from_stored(
                        row.try_get::<String, _>("password_hash").map_err(decode_error)?,
                    ),
                })
            })
            .transpose()
    }

    #[instrument(skip(self, update))]
    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        // An empty phone string clears the column.
        let row = sqlx::query(&format!(
            "UPDATE users SET \
                 name = COALESCE($2, name), \
                 phone = CASE WHEN $3::text IS NULL THEN phone ELSE NULLIF($3, '') END, \
                 updated_at = $4 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .bind(now)
        .fetch_optional(self.db.pool()?)
        .await
        .map_err(|e| self.fail("update_profile", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn set_active(
        &self,
        id: UserId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET is_active = $2, updated_at = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(active)
        .bind(now)
        .fetch_optional(self.db.pool()?)
        .await
        .map_err(|e| self.fail("set_active", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn touch_last_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = $2, updated_at = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(at)
            .execute(self.db.pool()?)
            .await
            .map_err(|e| self.fail("touch_last_login", e))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.db.pool()?)
        .await
        .map_err(|e| self.fail("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let email: String = row.try_get("email").map_err(decode_error)?;
    let role: String = row.try_get("role").map_err(decode_error)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        email: parse_email(&email)?,
        role: role
            .parse::<Role>()
            .map_err(|e| StoreError::Corrupt(format!("users.role: {e}")))?,
        phone: row.try_get("phone").map_err(decode_error)?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
        last_login: row.try_get("last_login").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Leads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PgLeadStore {
    db: Database,
}

impl PgLeadStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn fail(&self, operation: &str, err: sqlx::Error) -> StoreError {
        let err = map_sqlx_error(operation, err);
        self.db.observe(&err);
        err
    }
}

fn push_lead_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &LeadQuery) {
    qb.push(" WHERE TRUE");
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(pattern) = query.search_pattern() {
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR service ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    #[instrument(skip_all, fields(lead_id = %lead.id))]
    async fn insert(&self, lead: Lead) -> Result<Lead, StoreError> {
        sqlx::query(
            "INSERT INTO leads (id, name, email, service, phone, message, source, status, \
             assigned_to, notes, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(lead.id.as_uuid())
        .bind(&lead.name)
        .bind(lead.email.as_str())
        .bind(&lead.service)
        .bind(&lead.phone)
        .bind(lead.message.as_deref())
        .bind(&lead.source)
        .bind(lead.status.as_str())
        .bind(lead.assigned_to.map(|id| *id.as_uuid()))
        .bind(Json(&lead.notes))
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .execute(self.db.pool()?)
        .await
        .map_err(|e| self.fail("insert_lead", e))?;

        Ok(lead)
    }

    async fn get(&self, id: LeadId) -> Result<Option<Lead>, StoreError> {
        let row = sqlx::query(&format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(self.db.pool()?)
            .await
            .map_err(|e| self.fail("get_lead", e))?;
        row.as_ref().map(lead_from_row).transpose()
    }

    #[instrument(skip(self))]
    async fn query(&self, query: &LeadQuery) -> Result<Page<Lead>, StoreError> {
        let pool = self.db.pool()?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM leads");
        push_lead_filters(&mut count, query);
        let total: i64 = count
            .build()
            .fetch_one(pool)
            .await
            .map_err(|e| self.fail("count_leads", e))?
            .try_get("total")
            .map_err(decode_error)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {LEAD_COLUMNS} FROM leads"));
        push_lead_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset()).unwrap_or(i64::MAX));
        let rows = select
            .build()
            .fetch_all(pool)
            .await
            .map_err(|e| self.fail("query_leads", e))?;

        Ok(Page {
            items: rows.iter().map(lead_from_row).collect::<Result<_, _>>()?,
            pagination: Pagination::new(query.page, query.limit, u64::try_from(total).unwrap_or(0)),
        })
    }

    #[instrument(skip(self, update))]
    async fn update(
        &self,
        id: LeadId,
        update: &LeadUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<Lead>, StoreError> {
        let mut tx = self
            .db
            .pool()?
            .begin()
            .await
            .map_err(|e| self.fail("begin_update_lead", e))?;

        let row = sqlx::query(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| self.fail("lock_lead", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut lead = lead_from_row(&row)?;
        update.apply(&mut lead, now);

        sqlx::query(
            "UPDATE leads SET name = $2, email = $3, service = $4, phone = $5, message = $6, \
             status = $7, assigned_to = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(lead.id.as_uuid())
        .bind(&lead.name)
        .bind(lead.email.as_str())
        .bind(&lead.service)
        .bind(&lead.phone)
        .bind(lead.message.as_deref())
        .bind(lead.status.as_str())
        .bind(lead.assigned_to.map(|id| *id.as_uuid()))
        .bind(lead.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| self.fail("update_lead", e))?;

        tx.commit().await.map_err(|e| self.fail("commit_update_lead", e))?;
        Ok(Some(lead))
    }

    #[instrument(skip(self, note))]
    async fn add_note(&self, id: LeadId, note: LeadNote) -> Result<Option<Lead>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE leads SET notes = notes || $2, updated_at = $3 \
             WHERE id = $1 RETURNING {LEAD_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(Json(vec![&note]))
        .bind(note.created_at)
        .fetch_optional(self.db.pool()?)
        .await
        .map_err(|e| self.fail("add_note", e))?;
        row.as_ref().map(lead_from_row).transpose()
    }
}

fn lead_from_row(row: &PgRow) -> Result<Lead, StoreError> {
    let email: String = row.try_get("email").map_err(decode_error)?;
    let status: String = row.try_get("status").map_err(decode_error)?;
    let assigned_to: Option<Uuid> = row.try_get("assigned_to").map_err(decode_error)?;
    let Json(notes): Json<Vec<LeadNote>> = row.try_get("notes").map_err(decode_error)?;

    Ok(Lead {
        id: LeadId::from_uuid(row.try_get("id").map_err(decode_error)?),
        name: row.try_get("name").map_err(decode_error)?,
        email: parse_email(&email)?,
        service: row.try_get("service").map_err(decode_error)?,
        phone: row.try_get("phone").map_err(decode_error)?,
        message: row.try_get("message").map_err(decode_error)?,
        source: row.try_get("source").map_err(decode_error)?,
        status: status
            .parse::<LeadStatus>()
            .map_err(|e| StoreError::Corrupt(format!("leads.status: {e}")))?,
        assigned_to: assigned_to.map(UserId::from_uuid),
        notes,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Error mapping
// ─────────────────────────────────────────────────────────────────────────────

fn parse_email(raw: &str) -> Result<Email, StoreError> {
    Email::parse(raw).map_err(|e| StoreError::Corrupt(format!("email {raw:?}: {e}")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    map_sqlx_error("decode_row", err)
}

/// Map SQLx errors to `StoreError`. See the module docs for the table.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                StoreError::DuplicateEmail
            } else {
                StoreError::Query(format!("database error in {operation}: {}", db_err.message()))
            }
        }
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_) => StoreError::Corrupt(format!("{operation}: {err}")),
        other => StoreError::Query(format!("{operation}: {other}")),
    }
}
