use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use albiero_auth::{ProfileUpdate, Registration, User, UserSummary};
use albiero_core::{Email, LeadId, UserId};
use albiero_leads::{Lead, LeadChanges, LeadQuery, LeadStatus, LeadSubmission, NoteInput, Pagination};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub telefono: Option<String>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            name: req.nombre,
            email: req.email,
            password: req.password,
            phone: req.telefono,
        }
    }
}

#[derive(Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Both fields present and non-blank.
    pub fn credentials(self) -> Option<(String, String)> {
        let email = self.email.filter(|e| !e.trim().is_empty())?;
        let password = self.password.filter(|p| !p.is_empty())?;
        Some((email, password))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    pub nombre: Option<String>,
    pub telefono: Option<String>,
}

impl From<ProfileRequest> for ProfileUpdate {
    fn from(req: ProfileRequest) -> Self {
        ProfileUpdate { name: req.nombre, phone: req.telefono }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadRequest {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub servicio: Option<String>,
    pub telefono: Option<String>,
    pub mensaje: Option<String>,
    pub source: Option<String>,
}

impl From<LeadRequest> for LeadSubmission {
    fn from(req: LeadRequest) -> Self {
        LeadSubmission {
            name: req.nombre,
            email: req.email,
            service: req.servicio,
            phone: req.telefono,
            message: req.mensaje,
            source: req.source,
        }
    }
}

/// Partial lead edit. For `mensaje` and `assignedTo`, an explicit `null`
/// clears the field while an absent key leaves it alone.
#[derive(Debug, Default, Deserialize)]
pub struct LeadPatchRequest {
    pub nombre: Option<String>,
    pub email: Option<String>,
    pub servicio: Option<String>,
    pub telefono: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub mensaje: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, rename = "assignedTo", deserialize_with = "double_option")]
    pub assigned_to: Option<Option<String>>,
}

impl From<LeadPatchRequest> for LeadChanges {
    fn from(req: LeadPatchRequest) -> Self {
        LeadChanges {
            name: req.nombre,
            email: req.email,
            service: req.servicio,
            phone: req.telefono,
            message: req.mensaje,
            status: req.status,
            assigned_to: req.assigned_to,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NoteRequest {
    pub note: Option<String>,
}

impl From<NoteRequest> for NoteInput {
    fn from(req: NoteRequest) -> Self {
        NoteInput { note: req.note }
    }
}

/// Query string for the lead list. Everything arrives as text so that bad
/// numbers fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListLeadsParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

impl ListLeadsParams {
    pub fn to_query(&self) -> albiero_core::DomainResult<LeadQuery> {
        LeadQuery::from_params(
            self.page.as_deref(),
            self.limit.as_deref(),
            self.status.as_deref(),
            self.search.as_deref(),
        )
    }
}

fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AuthPayload {
    pub user: User,
    pub token: String,
}

/// A user reference inside a lead: the summary when the user still exists,
/// otherwise the bare id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Unresolved(UserId),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub note: String,
    pub created_by: UserRef,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadView {
    #[serde(rename = "_id")]
    pub id: LeadId,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: Email,
    #[serde(rename = "servicio")]
    pub service: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "mensaje", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserRef>,
    pub notes: Vec<NoteView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadView {
    /// Join a lead with the users it references. Assignees carry name and
    /// email; note authors carry the name only.
    pub fn build(lead: Lead, users: &HashMap<UserId, User>) -> Self {
        let assigned_to = lead.assigned_to.map(|id| match users.get(&id) {
            Some(user) => UserRef::Populated(user.summary()),
            None => UserRef::Unresolved(id),
        });
        let notes = lead
            .notes
            .into_iter()
            .map(|n| NoteView {
                created_by: match users.get(&n.created_by) {
                    Some(user) => UserRef::Populated(UserSummary { email: None, ..user.summary() }),
                    None => UserRef::Unresolved(n.created_by),
                },
                note: n.note,
                created_at: n.created_at,
            })
            .collect();

        Self {
            id: lead.id,
            name: lead.name,
            email: lead.email,
            service: lead.service,
            phone: lead.phone,
            message: lead.message,
            source: lead.source,
            status: lead.status,
            assigned_to,
            notes,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}

/// Every user id a batch of leads points at, without duplicates.
pub fn referenced_users(leads: &[Lead]) -> Vec<UserId> {
    leads
        .iter()
        .flat_map(|l| l.assigned_to.into_iter().chain(l.notes.iter().map(|n| n.created_by)))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Serialize)]
pub struct LeadsPage {
    pub leads: Vec<LeadView>,
    pub pagination: Pagination,
}
