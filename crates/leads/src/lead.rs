//! Lead record and the inputs that create or change it.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use albiero_core::{
    DomainError, DomainResult, Email, Entity, LeadId, UserId, Validator, ValueObject,
};

pub const DEFAULT_SOURCE: &str = "web-form";

const NAME_RANGE: (usize, usize) = (2, 100);
const SERVICE_RANGE: (usize, usize) = (2, 200);
const PHONE_MIN: usize = 6;
const MESSAGE_MAX: usize = 1000;
const NOTE_MAX: usize = 1000;

// ─────────────────────────────────────────────────────────────────────────────
// Status
// ─────────────────────────────────────────────────────────────────────────────

/// Triage position of a lead.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadStatus {
    #[default]
    #[serde(rename = "nuevo")]
    New,
    #[serde(rename = "contactado")]
    Contacted,
    #[serde(rename = "convertido")]
    Converted,
    #[serde(rename = "perdido")]
    Lost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Converted,
        LeadStatus::Lost,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "nuevo",
            LeadStatus::Contacted => "contactado",
            LeadStatus::Converted => "convertido",
            LeadStatus::Lost => "perdido",
        }
    }
}

impl core::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "status must be one of: {}",
                    LeadStatus::ALL.map(|s| s.as_str()).join(", ")
                ))
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lead
// ─────────────────────────────────────────────────────────────────────────────

/// An annotation appended during triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadNote {
    pub note: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl LeadNote {
    pub fn new(note: String, created_by: UserId, created_at: DateTime<Utc>) -> Self {
        Self { note, created_by, created_at }
    }
}

/// A sales inquiry.
///
/// # Invariants
/// - `email` is always a valid, normalized address.
/// - `status` is one of the four triage states.
/// - `notes` only grows, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: LeadId,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: Email,
    #[serde(rename = "servicio")]
    pub service: String,
    #[serde(rename = "telefono")]
    pub phone: String,
    #[serde(rename = "mensaje", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub source: String,
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub notes: Vec<LeadNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn create(new_lead: NewLead, now: DateTime<Utc>) -> Self {
        Self {
            id: LeadId::new(),
            name: new_lead.name,
            email: new_lead.email,
            service: new_lead.service,
            phone: new_lead.phone,
            message: new_lead.message,
            source: new_lead.source,
            status: LeadStatus::New,
            assigned_to: None,
            notes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_note(&mut self, note: LeadNote) {
        self.updated_at = note.created_at;
        self.notes.push(note);
    }
}

impl Entity for Lead {
    type Id = LeadId;

    fn id(&self) -> LeadId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Intake
// ─────────────────────────────────────────────────────────────────────────────

/// Raw public intake form.
#[derive(Debug, Clone, Default)]
pub struct LeadSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub service: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
}

/// Validated intake data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub name: String,
    pub email: Email,
    pub service: String,
    pub phone: String,
    pub message: Option<String>,
    pub source: String,
}

impl LeadSubmission {
    pub fn validate(self) -> DomainResult<NewLead> {
        let mut v = Validator::default();

        let name = check_name(&mut v, self.name.as_deref().unwrap_or_default());
        let email = v.absorb(Email::parse(self.email.as_deref().unwrap_or_default()));
        let service = check_service(&mut v, self.service.as_deref().unwrap_or_default());
        let phone = check_phone(&mut v, self.phone.as_deref().unwrap_or_default());
        let message = check_message(&mut v, self.message.as_deref());

        v.finish()?;
        let Some(email) = email else {
            return Err(DomainError::validation("email is required"));
        };

        let source = self
            .source
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        Ok(NewLead { name, email, service, phone, message, source })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Triage
// ─────────────────────────────────────────────────────────────────────────────

/// Raw admin edit. Absent fields stay untouched; for the nullable fields the
/// outer `Some(None)` means "clear".
#[derive(Debug, Clone, Default)]
pub struct LeadChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub service: Option<String>,
    pub phone: Option<String>,
    pub message: Option<Option<String>>,
    pub status: Option<String>,
    pub assigned_to: Option<Option<String>>,
}

/// Validated admin edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadUpdate {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub service: Option<String>,
    pub phone: Option<String>,
    pub message: Option<Option<String>>,
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<Option<UserId>>,
}

impl LeadChanges {
    pub fn validate(self) -> DomainResult<LeadUpdate> {
        let mut v = Validator::default();

        let update = LeadUpdate {
            name: self.name.map(|n| check_name(&mut v, &n)),
            email: self.email.and_then(|e| v.absorb(Email::parse(&e))),
            service: self.service.map(|s| check_service(&mut v, &s)),
            phone: self.phone.map(|p| check_phone(&mut v, &p)),
            message: self.message.map(|m| check_message(&mut v, m.as_deref())),
            status: self.status.and_then(|s| v.absorb(s.parse::<LeadStatus>())),
            assigned_to: self.assigned_to.map(|a| match a {
                None => None,
                Some(raw) => v.absorb(raw.trim().parse::<UserId>().map_err(|_| {
                    DomainError::validation("assignedTo must be a valid user id")
                })),
            }),
        };

        v.finish()?;
        Ok(update)
    }
}

impl LeadUpdate {
    pub fn is_empty(&self) -> bool {
        *self == LeadUpdate::default()
    }

    pub fn apply(&self, lead: &mut Lead, now: DateTime<Utc>) {
        if let Some(name) = &self.name {
            lead.name = name.clone();
        }
        if let Some(email) = &self.email {
            lead.email = email.clone();
        }
        if let Some(service) = &self.service {
            lead.service = service.clone();
        }
        if let Some(phone) = &self.phone {
            lead.phone = phone.clone();
        }
        if let Some(message) = &self.message {
            lead.message = message.clone();
        }
        if let Some(status) = self.status {
            lead.status = status;
        }
        if let Some(assigned_to) = self.assigned_to {
            lead.assigned_to = assigned_to;
        }
        lead.updated_at = now;
    }
}

/// Raw note submission.
#[derive(Debug, Clone, Default)]
pub struct NoteInput {
    pub note: Option<String>,
}

impl NoteInput {
    /// Returns the trimmed note text.
    pub fn validate(self) -> DomainResult<String> {
        let note = self.note.as_deref().map(str::trim).unwrap_or_default().to_string();
        let mut v = Validator::default();
        v.check(!note.is_empty(), "note is required");
        v.check(
            note.chars().count() <= NOTE_MAX,
            format!("note must be at most {NOTE_MAX} characters"),
        );
        v.finish()?;
        Ok(note)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Field rules
// ─────────────────────────────────────────────────────────────────────────────

fn check_name(v: &mut Validator, raw: &str) -> String {
    check_length(v, raw, "name", NAME_RANGE)
}

fn check_service(v: &mut Validator, raw: &str) -> String {
    check_length(v, raw, "service", SERVICE_RANGE)
}

fn check_length(v: &mut Validator, raw: &str, field: &str, (min, max): (usize, usize)) -> String {
    let value = raw.trim().to_string();
    let len = value.chars().count();
    v.check(len >= min, format!("{field} must be at least {min} characters"));
    v.check(len <= max, format!("{field} must be at most {max} characters"));
    value
}

fn check_phone(v: &mut Validator, raw: &str) -> String {
    let value = raw.trim().to_string();
    v.check(
        value.chars().count() >= PHONE_MIN,
        format!("phone must be at least {PHONE_MIN} characters"),
    );
    value
}

fn check_message(v: &mut Validator, raw: Option<&str>) -> Option<String> {
    let value = raw.map(str::trim).filter(|m| !m.is_empty())?.to_string();
    v.check(
        value.chars().count() <= MESSAGE_MAX,
        format!("message must be at most {MESSAGE_MAX} characters"),
    );
    Some(value)
}
