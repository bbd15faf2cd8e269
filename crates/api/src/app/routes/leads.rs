use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::Utc;

use albiero_core::LeadId;
use albiero_leads::{Lead, LeadChanges, LeadNote, LeadSubmission, NoteInput};

use crate::app::dto::{self, LeadsPage};
use crate::app::errors::{respond, ApiError, ApiJson, ApiQuery};
use crate::app::services::AppServices;
use crate::context::AuthenticatedUser;

/// Public intake.
pub fn public_router() -> Router {
    Router::new().route("/api/leads", post(create_lead))
}

/// Triage; admin only.
pub fn admin_router() -> Router {
    Router::new()
        .route("/api/leads", get(list_leads))
        .route("/api/leads/:id", get(get_lead).put(update_lead))
        .route("/api/leads/:id/notes", post(add_note))
}

fn parse_lead_id(raw: &str) -> Result<LeadId, ApiError> {
    raw.parse::<LeadId>()
        .map_err(|_| ApiError::BadRequest(format!("invalid lead id '{raw}'")))
}

pub async fn create_lead(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::LeadRequest>,
) -> Result<Response, ApiError> {
    let new_lead = LeadSubmission::from(body).validate()?;
    let lead = services.leads.insert(Lead::create(new_lead, Utc::now())).await?;

    tracing::info!(event = "leads.created", lead_id = %lead.id, source = %lead.source, "lead registered");
    let view = services.lead_view(lead).await?;
    Ok(respond(StatusCode::CREATED, Some("Lead registered successfully"), view))
}

pub async fn list_leads(
    Extension(services): Extension<Arc<AppServices>>,
    ApiQuery(params): ApiQuery<dto::ListLeadsParams>,
) -> Result<Response, ApiError> {
    let query = params.to_query()?;
    let page = services.leads.query(&query).await?;

    let body = LeadsPage {
        leads: services.lead_views(page.items).await?,
        pagination: page.pagination,
    };
    Ok(respond(StatusCode::OK, None, body))
}

pub async fn get_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_lead_id(&id)?;
    let lead = services
        .leads
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead"))?;
    Ok(respond(StatusCode::OK, None, services.lead_view(lead).await?))
}

pub async fn update_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::LeadPatchRequest>,
) -> Result<Response, ApiError> {
    let id = parse_lead_id(&id)?;
    let update = LeadChanges::from(body).validate()?;

    if let Some(Some(assignee)) = update.assigned_to {
        if services.users.get(assignee).await?.is_none() {
            return Err(ApiError::Validation(vec![
                "assignedTo must reference an existing user".to_string(),
            ]));
        }
    }

    let lead = services
        .leads
        .update(id, &update, Utc::now())
        .await?
        .ok_or_else(|| ApiError::not_found("Lead"))?;

    tracing::info!(
        event = "leads.updated",
        lead_id = %lead.id,
        status = %lead.status,
        by = %identity.id(),
        "lead updated"
    );
    Ok(respond(StatusCode::OK, Some("Lead updated successfully"), services.lead_view(lead).await?))
}

pub async fn add_note(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(identity): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::NoteRequest>,
) -> Result<Response, ApiError> {
    let id = parse_lead_id(&id)?;
    let text = NoteInput::from(body).validate()?;
    let note = LeadNote::new(text, identity.id(), Utc::now());

    let lead = services
        .leads
        .add_note(id, note)
        .await?
        .ok_or_else(|| ApiError::not_found("Lead"))?;

    tracing::info!(event = "leads.note_added", lead_id = %lead.id, by = %identity.id(), "note added");
    Ok(respond(StatusCode::OK, Some("Note added successfully"), services.lead_view(lead).await?))
}
