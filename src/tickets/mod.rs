pub mod override_nlp;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::notifications::{self, DispatchOutcome};
use crate::routing;
use crate::shared::models::User;
use crate::shared::schema::{tickets, users};
use crate::shared::state::AppState;

pub const STATUS_NEW: &str = "new";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_RESOLVED: &str = "resolved";
pub const STATUS_CLOSED: &str = "closed";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub target_division: String,
    pub routed_divisions: Vec<String>,
    pub nlp_confidence: f64,
    pub nlp_keywords: Option<Vec<String>>,
    pub is_nlp_overridden: bool,
    pub original_nlp_division: Option<String>,
    pub override_reason: Option<String>,
    pub overridden_by: Option<Uuid>,
    pub overridden_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Display band for the classifier's confidence. Routing never reads this;
/// it exists for dashboards and audits only.
pub fn confidence_level(confidence: f64) -> &'static str {
    if confidence >= 0.7 {
        "high"
    } else if confidence >= 0.4 {
        "medium"
    } else {
        "low"
    }
}

pub fn status_transition_allowed(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        (STATUS_NEW, STATUS_IN_PROGRESS)
            | (STATUS_IN_PROGRESS, STATUS_RESOLVED)
            | (STATUS_NEW, STATUS_CLOSED)
            | (STATUS_IN_PROGRESS, STATUS_CLOSED)
            | (STATUS_RESOLVED, STATUS_CLOSED)
    )
}

#[derive(Debug, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub confidence_level: &'static str,
}

impl From<Ticket> for TicketView {
    fn from(ticket: Ticket) -> Self {
        let confidence_level = confidence_level(ticket.nlp_confidence);
        Self {
            ticket,
            confidence_level,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Ticket not found")]
    NotFound,
    #[error("User not found")]
    SubmitterNotFound,
    #[error("Unknown division: {0}")]
    InvalidDivision(String),
    #[error("Invalid status transition: {0} -> {1}")]
    InvalidStatus(String, String),
    #[error("Title and description required")]
    MissingFields,
    #[error("Database error: {0}")]
    Database(String),
}

impl axum::response::IntoResponse for TicketError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Self::NotFound | Self::SubmitterNotFound => StatusCode::NOT_FOUND,
            Self::InvalidDivision(_) | Self::InvalidStatus(..) | Self::MissingFields => {
                StatusCode::BAD_REQUEST
            }
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<DieselError> for TicketError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => Self::NotFound,
            other => Self::Database(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub message: String,
    pub ticket_id: Uuid,
    pub notifications: DispatchOutcome,
}

/// Ticket submission pipeline: classify, route, persist, notify. The
/// ticket row is the durability boundary; classification and notification
/// failures degrade the result but never fail the submission.
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<(StatusCode, Json<CreateTicketResponse>), TicketError> {
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(TicketError::MissingFields);
    }

    let text = format!("{} {}", req.title, req.description);
    let classification = match state.classifier.classify(&text).await {
        Ok(c) => Some(c),
        Err(e) => {
            warn!("classification unavailable, falling back to default routing: {e}");
            None
        }
    };

    let mut conn = state
        .conn
        .get()
        .map_err(|e| TicketError::Database(e.to_string()))?;

    let submitter: User = users::table
        .find(req.user_id)
        .first(&mut conn)
        .map_err(|e| match e {
            DieselError::NotFound => TicketError::SubmitterNotFound,
            other => TicketError::Database(other.to_string()),
        })?;

    let (routed, recipients) = routing::route_ticket(
        &mut conn,
        &submitter.division,
        classification.as_ref().map(|c| c.category.as_str()),
        &state.config.routing.fallback_division,
    )?;

    let primary = routing::primary_target(&routed)
        .unwrap_or(&submitter.division)
        .to_string();

    let now = Utc::now();
    let ticket = Ticket {
        id: Uuid::new_v4(),
        user_id: submitter.id,
        title: req.title,
        description: req.description,
        image_url: req.image_url,
        category: classification.as_ref().map(|c| c.category.clone()),
        target_division: primary.clone(),
        routed_divisions: routed.iter().map(|r| r.division.clone()).collect(),
        nlp_confidence: classification.as_ref().map_or(0.0, |c| c.confidence),
        nlp_keywords: classification
            .as_ref()
            .filter(|c| !c.keywords.is_empty())
            .map(|c| c.keywords.clone()),
        is_nlp_overridden: false,
        // Captured at creation when the classifier answered; a later first
        // override captures it instead when this stayed NULL.
        original_nlp_division: classification.as_ref().map(|_| primary),
        override_reason: None,
        overridden_by: None,
        overridden_at: None,
        status: STATUS_NEW.to_string(),
        created_at: now,
        updated_at: now,
    };

    diesel::insert_into(tickets::table)
        .values(&ticket)
        .execute(&mut conn)?;

    let outcome = notifications::dispatch(
        &mut conn,
        state.mailer.as_ref(),
        &ticket,
        &submitter,
        &recipients,
    );

    info!(
        "ticket {} created, routed to {:?}, {} notification(s)",
        ticket.id, ticket.routed_divisions, outcome.created
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateTicketResponse {
            message: "Ticket created".to_string(),
            ticket_id: ticket.id,
            notifications: outcome,
        }),
    ))
}

/// Scoping is the caller's: admins filter by their division, users by their
/// own id, super-admins pass neither.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub division: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_tickets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TicketView>>, TicketError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| TicketError::Database(e.to_string()))?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let mut q = tickets::table.into_boxed();

    if let Some(division) = query.division {
        q = q.filter(
            tickets::target_division
                .eq(division.clone())
                .or(tickets::routed_divisions.contains(vec![division])),
        );
    }

    if let Some(user_id) = query.user_id {
        q = q.filter(tickets::user_id.eq(user_id));
    }

    if let Some(status) = query.status {
        q = q.filter(tickets::status.eq(status));
    }

    let rows: Vec<Ticket> = q
        .order(tickets::created_at.desc())
        .limit(limit)
        .offset(offset)
        .load(&mut conn)?;

    Ok(Json(rows.into_iter().map(TicketView::from).collect()))
}

pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TicketView>, TicketError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| TicketError::Database(e.to_string()))?;

    let ticket: Ticket = tickets::table.find(id).first(&mut conn)?;
    Ok(Json(ticket.into()))
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

pub async fn change_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<TicketView>, TicketError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| TicketError::Database(e.to_string()))?;

    let ticket: Ticket = tickets::table.find(id).first(&mut conn)?;

    if !status_transition_allowed(&ticket.status, &req.status) {
        return Err(TicketError::InvalidStatus(ticket.status, req.status));
    }

    diesel::update(tickets::table.find(id))
        .set((
            tickets::status.eq(&req.status),
            tickets::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    let updated: Ticket = tickets::table.find(id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

pub fn configure_ticket_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tickets", get(list_tickets).post(create_ticket))
        .route("/api/tickets/:id", get(get_ticket))
        .route("/api/tickets/:id/status", put(change_status))
        .route(
            "/api/tickets/:id/override",
            patch(override_nlp::override_classification),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_bands_match_display_thresholds() {
        assert_eq!(confidence_level(0.95), "high");
        assert_eq!(confidence_level(0.7), "high");
        assert_eq!(confidence_level(0.69), "medium");
        assert_eq!(confidence_level(0.4), "medium");
        assert_eq!(confidence_level(0.39), "low");
        assert_eq!(confidence_level(0.0), "low");
    }

    #[test]
    fn lifecycle_moves_forward_only() {
        assert!(status_transition_allowed(STATUS_NEW, STATUS_IN_PROGRESS));
        assert!(status_transition_allowed(
            STATUS_IN_PROGRESS,
            STATUS_RESOLVED
        ));
        assert!(!status_transition_allowed(STATUS_RESOLVED, STATUS_NEW));
        assert!(!status_transition_allowed(STATUS_IN_PROGRESS, STATUS_NEW));
        assert!(!status_transition_allowed(STATUS_NEW, STATUS_RESOLVED));
    }

    #[test]
    fn closed_is_terminal() {
        assert!(status_transition_allowed(STATUS_NEW, STATUS_CLOSED));
        assert!(status_transition_allowed(STATUS_IN_PROGRESS, STATUS_CLOSED));
        assert!(status_transition_allowed(STATUS_RESOLVED, STATUS_CLOSED));
        assert!(!status_transition_allowed(STATUS_CLOSED, STATUS_NEW));
        assert!(!status_transition_allowed(STATUS_CLOSED, STATUS_IN_PROGRESS));
        assert!(!status_transition_allowed(STATUS_CLOSED, STATUS_RESOLVED));
    }
}
