use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::email::Mailer;
use crate::routing::{NotificationReason, Recipient};
use crate::shared::models::User;
use crate::shared::schema::notifications;
use crate::shared::state::AppState;
use crate::tickets::Ticket;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub admin_id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub notification_reason: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Result of one dispatch pass. `failed` lists recipients whose
/// notification row could not be persisted; callers can detect partial
/// failure by comparing `created` against the recipient count.
#[derive(Debug, Default, Serialize)]
pub struct DispatchOutcome {
    pub created: usize,
    pub failed: Vec<Uuid>,
}

/// Notification body shown to the recipient. Category-routed recipients see
/// which category pulled the ticket into their division.
pub fn build_message(
    submitter_name: &str,
    submitter_division: &str,
    category: Option<&str>,
    reason: NotificationReason,
) -> String {
    let mut message = format!("Tiket baru dari {submitter_name} ({submitter_division})");
    if reason == NotificationReason::NlpCategory {
        if let Some(category) = category {
            message.push_str(&format!(" - Kategori: {category}"));
        }
    }
    message
}

/// Persist one notification per recipient and kick off best-effort email
/// delivery. One recipient failing must not abort the rest; the unique
/// `(admin_id, ticket_id)` constraint makes re-dispatch idempotent.
pub fn dispatch(
    conn: &mut PgConnection,
    mailer: Option<&Arc<Mailer>>,
    ticket: &Ticket,
    submitter: &User,
    recipients: &[Recipient],
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();

    for recipient in recipients {
        let row = Notification {
            id: Uuid::new_v4(),
            admin_id: recipient.admin.id,
            ticket_id: ticket.id,
            user_id: submitter.id,
            title: ticket.title.clone(),
            message: build_message(
                &submitter.name,
                &submitter.division,
                ticket.category.as_deref(),
                recipient.reason,
            ),
            notification_reason: recipient.reason.as_str().to_string(),
            is_read: false,
            created_at: Utc::now(),
        };

        let inserted = diesel::insert_into(notifications::table)
            .values(&row)
            .on_conflict((notifications::admin_id, notifications::ticket_id))
            .do_nothing()
            .execute(conn);

        match inserted {
            Ok(0) => {
                debug!(
                    "recipient {} already notified for ticket {}",
                    recipient.admin.id, ticket.id
                );
            }
            Ok(_) => {
                outcome.created += 1;
                if let Some(mailer) = mailer {
                    send_email_async(mailer.clone(), recipient, ticket, submitter);
                }
            }
            Err(e) => {
                warn!(
                    "failed to persist notification for {}: {}",
                    recipient.admin.id, e
                );
                outcome.failed.push(recipient.admin.id);
            }
        }
    }

    outcome
}

/// Fire-and-forget: the SMTP round-trip must not hold up the submitter's
/// response, and a failed send never rolls back the persisted row.
fn send_email_async(mailer: Arc<Mailer>, recipient: &Recipient, ticket: &Ticket, submitter: &User) {
    let to = recipient.admin.notification_address().to_string();
    let admin_name = recipient.admin.name.clone();
    let title = ticket.title.clone();
    let submitter_name = submitter.name.clone();
    let submitter_division = submitter.division.clone();
    let ticket_id = ticket.id;

    tokio::task::spawn_blocking(move || {
        if let Err(e) = mailer.send_ticket_notification(
            &to,
            &admin_name,
            &title,
            &submitter_name,
            &submitter_division,
            ticket_id,
        ) {
            error!("notification email to {} failed: {}", to, e);
        }
    });
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(String),
}

impl axum::response::IntoResponse for NotificationError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

impl From<diesel::result::Error> for NotificationError {
    fn from(e: diesel::result::Error) -> Self {
        Self::Database(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub admin_id: Uuid,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationList {
    pub unread_count: i64,
    pub notifications: Vec<Notification>,
}

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<NotificationList>, NotificationError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| NotificationError::Database(e.to_string()))?;

    let limit = query.limit.unwrap_or(10).clamp(1, 100);

    let unread_count: i64 = notifications::table
        .filter(notifications::admin_id.eq(query.admin_id))
        .filter(notifications::is_read.eq(false))
        .count()
        .get_result(&mut conn)?;

    let items: Vec<Notification> = notifications::table
        .filter(notifications::admin_id.eq(query.admin_id))
        .order(notifications::created_at.desc())
        .limit(limit)
        .load(&mut conn)?;

    Ok(Json(NotificationList {
        unread_count,
        notifications: items,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub admin_id: Uuid,
}

/// Marking an already-read notification is a no-op.
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<serde_json::Value>, NotificationError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| NotificationError::Database(e.to_string()))?;

    diesel::update(
        notifications::table
            .filter(notifications::id.eq(id))
            .filter(notifications::admin_id.eq(req.admin_id)),
    )
    .set(notifications::is_read.eq(true))
    .execute(&mut conn)?;

    Ok(Json(
        serde_json::json!({ "message": "Notification marked as read" }),
    ))
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MarkReadRequest>,
) -> Result<Json<serde_json::Value>, NotificationError> {
    let mut conn = state
        .conn
        .get()
        .map_err(|e| NotificationError::Database(e.to_string()))?;

    diesel::update(
        notifications::table
            .filter(notifications::admin_id.eq(query.admin_id))
            .filter(notifications::is_read.eq(false)),
    )
    .set(notifications::is_read.eq(true))
    .execute(&mut conn)?;

    Ok(Json(
        serde_json::json!({ "message": "All notifications marked as read" }),
    ))
}

pub fn configure_notification_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/mark-all-read", patch(mark_all_read))
        .route("/api/notifications/:id/read", patch(mark_read))
}
