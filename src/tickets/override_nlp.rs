use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::routing::divisions::is_valid_division;
use crate::shared::schema::tickets;
use crate::shared::state::AppState;

use super::{Ticket, TicketError, TicketView};

/// Admin-or-higher surface; authorization happens upstream, the acting
/// account arrives as an explicit field.
#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub new_division: String,
    pub reason: Option<String>,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverridePlan {
    /// Value `original_nlp_division` must hold after the write: what it
    /// already held, or the pre-override target on the first transition.
    pub original_nlp_division: String,
    pub target_division: String,
    pub reason: Option<String>,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
}

/// Pure transition of the override state machine. The original automatic
/// result survives every subsequent override; everything else is
/// last-write-wins.
pub fn plan_override(
    current: &Ticket,
    new_division: &str,
    reason: Option<String>,
    actor_id: Uuid,
    at: DateTime<Utc>,
) -> OverridePlan {
    OverridePlan {
        original_nlp_division: current
            .original_nlp_division
            .clone()
            .unwrap_or_else(|| current.target_division.clone()),
        target_division: new_division.to_string(),
        reason,
        actor_id,
        at,
    }
}

pub async fn override_classification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<TicketView>, TicketError> {
    if !is_valid_division(&req.new_division) {
        return Err(TicketError::InvalidDivision(req.new_division));
    }

    let mut conn = state
        .conn
        .get()
        .map_err(|e| TicketError::Database(e.to_string()))?;

    let ticket: Ticket = tickets::table.find(id).first(&mut conn)?;
    let plan = plan_override(&ticket, &req.new_division, req.reason, req.actor_id, Utc::now());

    // Guarded write: only the first override may set the original division,
    // which keeps it stable when two admins override concurrently.
    diesel::update(
        tickets::table
            .find(id)
            .filter(tickets::original_nlp_division.is_null()),
    )
    .set(tickets::original_nlp_division.eq(&plan.original_nlp_division))
    .execute(&mut conn)?;

    diesel::update(tickets::table.find(id))
        .set((
            tickets::target_division.eq(&plan.target_division),
            tickets::is_nlp_overridden.eq(true),
            tickets::override_reason.eq(plan.reason.as_deref()),
            tickets::overridden_by.eq(Some(plan.actor_id)),
            tickets::overridden_at.eq(Some(plan.at)),
            tickets::updated_at.eq(plan.at),
        ))
        .execute(&mut conn)?;

    info!(
        "ticket {} overridden to {} by {}",
        id, plan.target_division, plan.actor_id
    );

    let updated: Ticket = tickets::table.find(id).first(&mut conn)?;
    Ok(Json(updated.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::STATUS_NEW;

    fn ticket(target_division: &str, original: Option<&str>) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Printer mati".to_string(),
            description: "Printer lantai 2 tidak menyala".to_string(),
            image_url: None,
            category: Some("IT".to_string()),
            target_division: target_division.to_string(),
            routed_divisions: vec![target_division.to_string()],
            nlp_confidence: 0.3,
            nlp_keywords: None,
            is_nlp_overridden: original.is_some(),
            original_nlp_division: original.map(str::to_string),
            override_reason: None,
            overridden_by: None,
            overridden_at: None,
            status: STATUS_NEW.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(ticket: &mut Ticket, plan: &OverridePlan) {
        if ticket.original_nlp_division.is_none() {
            ticket.original_nlp_division = Some(plan.original_nlp_division.clone());
        }
        ticket.target_division = plan.target_division.clone();
        ticket.is_nlp_overridden = true;
        ticket.override_reason = plan.reason.clone();
        ticket.overridden_by = Some(plan.actor_id);
        ticket.overridden_at = Some(plan.at);
    }

    #[test]
    fn first_override_captures_automatic_result() {
        let mut t = ticket("SALES", None);
        let actor = Uuid::new_v4();
        let plan = plan_override(
            &t,
            "HR",
            Some("miscategorized".to_string()),
            actor,
            Utc::now(),
        );
        apply(&mut t, &plan);

        assert_eq!(t.original_nlp_division.as_deref(), Some("SALES"));
        assert_eq!(t.target_division, "HR");
        assert!(t.is_nlp_overridden);
        assert_eq!(t.override_reason.as_deref(), Some("miscategorized"));
        assert_eq!(t.overridden_by, Some(actor));
    }

    #[test]
    fn second_override_never_touches_the_original() {
        let mut t = ticket("SALES", None);
        let plan = plan_override(&t, "HR", None, Uuid::new_v4(), Utc::now());
        apply(&mut t, &plan);

        let second_actor = Uuid::new_v4();
        let plan = plan_override(
            &t,
            "OPERASIONAL",
            Some("belongs to ops".to_string()),
            second_actor,
            Utc::now(),
        );
        apply(&mut t, &plan);

        assert_eq!(t.original_nlp_division.as_deref(), Some("SALES"));
        assert_eq!(t.target_division, "OPERASIONAL");
        assert_eq!(t.overridden_by, Some(second_actor));
    }

    #[test]
    fn plan_keeps_existing_original_when_already_set() {
        let t = ticket("HR", Some("SALES"));
        let plan = plan_override(&t, "OPERASIONAL", None, Uuid::new_v4(), Utc::now());
        assert_eq!(plan.original_nlp_division, "SALES");
    }

    #[test]
    fn override_reason_is_last_write_wins() {
        let mut t = ticket("SALES", None);
        let plan = plan_override(&t, "HR", Some("first".to_string()), Uuid::new_v4(), Utc::now());
        apply(&mut t, &plan);
        let plan = plan_override(&t, "HR", None, Uuid::new_v4(), Utc::now());
        apply(&mut t, &plan);

        assert_eq!(t.override_reason, None);
    }
}
