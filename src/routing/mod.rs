pub mod divisions;

use std::collections::HashSet;

use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::shared::models::{User, ROLE_ADMIN, ROLE_SUPER_ADMIN};
use crate::shared::schema::{category_division_mapping, users};

/// Why a division or recipient was included for a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationReason {
    UserDivision,
    NlpCategory,
    SuperAdmin,
}

impl NotificationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserDivision => "user_division",
            Self::NlpCategory => "nlp_category",
            Self::SuperAdmin => "super_admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutedDivision {
    pub division: String,
    pub reason: NotificationReason,
}

#[derive(Debug, Clone)]
pub struct Recipient {
    pub admin: User,
    pub reason: NotificationReason,
}

/// Compute the ordered, deduplicated set of divisions that must see a
/// ticket. The submitter's division always comes first; mapped divisions
/// follow in stored order. A category with no active mapping routes to the
/// fallback division so no ticket is left without an owner.
pub fn resolve_target_divisions(
    submitter_division: &str,
    mapped_divisions: &[String],
    fallback: &str,
) -> Vec<RoutedDivision> {
    let fallback_list;
    let mapped = if mapped_divisions.is_empty() {
        fallback_list = [fallback.to_string()];
        &fallback_list[..]
    } else {
        mapped_divisions
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut routed = Vec::with_capacity(mapped.len() + 1);

    seen.insert(submitter_division);
    routed.push(RoutedDivision {
        division: submitter_division.to_string(),
        reason: NotificationReason::UserDivision,
    });

    for division in mapped {
        if seen.insert(division.as_str()) {
            routed.push(RoutedDivision {
                division: division.clone(),
                reason: NotificationReason::NlpCategory,
            });
        }
    }

    routed
}

/// The single division persisted as the ticket's canonical target: the
/// first category-mapped entry, or the submitter's division when routing
/// produced nothing beyond it.
pub fn primary_target(routed: &[RoutedDivision]) -> Option<&str> {
    routed
        .iter()
        .find(|r| r.reason == NotificationReason::NlpCategory)
        .or_else(|| routed.first())
        .map(|r| r.division.as_str())
}

/// Expand routed divisions into concrete admin recipients, deduplicated by
/// account id with the first-seen reason kept. Super-admins are appended
/// last and always carry the `super_admin` reason; the division passes only
/// ever select `admin`-role accounts, so a super-admin can never pick up a
/// division reason.
pub fn resolve_recipients(
    division_admins: &[(RoutedDivision, Vec<User>)],
    super_admins: &[User],
) -> Vec<Recipient> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut recipients = Vec::new();

    for (routed, admins) in division_admins {
        for admin in admins {
            if seen.insert(admin.id) {
                recipients.push(Recipient {
                    admin: admin.clone(),
                    reason: routed.reason,
                });
            }
        }
    }

    for admin in super_admins {
        if seen.insert(admin.id) {
            recipients.push(Recipient {
                admin: admin.clone(),
                reason: NotificationReason::SuperAdmin,
            });
        }
    }

    recipients
}

/// Active mapping rows for a category, in stored order.
pub fn load_active_mapped_divisions(
    conn: &mut PgConnection,
    category: &str,
) -> QueryResult<Vec<String>> {
    category_division_mapping::table
        .filter(category_division_mapping::nlp_category.eq(category))
        .filter(category_division_mapping::is_active.eq(true))
        .order(category_division_mapping::created_at.asc())
        .select(category_division_mapping::target_division)
        .load(conn)
}

pub fn load_division_admins(
    conn: &mut PgConnection,
    routed: &[RoutedDivision],
) -> QueryResult<Vec<(RoutedDivision, Vec<User>)>> {
    routed
        .iter()
        .map(|r| {
            let admins = users::table
                .filter(users::role.eq(ROLE_ADMIN))
                .filter(users::division.eq(&r.division))
                .filter(users::is_active.eq(true))
                .order(users::name.asc())
                .load::<User>(conn)?;
            Ok((r.clone(), admins))
        })
        .collect()
}

pub fn load_super_admins(conn: &mut PgConnection) -> QueryResult<Vec<User>> {
    users::table
        .filter(users::role.eq(ROLE_SUPER_ADMIN))
        .filter(users::is_active.eq(true))
        .order(users::name.asc())
        .load(conn)
}

/// Full routing pass for one ticket: mapping lookup, division resolution,
/// recipient expansion. `category` is `None` when classification failed.
pub fn route_ticket(
    conn: &mut PgConnection,
    submitter_division: &str,
    category: Option<&str>,
    fallback: &str,
) -> QueryResult<(Vec<RoutedDivision>, Vec<Recipient>)> {
    let mapped = match category {
        Some(c) => load_active_mapped_divisions(conn, c)?,
        None => Vec::new(),
    };
    let routed = resolve_target_divisions(submitter_division, &mapped, fallback);
    let division_admins = load_division_admins(conn, &routed)?;
    let super_admins = load_super_admins(conn)?;
    let recipients = resolve_recipients(&division_admins, &super_admins);
    Ok((routed, recipients))
}
