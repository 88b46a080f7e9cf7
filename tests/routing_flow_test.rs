use chrono::Utc;
use uuid::Uuid;

use helpdesk::routing::{
    resolve_recipients, resolve_target_divisions, NotificationReason, RoutedDivision,
};
use helpdesk::shared::models::{User, ROLE_ADMIN, ROLE_SUPER_ADMIN};

fn account(name: &str, role: &str, division: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{name}@example.com"),
        notification_email: None,
        role: role.to_string(),
        division: division.to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}

#[test]
fn sales_ticket_classified_as_it_reaches_both_divisions() {
    // Category "IT" maps to IT & Teknologi; submitter sits in SALES.
    let mapped = vec!["IT & Teknologi".to_string()];
    let routed = resolve_target_divisions("SALES", &mapped, "IT & Teknologi");

    assert_eq!(routed.len(), 2);
    assert_eq!(routed[0].division, "SALES");
    assert_eq!(routed[0].reason, NotificationReason::UserDivision);
    assert_eq!(routed[1].division, "IT & Teknologi");
    assert_eq!(routed[1].reason, NotificationReason::NlpCategory);
}

#[test]
fn unmapped_category_routes_to_configured_fallback() {
    let routed = resolve_target_divisions("HR", &[], "IT & Teknologi");

    assert_eq!(routed.len(), 2);
    assert_eq!(routed[0].division, "HR");
    assert_eq!(routed[0].reason, NotificationReason::UserDivision);
    assert_eq!(routed[1].division, "IT & Teknologi");
    assert_eq!(routed[1].reason, NotificationReason::NlpCategory);
}

#[test]
fn full_fan_out_tags_every_recipient_once() {
    let sales_admin = account("sari", ROLE_ADMIN, "SALES");
    let it_admin_a = account("tono", ROLE_ADMIN, "IT & Teknologi");
    let it_admin_b = account("wati", ROLE_ADMIN, "IT & Teknologi");
    let super_admin = account("root", ROLE_SUPER_ADMIN, "SALES");

    let mapped = vec!["IT & Teknologi".to_string()];
    let routed = resolve_target_divisions("SALES", &mapped, "IT & Teknologi");

    let division_admins = vec![
        (routed[0].clone(), vec![sales_admin.clone()]),
        (routed[1].clone(), vec![it_admin_a.clone(), it_admin_b.clone()]),
    ];

    let recipients = resolve_recipients(&division_admins, &[super_admin.clone()]);

    assert_eq!(recipients.len(), 4);

    let mut ids: Vec<Uuid> = recipients.iter().map(|r| r.admin.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4, "no recipient may appear twice");

    assert_eq!(recipients[0].admin.id, sales_admin.id);
    assert_eq!(recipients[0].reason, NotificationReason::UserDivision);
    assert_eq!(recipients[1].reason, NotificationReason::NlpCategory);
    assert_eq!(recipients[2].reason, NotificationReason::NlpCategory);

    // The super-admin shares the submitter's division but still carries the
    // blanket reason.
    assert_eq!(recipients[3].admin.id, super_admin.id);
    assert_eq!(recipients[3].reason, NotificationReason::SuperAdmin);
}

#[test]
fn category_mapped_to_submitter_division_collapses_to_one_entry() {
    let mapped = vec!["SALES".to_string()];
    let routed = resolve_target_divisions("SALES", &mapped, "IT & Teknologi");

    assert_eq!(routed.len(), 1);
    assert_eq!(routed[0].division, "SALES");
    assert_eq!(routed[0].reason, NotificationReason::UserDivision);
}

#[test]
fn divisions_without_admins_route_but_notify_nobody() {
    let routed = vec![
        RoutedDivision {
            division: "HR".to_string(),
            reason: NotificationReason::UserDivision,
        },
        RoutedDivision {
            division: "DIREKSI".to_string(),
            reason: NotificationReason::NlpCategory,
        },
    ];

    let division_admins = vec![(routed[0].clone(), vec![]), (routed[1].clone(), vec![])];
    let recipients = resolve_recipients(&division_admins, &[]);

    assert!(recipients.is_empty());
}
