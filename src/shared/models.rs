use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::schema::users;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_SUPER_ADMIN: &str = "super_admin";

/// Account row. Registration, login and profile editing live outside this
/// service; routing only ever reads these rows.
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub notification_email: Option<String>,
    pub role: String,
    pub division: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Preferred address for outbound notification email.
    pub fn notification_address(&self) -> &str {
        self.notification_email.as_deref().unwrap_or(&self.email)
    }
}
