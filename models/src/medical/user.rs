// models/src/medical/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;

text_enum! {
    /// The account role issued by the auth provider.
    pub enum UserRole as "role" {
        Patient => "patient",
        Doctor => "doctor",
        Admin => "admin",
    }
}

/// An account row. Accounts are created by the external auth provider;
/// this service only reads them and hangs role profiles off them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}
