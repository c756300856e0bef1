// models/src/medical/audit_log.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: EntityId,
    pub actor_id: Option<EntityId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: EntityId,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        actor_id: Option<EntityId>,
        action: &str,
        entity_type: &str,
        entity_id: EntityId,
        details: Value,
        now: DateTime<Utc>,
    ) -> Self {
        AuditLogEntry {
            id: EntityId::generate(),
            actor_id,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details,
            created_at: now,
        }
    }
}
