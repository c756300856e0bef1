// lib/src/services/activity.rs

//! Notifications and the audit trail. Both are written after the primary
//! change has been stored, so a failure here is logged rather than returned.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use models::errors::{PrectaError, PrectaResult};
use models::{AuditLogEntry, EntityId, Notification, NotificationKind};

use super::access::Actor;
use crate::storage_engine::PrectaStorage;

pub const DEFAULT_NOTIFICATION_LIMIT: i64 = 50;

pub async fn notify(
    storage: &dyn PrectaStorage,
    user_id: &EntityId,
    kind: NotificationKind,
    title: &str,
    body: String,
    now: DateTime<Utc>,
) {
    let notification = Notification::new(user_id.clone(), kind, title, body, now);
    if let Err(e) = storage.insert_notification(notification).await {
        warn!("Failed to store {} notification for user {}: {}", kind, user_id, e);
    }
}

pub async fn audit(
    storage: &dyn PrectaStorage,
    actor: Option<&Actor>,
    action: &str,
    entity_type: &str,
    entity_id: &EntityId,
    details: Value,
    now: DateTime<Utc>,
) {
    let entry = AuditLogEntry::new(
        actor.map(|a| a.user_id.clone()),
        action,
        entity_type,
        entity_id.clone(),
        details,
        now,
    );
    if let Err(e) = storage.insert_audit_log(entry).await {
        warn!("Failed to write audit entry {} for {} {}: {}", action, entity_type, entity_id, e);
    }
}

pub async fn my_notifications(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    limit: Option<i64>,
) -> PrectaResult<Vec<Notification>> {
    let limit = limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT).clamp(1, 200);
    storage.list_notifications(&actor.user_id, limit).await
}

pub async fn mark_read(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    notification_id: &EntityId,
    now: DateTime<Utc>,
) -> PrectaResult<Notification> {
    storage
        .mark_notification_read(notification_id, &actor.user_id, now)
        .await?
        .ok_or_else(|| PrectaError::not_found("Notification not found"))
}
