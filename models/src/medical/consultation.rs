// models/src/medical/consultation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;

/// Post-visit record; at most one per appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultation {
    pub id: EntityId,
    pub appointment_id: EntityId,
    pub doctor_id: EntityId,
    pub patient_id: EntityId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub video_room: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a doctor may edit after the visit has started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsultationNotes {
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
}
