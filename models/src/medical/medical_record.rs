// models/src/medical/medical_record.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;

text_enum! {
    pub enum RecordType as "record type" {
        LabResult => "lab_result",
        Prescription => "prescription",
        Imaging => "imaging",
        ConsultationNote => "consultation_note",
        Other => "other",
    }
}

/// A patient-owned health document. The file itself lives in external
/// storage; only its URL is kept here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: EntityId,
    pub patient_id: EntityId,
    pub title: String,
    pub record_type: RecordType,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub recorded_on: Option<NaiveDate>,
    /// Doctors currently allowed to read this record.
    pub shared_with: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
}

impl MedicalRecord {
    pub fn is_shared_with(&self, doctor_id: &EntityId) -> bool {
        self.shared_with.contains(doctor_id)
    }
}
