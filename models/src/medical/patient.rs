// models/src/medical/patient.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: EntityId,
    pub user_id: EntityId, // one patient profile per account
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPatient {
    pub user_id: EntityId,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Patient {
    pub fn from_new(new_patient: NewPatient, now: DateTime<Utc>) -> Self {
        Patient {
            id: EntityId::generate(),
            user_id: new_patient.user_id,
            full_name: new_patient.full_name,
            date_of_birth: new_patient.date_of_birth,
            gender: new_patient.gender,
            phone: new_patient.phone,
            address: new_patient.address,
            created_at: now,
        }
    }
}
