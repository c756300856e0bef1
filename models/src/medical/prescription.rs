// models/src/medical/prescription.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub medication: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i32,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

impl PrescriptionItem {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.medication.trim().is_empty() {
            return Err(ValidationError::MissingField("medication"));
        }
        if self.dosage.trim().is_empty() {
            return Err(ValidationError::MissingField("dosage"));
        }
        if self.quantity <= 0 || self.duration_days <= 0 {
            return Err(ValidationError::InvalidValue(format!(
                "Quantity and duration for {} must be positive",
                self.medication
            )));
        }
        if self.unit_price_cents < 0 {
            return Err(ValidationError::InvalidValue("Price cannot be negative".to_string()));
        }
        self.line_total_cents().map(|_| ())
    }

    pub fn line_total_cents(&self) -> ValidationResult<i64> {
        self.unit_price_cents
            .checked_mul(i64::from(self.quantity))
            .ok_or_else(|| {
                ValidationError::InvalidValue(format!("Price of {} is out of range", self.medication))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: EntityId,
    pub consultation_id: EntityId,
    pub doctor_id: EntityId,
    pub patient_id: EntityId,
    pub items: Vec<PrescriptionItem>,
    pub instructions: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
}

impl Prescription {
    pub fn total_cents(&self) -> ValidationResult<i64> {
        self.items.iter().try_fold(0i64, |total, item| {
            total
                .checked_add(item.line_total_cents()?)
                .ok_or_else(|| ValidationError::InvalidValue("Prescription total is out of range".to_string()))
        })
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_until.map_or(true, |until| at <= until)
    }
}
