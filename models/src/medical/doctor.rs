// models/src/medical/doctor.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntityId;
use crate::lifecycle::Lifecycle;

text_enum! {
    /// Admin-controlled gate on whether a doctor is bookable and searchable.
    pub enum VerificationStatus as "verification status" {
        Pending => "pending",
        Verified => "verified",
        Rejected => "rejected",
    }
}

impl Lifecycle for VerificationStatus {
    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (VerificationStatus::Pending, VerificationStatus::Verified)
                | (VerificationStatus::Pending, VerificationStatus::Rejected)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::Pending)
    }

    fn entity() -> &'static str {
        "verification"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: EntityId,
    pub user_id: EntityId,
    pub clinic_id: Option<EntityId>,
    pub full_name: String,
    pub specialty: String,
    pub license_number: String,
    pub bio: Option<String>,
    pub consultation_fee_cents: i64,
    pub currency: String,
    pub consultation_minutes: i32,
    pub offers_video: bool,
    pub verification_status: VerificationStatus,
    pub submitted_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<EntityId>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    /// Only verified doctors can be booked or listed publicly.
    pub fn is_bookable(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    pub fn from_new(new_doctor: NewDoctor, now: DateTime<Utc>) -> Self {
        Doctor {
            id: EntityId::generate(),
            user_id: new_doctor.user_id,
            clinic_id: new_doctor.clinic_id,
            full_name: new_doctor.full_name,
            specialty: new_doctor.specialty,
            license_number: new_doctor.license_number,
            bio: new_doctor.bio,
            consultation_fee_cents: new_doctor.consultation_fee_cents,
            currency: new_doctor.currency,
            consultation_minutes: new_doctor.consultation_minutes,
            offers_video: new_doctor.offers_video,
            verification_status: VerificationStatus::Pending,
            submitted_at: now,
            verified_at: None,
            verified_by: None,
            rejection_reason: None,
            created_at: now,
        }
    }
}

/// A doctor's application; always enters the verification queue as `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDoctor {
    pub user_id: EntityId,
    pub clinic_id: Option<EntityId>,
    pub full_name: String,
    pub specialty: String,
    pub license_number: String,
    pub bio: Option<String>,
    pub consultation_fee_cents: i64,
    pub currency: String,
    pub consultation_minutes: i32,
    pub offers_video: bool,
}

/// The admin's verdict on a pending doctor.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationDecision {
    Approve { moderator_id: EntityId, decided_at: DateTime<Utc> },
    Reject { moderator_id: EntityId, reason: String, decided_at: DateTime<Utc> },
}

impl VerificationDecision {
    pub fn target_status(&self) -> VerificationStatus {
        match self {
            VerificationDecision::Approve { .. } => VerificationStatus::Verified,
            VerificationDecision::Reject { .. } => VerificationStatus::Rejected,
        }
    }

    /// Applies the decision to an in-memory copy of the doctor row.
    pub fn apply(&self, doctor: &mut Doctor) {
        doctor.verification_status = self.target_status();
        match self {
            VerificationDecision::Approve { moderator_id, decided_at } => {
                doctor.verified_at = Some(*decided_at);
                doctor.verified_by = Some(moderator_id.clone());
                doctor.rejection_reason = None;
            }
            VerificationDecision::Reject { moderator_id, reason, .. } => {
                doctor.verified_by = Some(moderator_id.clone());
                doctor.rejection_reason = Some(reason.clone());
            }
        }
    }
}
