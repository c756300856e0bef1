// lib/src/services/access.rs

use serde::{Deserialize, Serialize};

use models::errors::{PrectaError, PrectaResult};
use models::{Appointment, Doctor, EntityId, Patient, UserRole};

use crate::storage_engine::PrectaStorage;

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: EntityId,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: EntityId, role: UserRole) -> Self {
        Actor { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_role(&self, role: UserRole) -> PrectaResult<()> {
        if self.role == role {
            Ok(())
        } else {
            Err(PrectaError::forbidden(format!("This action requires the {} role", role)))
        }
    }

    pub fn require_admin(&self) -> PrectaResult<()> {
        self.require_role(UserRole::Admin)
    }
}

/// How the actor relates to an appointment.
#[derive(Debug, Clone)]
pub enum Party {
    Patient(Patient),
    Doctor(Doctor),
    Admin,
}

pub async fn patient_profile(storage: &dyn PrectaStorage, actor: &Actor) -> PrectaResult<Patient> {
    storage
        .get_patient_by_user(&actor.user_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Patient profile not found"))
}

pub async fn doctor_profile(storage: &dyn PrectaStorage, actor: &Actor) -> PrectaResult<Doctor> {
    storage
        .get_doctor_by_user(&actor.user_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Doctor profile not found"))
}

pub async fn load_appointment(
    storage: &dyn PrectaStorage,
    appointment_id: &EntityId,
) -> PrectaResult<Appointment> {
    storage
        .get_appointment(appointment_id)
        .await?
        .ok_or_else(|| PrectaError::not_found("Appointment not found"))
}

/// Resolves the actor's side of `appointment`; anyone else is forbidden.
pub async fn appointment_party(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment: &Appointment,
) -> PrectaResult<Party> {
    match actor.role {
        UserRole::Admin => Ok(Party::Admin),
        UserRole::Patient => match storage.get_patient_by_user(&actor.user_id).await? {
            Some(patient) if patient.id == appointment.patient_id => Ok(Party::Patient(patient)),
            _ => Err(PrectaError::forbidden("You are not part of this appointment")),
        },
        UserRole::Doctor => match storage.get_doctor_by_user(&actor.user_id).await? {
            Some(doctor) if doctor.id == appointment.doctor_id => Ok(Party::Doctor(doctor)),
            _ => Err(PrectaError::forbidden("You are not part of this appointment")),
        },
    }
}

/// The doctor assigned to `appointment`, or `Forbidden` for anyone else.
pub async fn assigned_doctor(
    storage: &dyn PrectaStorage,
    actor: &Actor,
    appointment: &Appointment,
) -> PrectaResult<Doctor> {
    match appointment_party(storage, actor, appointment).await? {
        Party::Doctor(doctor) => Ok(doctor),
        _ => Err(PrectaError::forbidden(
            "Only the assigned doctor can perform this action",
        )),
    }
}
