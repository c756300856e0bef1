// lib/src/services/testing.rs

//! Shared fixture for service tests: an in-memory store seeded with a few
//! accounts and profiles.

use chrono::{DateTime, Utc};

use models::{
    Appointment, Doctor, EntityId, NewDoctor, NewPatient, Patient, PaymentStatus, Prescription,
    PrescriptionItem, User, UserRole, VerificationStatus,
};

use super::access::Actor;
use super::booking::{book_appointment, Booking, BookingRequest};
use super::consultation::{issue_prescription, PrescriptionRequest};
use super::lifecycle::start_appointment;
use super::payments::{handle_payment_event, Checkout, PaymentEvent};
use crate::storage_engine::{DirectoryStore, InMemoryStorage};

pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn id(s: &str) -> EntityId {
    EntityId::new(s.to_string()).unwrap()
}

pub fn amoxicillin() -> PrescriptionItem {
    PrescriptionItem {
        medication: "Amoxicillin 500mg".to_string(),
        dosage: "1 capsule".to_string(),
        frequency: "3 times daily".to_string(),
        duration_days: 7,
        quantity: 21,
        unit_price_cents: 1_500,
    }
}

pub struct Fixture {
    pub storage: InMemoryStorage,
    pub checkout: Checkout,
    pub patient: Patient,
    pub patient_actor: Actor,
    pub other_patient: Patient,
    pub other_patient_actor: Actor,
    /// Verified, offers video.
    pub doctor: Doctor,
    pub doctor_actor: Actor,
    /// Verified, in-person only.
    pub in_person_doctor: Doctor,
    pub in_person_doctor_actor: Actor,
    pub pending_doctor: Doctor,
    pub pending_doctor_actor: Actor,
    pub admin_actor: Actor,
}

pub async fn seed_user(storage: &InMemoryStorage, user_id: &str, role: UserRole) -> Actor {
    storage
        .seed_user(User {
            id: id(user_id),
            email: format!("{}@precta.test", user_id),
            name: user_id.to_string(),
            role,
            phone: None,
            created_at: at("2025-01-15T09:00:00Z"),
        })
        .await;
    Actor::new(id(user_id), role)
}

async fn seed_patient(storage: &InMemoryStorage, actor: &Actor, name: &str) -> Patient {
    let patient = Patient::from_new(
        NewPatient {
            user_id: actor.user_id.clone(),
            full_name: name.to_string(),
            date_of_birth: None,
            gender: None,
            phone: None,
            address: Some("12 Moi Avenue, Nairobi".to_string()),
        },
        at("2025-01-15T09:00:00Z"),
    );
    storage.insert_patient(patient).await.unwrap()
}

async fn seed_doctor(
    storage: &InMemoryStorage,
    actor: &Actor,
    name: &str,
    status: VerificationStatus,
    offers_video: bool,
) -> Doctor {
    let mut doctor = Doctor::from_new(
        NewDoctor {
            user_id: actor.user_id.clone(),
            clinic_id: None,
            full_name: name.to_string(),
            specialty: "General Practice".to_string(),
            license_number: format!("KMPDC-{}", name.len()),
            bio: None,
            consultation_fee_cents: 250_000,
            currency: "KES".to_string(),
            consultation_minutes: 30,
            offers_video,
        },
        at("2025-01-15T09:00:00Z"),
    );
    doctor.verification_status = status;
    if status == VerificationStatus::Verified {
        doctor.verified_at = Some(at("2025-01-16T09:00:00Z"));
    }
    storage.insert_doctor(doctor).await.unwrap()
}

impl Fixture {
    pub async fn new() -> Self {
        let storage = InMemoryStorage::new();

        let patient_actor = seed_user(&storage, "user-patient", UserRole::Patient).await;
        let patient = seed_patient(&storage, &patient_actor, "Amina Wanjiru").await;
        let other_patient_actor = seed_user(&storage, "user-patient-2", UserRole::Patient).await;
        let other_patient = seed_patient(&storage, &other_patient_actor, "Brian Otieno").await;

        let doctor_actor = seed_user(&storage, "user-doctor", UserRole::Doctor).await;
        let doctor = seed_doctor(&storage, &doctor_actor, "Dr. Achieng", VerificationStatus::Verified, true).await;
        let in_person_doctor_actor = seed_user(&storage, "user-doctor-2", UserRole::Doctor).await;
        let in_person_doctor = seed_doctor(
            &storage,
            &in_person_doctor_actor,
            "Dr. Kamau",
            VerificationStatus::Verified,
            false,
        )
        .await;
        let pending_doctor_actor = seed_user(&storage, "user-doctor-3", UserRole::Doctor).await;
        let pending_doctor = seed_doctor(
            &storage,
            &pending_doctor_actor,
            "Dr. Njeri",
            VerificationStatus::Pending,
            true,
        )
        .await;

        let admin_actor = seed_user(&storage, "user-admin", UserRole::Admin).await;

        Fixture {
            storage,
            checkout: Checkout::new("https://pay.test/", "http://localhost:8082", "KES"),
            patient,
            patient_actor,
            other_patient,
            other_patient_actor,
            doctor,
            doctor_actor,
            in_person_doctor,
            in_person_doctor_actor,
            pending_doctor,
            pending_doctor_actor,
            admin_actor,
        }
    }

    /// Books the default doctor for the default patient.
    pub async fn book(&self, when: &str, now: DateTime<Utc>) -> Booking {
        book_appointment(
            &self.storage,
            &self.checkout,
            &self.patient_actor,
            BookingRequest {
                doctor_id: self.doctor.id.clone(),
                scheduled_at: at(when),
                consultation_type: models::ConsultationType::Video,
                duration_minutes: None,
                notes: None,
            },
            now,
        )
        .await
        .unwrap()
    }

    /// Books and pays, leaving the appointment `confirmed`.
    pub async fn confirmed(&self, when: &str, now: DateTime<Utc>) -> Appointment {
        let booking = self.book(when, now).await;
        handle_payment_event(
            &self.storage,
            PaymentEvent {
                payment_id: booking.payment.id.clone(),
                status: PaymentStatus::Completed,
                provider_reference: Some("MPESA-TEST".to_string()),
            },
            now,
        )
        .await
        .unwrap();
        crate::services::access::load_appointment(&self.storage, &booking.appointment.id)
            .await
            .unwrap()
    }

    /// Runs a visit at `when` and issues a prescription from it.
    pub async fn prescription(&self, when: &str, now: DateTime<Utc>) -> Prescription {
        let appointment = self.confirmed(when, now).await;
        start_appointment(&self.storage, &self.doctor_actor, &appointment.id, at(when))
            .await
            .unwrap();
        issue_prescription(
            &self.storage,
            &self.doctor_actor,
            &appointment.id,
            PrescriptionRequest {
                items: vec![amoxicillin()],
                instructions: None,
                valid_days: None,
            },
            at(when),
        )
        .await
        .unwrap()
    }
}
