// lib/src/storage_engine/storage_engine.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use models::errors::PrectaResult;
use models::{
    Appointment, AppointmentStatus, AuditLogEntry, AvailabilityWindow, Cancellation, Clinic,
    Consultation, ConsultationNotes, Doctor, DoctorRanking, EntityId, MedicalRecord, Notification,
    Order, OrderStatus, Patient, Payment, PaymentStatus, PlatformMetrics, Prescription, User,
    VerificationDecision, VerificationStatus,
};

use crate::config::StorageEngineType;

/// Lifecycle of a concrete backend.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn connect(&self) -> PrectaResult<()>;

    /// Brings the schema up to date. A no-op for engines without a schema.
    async fn migrate(&self) -> PrectaResult<()>;

    async fn health_check(&self) -> PrectaResult<()>;

    fn engine_type(&self) -> StorageEngineType;
}

/// Accounts and the profiles hanging off them.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get_user(&self, id: &EntityId) -> PrectaResult<Option<User>>;

    /// Fails with `Conflict` if the user already has a patient profile.
    async fn insert_patient(&self, patient: Patient) -> PrectaResult<Patient>;
    async fn get_patient(&self, id: &EntityId) -> PrectaResult<Option<Patient>>;
    async fn get_patient_by_user(&self, user_id: &EntityId) -> PrectaResult<Option<Patient>>;

    /// Fails with `Conflict` if the user already has a doctor profile.
    async fn insert_doctor(&self, doctor: Doctor) -> PrectaResult<Doctor>;
    async fn get_doctor(&self, id: &EntityId) -> PrectaResult<Option<Doctor>>;
    async fn get_doctor_by_user(&self, user_id: &EntityId) -> PrectaResult<Option<Doctor>>;
    async fn list_doctors_by_verification(
        &self,
        status: VerificationStatus,
    ) -> PrectaResult<Vec<Doctor>>;

    /// Applies `decision` only while the doctor is still `pending`.
    /// Returns `None` when the doctor does not exist and `Conflict` when it was already decided.
    async fn decide_verification(
        &self,
        doctor_id: &EntityId,
        decision: &VerificationDecision,
    ) -> PrectaResult<Option<Doctor>>;

    async fn get_clinic(&self, id: &EntityId) -> PrectaResult<Option<Clinic>>;

    async fn list_availability(&self, doctor_id: &EntityId) -> PrectaResult<Vec<AvailabilityWindow>>;
    /// Replaces the doctor's whole weekly schedule.
    async fn replace_availability(
        &self,
        doctor_id: &EntityId,
        windows: Vec<AvailabilityWindow>,
    ) -> PrectaResult<Vec<AvailabilityWindow>>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Inserts a new appointment. A slot-occupying appointment for the same
    /// doctor and timestamp already present is reported as `Conflict`.
    async fn insert_appointment(&self, appointment: Appointment) -> PrectaResult<Appointment>;
    async fn get_appointment(&self, id: &EntityId) -> PrectaResult<Option<Appointment>>;
    async fn list_appointments_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Appointment>>;
    async fn list_appointments_for_doctor(&self, doctor_id: &EntityId) -> PrectaResult<Vec<Appointment>>;

    /// Slot-occupying appointments of a doctor starting in `[from, to)`.
    async fn list_booked_between(
        &self,
        doctor_id: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PrectaResult<Vec<Appointment>>;

    /// Compare-and-set on the status column; `Conflict` if the row moved on meanwhile.
    async fn update_appointment_status(
        &self,
        id: &EntityId,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        cancellation: Option<Cancellation>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Appointment>;
}

/// Consultations, prescriptions, medication orders and payments.
#[async_trait]
pub trait CareStore: Send + Sync {
    /// Fails with `Conflict` if the appointment already has a consultation.
    async fn insert_consultation(&self, consultation: Consultation) -> PrectaResult<Consultation>;
    async fn get_consultation_by_appointment(
        &self,
        appointment_id: &EntityId,
    ) -> PrectaResult<Option<Consultation>>;
    async fn get_consultation(&self, id: &EntityId) -> PrectaResult<Option<Consultation>>;
    async fn update_consultation(
        &self,
        id: &EntityId,
        notes: ConsultationNotes,
        ended_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Consultation>;

    async fn insert_prescription(&self, prescription: Prescription) -> PrectaResult<Prescription>;
    async fn get_prescription(&self, id: &EntityId) -> PrectaResult<Option<Prescription>>;
    async fn list_prescriptions_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Prescription>>;

    async fn insert_order(&self, order: Order) -> PrectaResult<Order>;
    async fn get_order(&self, id: &EntityId) -> PrectaResult<Option<Order>>;
    async fn list_orders_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Order>>;
    async fn update_order_status(
        &self,
        id: &EntityId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> PrectaResult<Order>;

    async fn insert_payment(&self, payment: Payment) -> PrectaResult<Payment>;
    async fn get_payment(&self, id: &EntityId) -> PrectaResult<Option<Payment>>;
    async fn update_payment_status(
        &self,
        id: &EntityId,
        expected: PaymentStatus,
        next: PaymentStatus,
        provider_reference: Option<String>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Payment>;
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_record(&self, record: MedicalRecord) -> PrectaResult<MedicalRecord>;
    async fn get_record(&self, id: &EntityId) -> PrectaResult<Option<MedicalRecord>>;
    async fn list_records_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<MedicalRecord>>;
    /// Returns whether a row was deleted.
    async fn delete_record(&self, id: &EntityId) -> PrectaResult<bool>;
    /// Idempotent.
    async fn share_record(&self, record_id: &EntityId, doctor_id: &EntityId) -> PrectaResult<MedicalRecord>;
    /// Idempotent.
    async fn revoke_record(&self, record_id: &EntityId, doctor_id: &EntityId) -> PrectaResult<MedicalRecord>;
}

#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn insert_notification(&self, notification: Notification) -> PrectaResult<()>;
    async fn list_notifications(&self, user_id: &EntityId, limit: i64) -> PrectaResult<Vec<Notification>>;
    /// Returns `None` when no such notification belongs to the user.
    async fn mark_notification_read(
        &self,
        id: &EntityId,
        user_id: &EntityId,
        at: DateTime<Utc>,
    ) -> PrectaResult<Option<Notification>>;

    async fn insert_audit_log(&self, entry: AuditLogEntry) -> PrectaResult<()>;
    async fn list_recent_audit_logs(&self, limit: i64) -> PrectaResult<Vec<AuditLogEntry>>;
}

/// Read-only aggregates for the admin dashboard.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn platform_metrics(&self) -> PrectaResult<PlatformMetrics>;
    /// New accounts per calendar month, for months starting on or after `since`.
    async fn signups_by_month(&self, since: NaiveDate) -> PrectaResult<Vec<(NaiveDate, i64)>>;
    /// Appointments created per UTC day in `[from, to]`.
    async fn appointments_by_day(&self, from: NaiveDate, to: NaiveDate) -> PrectaResult<Vec<(NaiveDate, i64)>>;
    async fn top_doctors(&self, limit: i64) -> PrectaResult<Vec<DoctorRanking>>;
}

/// Everything the services need from a backend.
pub trait PrectaStorage:
    StorageEngine + DirectoryStore + AppointmentStore + CareStore + RecordStore + ActivityStore + AnalyticsStore
{
}

impl<T> PrectaStorage for T where
    T: StorageEngine + DirectoryStore + AppointmentStore + CareStore + RecordStore + ActivityStore + AnalyticsStore
{
}
