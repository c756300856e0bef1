// lib/src/storage_engine/postgres_storage.rs

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::{debug, info};

use models::errors::{PrectaError, PrectaResult, ValidationError};
use models::{
    Appointment, AppointmentStatus, AuditLogEntry, AvailabilityWindow, Cancellation, Clinic,
    Consultation, ConsultationNotes, Doctor, DoctorRanking, EntityId, Lifecycle, MedicalRecord,
    Notification, Order, OrderStatus, Patient, Payment, PaymentStatus, PlatformMetrics,
    Prescription, PrescriptionItem, SchedulingSettings, User, VerificationDecision,
    VerificationStatus,
};

use super::storage_engine::{
    ActivityStore, AnalyticsStore, AppointmentStore, CareStore, DirectoryStore, RecordStore,
    StorageEngine,
};
use crate::config::{StorageConfig, StorageEngineType};

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Opens a connection pool. Connections are established lazily; call
    /// [`StorageEngine::connect`] to fail fast on a bad URL.
    pub fn new(config: &StorageConfig) -> PrectaResult<Self> {
        let url = config.database_url.as_deref().ok_or_else(|| {
            PrectaError::ConfigurationError("PostgreSQL storage requires a database URL".to_string())
        })?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(url)
            .map_err(|e| PrectaError::ConfigurationError(format!("Invalid database URL: {}", e)))?;
        Ok(PostgresStorage { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        PostgresStorage { pool }
    }
}

/// Maps driver errors onto the domain taxonomy. Unique violations become
/// conflicts named after the constraint that fired.
fn db_err(err: sqlx::Error) -> PrectaError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => {
                let message = match db.constraint() {
                    Some("appointments_doctor_slot_key") => "This time slot is already booked",
                    Some("consultations_appointment_id_key") => {
                        "A consultation already exists for this appointment"
                    }
                    Some("patients_user_id_key") => "A patient profile already exists for this account",
                    Some("doctors_user_id_key") => "A doctor profile already exists for this account",
                    _ => "Duplicate entry",
                };
                return PrectaError::conflict(message);
            }
            Some("23503") => return PrectaError::not_found("Referenced record not found"),
            _ => {}
        }
    }
    PrectaError::StorageError(err.to_string())
}

fn id(value: String) -> PrectaResult<EntityId> {
    EntityId::new(value).map_err(corrupt)
}

fn opt_id(value: Option<String>) -> PrectaResult<Option<EntityId>> {
    value.map(id).transpose()
}

fn text<T: FromStr<Err = ValidationError>>(value: &str) -> PrectaResult<T> {
    value.parse().map_err(corrupt)
}

fn corrupt(err: ValidationError) -> PrectaError {
    PrectaError::StorageError(format!("Unreadable column value: {}", err))
}

fn weekday_from_db(value: i16) -> PrectaResult<Weekday> {
    match value {
        0 => Ok(Weekday::Mon),
        1 => Ok(Weekday::Tue),
        2 => Ok(Weekday::Wed),
        3 => Ok(Weekday::Thu),
        4 => Ok(Weekday::Fri),
        5 => Ok(Weekday::Sat),
        6 => Ok(Weekday::Sun),
        other => Err(PrectaError::StorageError(format!("Unreadable weekday: {}", other))),
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    role: String,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = PrectaError;

    fn try_from(row: UserRow) -> PrectaResult<Self> {
        Ok(User {
            id: id(row.id)?,
            email: row.email,
            name: row.name,
            role: text(&row.role)?,
            phone: row.phone,
            created_at: row.created_at,
        })
    }
}

const PATIENT_COLUMNS: &str =
    "id, user_id, full_name, date_of_birth, gender, phone, address, created_at";

#[derive(FromRow)]
struct PatientRow {
    id: String,
    user_id: String,
    full_name: String,
    date_of_birth: Option<NaiveDate>,
    gender: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = PrectaError;

    fn try_from(row: PatientRow) -> PrectaResult<Self> {
        Ok(Patient {
            id: id(row.id)?,
            user_id: id(row.user_id)?,
            full_name: row.full_name,
            date_of_birth: row.date_of_birth,
            gender: row.gender,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
        })
    }
}

const DOCTOR_COLUMNS: &str = "id, user_id, clinic_id, full_name, specialty, license_number, bio, \
     consultation_fee_cents, currency, consultation_minutes, offers_video, \
     verification_status::text AS verification_status, submitted_at, verified_at, verified_by, \
     rejection_reason, created_at";

#[derive(FromRow)]
struct DoctorRow {
    id: String,
    user_id: String,
    clinic_id: Option<String>,
    full_name: String,
    specialty: String,
    license_number: String,
    bio: Option<String>,
    consultation_fee_cents: i64,
    currency: String,
    consultation_minutes: i32,
    offers_video: bool,
    verification_status: String,
    submitted_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<String>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DoctorRow> for Doctor {
    type Error = PrectaError;

    fn try_from(row: DoctorRow) -> PrectaResult<Self> {
        Ok(Doctor {
            id: id(row.id)?,
            user_id: id(row.user_id)?,
            clinic_id: opt_id(row.clinic_id)?,
            full_name: row.full_name,
            specialty: row.specialty,
            license_number: row.license_number,
            bio: row.bio,
            consultation_fee_cents: row.consultation_fee_cents,
            currency: row.currency,
            consultation_minutes: row.consultation_minutes,
            offers_video: row.offers_video,
            verification_status: text(&row.verification_status)?,
            submitted_at: row.submitted_at,
            verified_at: row.verified_at,
            verified_by: opt_id(row.verified_by)?,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ClinicRow {
    id: String,
    name: String,
    address: Option<String>,
    city: Option<String>,
    utc_offset_minutes: i32,
    buffer_minutes: i32,
    advance_booking_days: i32,
    min_notice_minutes: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<ClinicRow> for Clinic {
    type Error = PrectaError;

    fn try_from(row: ClinicRow) -> PrectaResult<Self> {
        Ok(Clinic {
            id: id(row.id)?,
            name: row.name,
            address: row.address,
            city: row.city,
            settings: SchedulingSettings {
                utc_offset_minutes: row.utc_offset_minutes,
                buffer_minutes: row.buffer_minutes,
                advance_booking_days: row.advance_booking_days,
                min_notice_minutes: row.min_notice_minutes,
            },
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AvailabilityRow {
    id: String,
    doctor_id: String,
    weekday: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    slot_minutes: i32,
}

impl TryFrom<AvailabilityRow> for AvailabilityWindow {
    type Error = PrectaError;

    fn try_from(row: AvailabilityRow) -> PrectaResult<Self> {
        Ok(AvailabilityWindow {
            id: id(row.id)?,
            doctor_id: id(row.doctor_id)?,
            weekday: weekday_from_db(row.weekday)?,
            start_time: row.start_time,
            end_time: row.end_time,
            slot_minutes: row.slot_minutes,
        })
    }
}

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, clinic_id, scheduled_at, duration_minutes, \
     consultation_type::text AS consultation_type, status::text AS status, cancellation_reason, \
     cancelled_by, cancelled_at, notes, payment_id, created_at, updated_at";

#[derive(FromRow)]
struct AppointmentRow {
    id: String,
    patient_id: String,
    doctor_id: String,
    clinic_id: Option<String>,
    scheduled_at: DateTime<Utc>,
    duration_minutes: i32,
    consultation_type: String,
    status: String,
    cancellation_reason: Option<String>,
    cancelled_by: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = PrectaError;

    fn try_from(row: AppointmentRow) -> PrectaResult<Self> {
        let cancellation = match (row.cancellation_reason, row.cancelled_by, row.cancelled_at) {
            (Some(reason), Some(cancelled_by), Some(cancelled_at)) => Some(Cancellation {
                reason,
                cancelled_by: id(cancelled_by)?,
                cancelled_at,
            }),
            _ => None,
        };
        Ok(Appointment {
            id: id(row.id)?,
            patient_id: id(row.patient_id)?,
            doctor_id: id(row.doctor_id)?,
            clinic_id: opt_id(row.clinic_id)?,
            scheduled_at: row.scheduled_at,
            duration_minutes: row.duration_minutes,
            consultation_type: text(&row.consultation_type)?,
            status: text(&row.status)?,
            cancellation,
            notes: row.notes,
            payment_id: opt_id(row.payment_id)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CONSULTATION_COLUMNS: &str = "id, appointment_id, doctor_id, patient_id, started_at, ended_at, \
     notes, diagnosis, video_room, created_at, updated_at";

#[derive(FromRow)]
struct ConsultationRow {
    id: String,
    appointment_id: String,
    doctor_id: String,
    patient_id: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    diagnosis: Option<String>,
    video_room: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConsultationRow> for Consultation {
    type Error = PrectaError;

    fn try_from(row: ConsultationRow) -> PrectaResult<Self> {
        Ok(Consultation {
            id: id(row.id)?,
            appointment_id: id(row.appointment_id)?,
            doctor_id: id(row.doctor_id)?,
            patient_id: id(row.patient_id)?,
            started_at: row.started_at,
            ended_at: row.ended_at,
            notes: row.notes,
            diagnosis: row.diagnosis,
            video_room: row.video_room,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PRESCRIPTION_COLUMNS: &str =
    "id, consultation_id, doctor_id, patient_id, items, instructions, issued_at, valid_until";

#[derive(FromRow)]
struct PrescriptionRow {
    id: String,
    consultation_id: String,
    doctor_id: String,
    patient_id: String,
    items: Json<Vec<PrescriptionItem>>,
    instructions: Option<String>,
    issued_at: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
}

impl TryFrom<PrescriptionRow> for Prescription {
    type Error = PrectaError;

    fn try_from(row: PrescriptionRow) -> PrectaResult<Self> {
        Ok(Prescription {
            id: id(row.id)?,
            consultation_id: id(row.consultation_id)?,
            doctor_id: id(row.doctor_id)?,
            patient_id: id(row.patient_id)?,
            items: row.items.0,
            instructions: row.instructions,
            issued_at: row.issued_at,
            valid_until: row.valid_until,
        })
    }
}

const ORDER_COLUMNS: &str = "id, patient_id, prescription_id, status::text AS status, total_cents, \
     currency, delivery_address, payment_id, created_at, updated_at";

#[derive(FromRow)]
struct OrderRow {
    id: String,
    patient_id: String,
    prescription_id: String,
    status: String,
    total_cents: i64,
    currency: String,
    delivery_address: String,
    payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = PrectaError;

    fn try_from(row: OrderRow) -> PrectaResult<Self> {
        Ok(Order {
            id: id(row.id)?,
            patient_id: id(row.patient_id)?,
            prescription_id: id(row.prescription_id)?,
            status: text(&row.status)?,
            total_cents: row.total_cents,
            currency: row.currency,
            delivery_address: row.delivery_address,
            payment_id: opt_id(row.payment_id)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, patient_id, purpose::text AS purpose, reference_id, amount_cents, \
     currency, status::text AS status, provider_reference, created_at, updated_at";

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    patient_id: String,
    purpose: String,
    reference_id: String,
    amount_cents: i64,
    currency: String,
    status: String,
    provider_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = PrectaError;

    fn try_from(row: PaymentRow) -> PrectaResult<Self> {
        Ok(Payment {
            id: id(row.id)?,
            patient_id: id(row.patient_id)?,
            purpose: text(&row.purpose)?,
            reference_id: id(row.reference_id)?,
            amount_cents: row.amount_cents,
            currency: row.currency,
            status: text(&row.status)?,
            provider_reference: row.provider_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const RECORD_SELECT: &str = "SELECT r.id, r.patient_id, r.title, r.record_type::text AS record_type, \
     r.description, r.file_url, r.recorded_on, r.created_at, \
     COALESCE(array_agg(s.doctor_id ORDER BY s.shared_at) FILTER (WHERE s.doctor_id IS NOT NULL), '{}') AS shared_with \
     FROM medical_records r LEFT JOIN record_shares s ON s.record_id = r.id";

#[derive(FromRow)]
struct RecordRow {
    id: String,
    patient_id: String,
    title: String,
    record_type: String,
    description: Option<String>,
    file_url: Option<String>,
    recorded_on: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    shared_with: Vec<String>,
}

impl TryFrom<RecordRow> for MedicalRecord {
    type Error = PrectaError;

    fn try_from(row: RecordRow) -> PrectaResult<Self> {
        Ok(MedicalRecord {
            id: id(row.id)?,
            patient_id: id(row.patient_id)?,
            title: row.title,
            record_type: text(&row.record_type)?,
            description: row.description,
            file_url: row.file_url,
            recorded_on: row.recorded_on,
            shared_with: row.shared_with.into_iter().map(id).collect::<PrectaResult<_>>()?,
            created_at: row.created_at,
        })
    }
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, kind::text AS kind, title, body, read_at, created_at";

#[derive(FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    kind: String,
    title: String,
    body: String,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = PrectaError;

    fn try_from(row: NotificationRow) -> PrectaResult<Self> {
        Ok(Notification {
            id: id(row.id)?,
            user_id: id(row.user_id)?,
            kind: text(&row.kind)?,
            title: row.title,
            body: row.body,
            read_at: row.read_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AuditRow {
    id: String,
    actor_id: Option<String>,
    action: String,
    entity_type: String,
    entity_id: String,
    details: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditLogEntry {
    type Error = PrectaError;

    fn try_from(row: AuditRow) -> PrectaResult<Self> {
        Ok(AuditLogEntry {
            id: id(row.id)?,
            actor_id: opt_id(row.actor_id)?,
            action: row.action,
            entity_type: row.entity_type,
            entity_id: id(row.entity_id)?,
            details: row.details,
            created_at: row.created_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> PrectaResult<Vec<T>>
where
    T: TryFrom<R, Error = PrectaError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn convert_opt<R, T>(row: Option<R>) -> PrectaResult<Option<T>>
where
    T: TryFrom<R, Error = PrectaError>,
{
    row.map(T::try_from).transpose()
}

#[async_trait]
impl StorageEngine for PostgresStorage {
    async fn connect(&self) -> PrectaResult<()> {
        self.health_check().await?;
        info!("Connected to PostgreSQL");
        Ok(())
    }

    async fn migrate(&self) -> PrectaResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| PrectaError::StorageError(format!("Migration failed: {}", e)))?;
        info!("Database schema is up to date");
        Ok(())
    }

    async fn health_check(&self) -> PrectaResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(db_err)?;
        Ok(())
    }

    fn engine_type(&self) -> StorageEngineType {
        StorageEngineType::Postgres
    }
}

#[async_trait]
impl DirectoryStore for PostgresStorage {
    async fn get_user(&self, user_id: &EntityId) -> PrectaResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, name, role::text AS role, phone, created_at FROM users WHERE id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        convert_opt(row)
    }

    async fn insert_patient(&self, patient: Patient) -> PrectaResult<Patient> {
        let sql = format!(
            "INSERT INTO patients ({PATIENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {PATIENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(patient.id.as_str())
            .bind(patient.user_id.as_str())
            .bind(&patient.full_name)
            .bind(patient.date_of_birth)
            .bind(&patient.gender)
            .bind(&patient.phone)
            .bind(&patient.address)
            .bind(patient.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_patient(&self, patient_id: &EntityId) -> PrectaResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(patient_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn get_patient_by_user(&self, user_id: &EntityId) -> PrectaResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE user_id = $1");
        let row = sqlx::query_as::<_, PatientRow>(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn insert_doctor(&self, doctor: Doctor) -> PrectaResult<Doctor> {
        let sql = format!(
            "INSERT INTO doctors (id, user_id, clinic_id, full_name, specialty, license_number, bio, \
             consultation_fee_cents, currency, consultation_minutes, offers_video, verification_status, \
             submitted_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::verification_status, $13, $14) \
             RETURNING {DOCTOR_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(doctor.id.as_str())
            .bind(doctor.user_id.as_str())
            .bind(doctor.clinic_id.as_ref().map(|c| c.as_str()))
            .bind(&doctor.full_name)
            .bind(&doctor.specialty)
            .bind(&doctor.license_number)
            .bind(&doctor.bio)
            .bind(doctor.consultation_fee_cents)
            .bind(&doctor.currency)
            .bind(doctor.consultation_minutes)
            .bind(doctor.offers_video)
            .bind(doctor.verification_status.as_str())
            .bind(doctor.submitted_at)
            .bind(doctor.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_doctor(&self, doctor_id: &EntityId) -> PrectaResult<Option<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = $1");
        let row = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(doctor_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn get_doctor_by_user(&self, user_id: &EntityId) -> PrectaResult<Option<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE user_id = $1");
        let row = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn list_doctors_by_verification(
        &self,
        status: VerificationStatus,
    ) -> PrectaResult<Vec<Doctor>> {
        let sql = format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors WHERE verification_status = $1::verification_status \
             ORDER BY submitted_at"
        );
        let rows = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn decide_verification(
        &self,
        doctor_id: &EntityId,
        decision: &VerificationDecision,
    ) -> PrectaResult<Option<Doctor>> {
        let (moderator_id, verified_at, reason) = match decision {
            VerificationDecision::Approve { moderator_id, decided_at } => {
                (moderator_id, Some(*decided_at), None)
            }
            VerificationDecision::Reject { moderator_id, reason, .. } => {
                (moderator_id, None, Some(reason.as_str()))
            }
        };
        let sql = format!(
            "UPDATE doctors SET verification_status = $2::verification_status, verified_at = $3, \
             verified_by = $4, rejection_reason = $5 \
             WHERE id = $1 AND verification_status = 'pending' RETURNING {DOCTOR_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DoctorRow>(&sql)
            .bind(doctor_id.as_str())
            .bind(decision.target_status().as_str())
            .bind(verified_at)
            .bind(moderator_id.as_str())
            .bind(reason)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => match self.get_doctor(doctor_id).await? {
                Some(_) => Err(PrectaError::conflict("Verification already decided")),
                None => Ok(None),
            },
        }
    }

    async fn get_clinic(&self, clinic_id: &EntityId) -> PrectaResult<Option<Clinic>> {
        let row = sqlx::query_as::<_, ClinicRow>(
            "SELECT id, name, address, city, utc_offset_minutes, buffer_minutes, advance_booking_days, \
             min_notice_minutes, created_at FROM clinics WHERE id = $1",
        )
        .bind(clinic_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        convert_opt(row)
    }

    async fn list_availability(&self, doctor_id: &EntityId) -> PrectaResult<Vec<AvailabilityWindow>> {
        let rows = sqlx::query_as::<_, AvailabilityRow>(
            "SELECT id, doctor_id, weekday, start_time, end_time, slot_minutes FROM doctor_availability \
             WHERE doctor_id = $1 ORDER BY weekday, start_time",
        )
        .bind(doctor_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert_all(rows)
    }

    async fn replace_availability(
        &self,
        doctor_id: &EntityId,
        windows: Vec<AvailabilityWindow>,
    ) -> PrectaResult<Vec<AvailabilityWindow>> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        sqlx::query("DELETE FROM doctor_availability WHERE doctor_id = $1")
            .bind(doctor_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        for window in &windows {
            sqlx::query(
                "INSERT INTO doctor_availability (id, doctor_id, weekday, start_time, end_time, slot_minutes) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(window.id.as_str())
            .bind(doctor_id.as_str())
            .bind(window.weekday.num_days_from_monday() as i16)
            .bind(window.start_time)
            .bind(window.end_time)
            .bind(window.slot_minutes)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        debug!("Replaced {} availability windows for doctor {}", windows.len(), doctor_id);
        self.list_availability(doctor_id).await
    }
}

#[async_trait]
impl AppointmentStore for PostgresStorage {
    async fn insert_appointment(&self, appointment: Appointment) -> PrectaResult<Appointment> {
        let sql = format!(
            "INSERT INTO appointments (id, patient_id, doctor_id, clinic_id, scheduled_at, duration_minutes, \
             consultation_type, status, notes, payment_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7::consultation_type, $8::appointment_status, $9, $10, $11, $12) \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment.id.as_str())
            .bind(appointment.patient_id.as_str())
            .bind(appointment.doctor_id.as_str())
            .bind(appointment.clinic_id.as_ref().map(|c| c.as_str()))
            .bind(appointment.scheduled_at)
            .bind(appointment.duration_minutes)
            .bind(appointment.consultation_type.as_str())
            .bind(appointment.status.as_str())
            .bind(&appointment.notes)
            .bind(appointment.payment_id.as_ref().map(|p| p.as_str()))
            .bind(appointment.created_at)
            .bind(appointment.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_appointment(&self, appointment_id: &EntityId) -> PrectaResult<Option<Appointment>> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn list_appointments_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE patient_id = $1 ORDER BY scheduled_at DESC"
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(patient_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn list_appointments_for_doctor(&self, doctor_id: &EntityId) -> PrectaResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE doctor_id = $1 ORDER BY scheduled_at DESC"
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(doctor_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn list_booked_between(
        &self,
        doctor_id: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PrectaResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE doctor_id = $1 \
             AND scheduled_at >= $2 AND scheduled_at < $3 \
             AND status IN ('pending_payment', 'confirmed', 'in_progress', 'completed') \
             ORDER BY scheduled_at"
        );
        let rows = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(doctor_id.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn update_appointment_status(
        &self,
        appointment_id: &EntityId,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        cancellation: Option<Cancellation>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Appointment> {
        expected.ensure_transition(next)?;
        let sql = format!(
            "UPDATE appointments SET status = $3::appointment_status, \
             cancellation_reason = COALESCE($4, cancellation_reason), \
             cancelled_by = COALESCE($5, cancelled_by), \
             cancelled_at = COALESCE($6, cancelled_at), updated_at = $7 \
             WHERE id = $1 AND status = $2::appointment_status RETURNING {APPOINTMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AppointmentRow>(&sql)
            .bind(appointment_id.as_str())
            .bind(expected.as_str())
            .bind(next.as_str())
            .bind(cancellation.as_ref().map(|c| c.reason.as_str()))
            .bind(cancellation.as_ref().map(|c| c.cancelled_by.as_str()))
            .bind(cancellation.as_ref().map(|c| c.cancelled_at))
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => row.try_into(),
            None => match self.get_appointment(appointment_id).await? {
                Some(current) => Err(PrectaError::conflict(format!(
                    "Appointment is now '{}', expected '{}'",
                    current.status, expected
                ))),
                None => Err(PrectaError::not_found("Appointment not found")),
            },
        }
    }
}

#[async_trait]
impl CareStore for PostgresStorage {
    async fn insert_consultation(&self, consultation: Consultation) -> PrectaResult<Consultation> {
        let sql = format!(
            "INSERT INTO consultations ({CONSULTATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {CONSULTATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ConsultationRow>(&sql)
            .bind(consultation.id.as_str())
            .bind(consultation.appointment_id.as_str())
            .bind(consultation.doctor_id.as_str())
            .bind(consultation.patient_id.as_str())
            .bind(consultation.started_at)
            .bind(consultation.ended_at)
            .bind(&consultation.notes)
            .bind(&consultation.diagnosis)
            .bind(&consultation.video_room)
            .bind(consultation.created_at)
            .bind(consultation.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_consultation_by_appointment(
        &self,
        appointment_id: &EntityId,
    ) -> PrectaResult<Option<Consultation>> {
        let sql = format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE appointment_id = $1");
        let row = sqlx::query_as::<_, ConsultationRow>(&sql)
            .bind(appointment_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn get_consultation(&self, consultation_id: &EntityId) -> PrectaResult<Option<Consultation>> {
        let sql = format!("SELECT {CONSULTATION_COLUMNS} FROM consultations WHERE id = $1");
        let row = sqlx::query_as::<_, ConsultationRow>(&sql)
            .bind(consultation_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn update_consultation(
        &self,
        consultation_id: &EntityId,
        notes: ConsultationNotes,
        ended_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Consultation> {
        let sql = format!(
            "UPDATE consultations SET notes = COALESCE($2, notes), diagnosis = COALESCE($3, diagnosis), \
             ended_at = COALESCE($4, ended_at), updated_at = $5 WHERE id = $1 RETURNING {CONSULTATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ConsultationRow>(&sql)
            .bind(consultation_id.as_str())
            .bind(notes.notes)
            .bind(notes.diagnosis)
            .bind(ended_at)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.ok_or_else(|| PrectaError::not_found("Consultation not found"))?
            .try_into()
    }

    async fn insert_prescription(&self, prescription: Prescription) -> PrectaResult<Prescription> {
        let sql = format!(
            "INSERT INTO prescriptions ({PRESCRIPTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {PRESCRIPTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PrescriptionRow>(&sql)
            .bind(prescription.id.as_str())
            .bind(prescription.consultation_id.as_str())
            .bind(prescription.doctor_id.as_str())
            .bind(prescription.patient_id.as_str())
            .bind(Json(&prescription.items))
            .bind(&prescription.instructions)
            .bind(prescription.issued_at)
            .bind(prescription.valid_until)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_prescription(&self, prescription_id: &EntityId) -> PrectaResult<Option<Prescription>> {
        let sql = format!("SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = $1");
        let row = sqlx::query_as::<_, PrescriptionRow>(&sql)
            .bind(prescription_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn list_prescriptions_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Prescription>> {
        let sql = format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE patient_id = $1 ORDER BY issued_at DESC"
        );
        let rows = sqlx::query_as::<_, PrescriptionRow>(&sql)
            .bind(patient_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn insert_order(&self, order: Order) -> PrectaResult<Order> {
        let sql = format!(
            "INSERT INTO orders (id, patient_id, prescription_id, status, total_cents, currency, \
             delivery_address, payment_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4::order_status, $5, $6, $7, $8, $9, $10) RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.id.as_str())
            .bind(order.patient_id.as_str())
            .bind(order.prescription_id.as_str())
            .bind(order.status.as_str())
            .bind(order.total_cents)
            .bind(&order.currency)
            .bind(&order.delivery_address)
            .bind(order.payment_id.as_ref().map(|p| p.as_str()))
            .bind(order.created_at)
            .bind(order.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_order(&self, order_id: &EntityId) -> PrectaResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn list_orders_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE patient_id = $1 ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(patient_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn update_order_status(
        &self,
        order_id: &EntityId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> PrectaResult<Order> {
        expected.ensure_transition(next)?;
        let sql = format!(
            "UPDATE orders SET status = $3::order_status, updated_at = $4 \
             WHERE id = $1 AND status = $2::order_status RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order_id.as_str())
            .bind(expected.as_str())
            .bind(next.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => row.try_into(),
            None => match self.get_order(order_id).await? {
                Some(current) => Err(PrectaError::conflict(format!(
                    "Order is now '{}', expected '{}'",
                    current.status, expected
                ))),
                None => Err(PrectaError::not_found("Order not found")),
            },
        }
    }

    async fn insert_payment(&self, payment: Payment) -> PrectaResult<Payment> {
        let sql = format!(
            "INSERT INTO payments (id, patient_id, purpose, reference_id, amount_cents, currency, status, \
             provider_reference, created_at, updated_at) \
             VALUES ($1, $2, $3::payment_purpose, $4, $5, $6, $7::payment_status, $8, $9, $10) \
             RETURNING {PAYMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment.id.as_str())
            .bind(payment.patient_id.as_str())
            .bind(payment.purpose.as_str())
            .bind(payment.reference_id.as_str())
            .bind(payment.amount_cents)
            .bind(&payment.currency)
            .bind(payment.status.as_str())
            .bind(&payment.provider_reference)
            .bind(payment.created_at)
            .bind(payment.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        row.try_into()
    }

    async fn get_payment(&self, payment_id: &EntityId) -> PrectaResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn update_payment_status(
        &self,
        payment_id: &EntityId,
        expected: PaymentStatus,
        next: PaymentStatus,
        provider_reference: Option<String>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Payment> {
        expected.ensure_transition(next)?;
        let sql = format!(
            "UPDATE payments SET status = $3::payment_status, \
             provider_reference = COALESCE($4, provider_reference), updated_at = $5 \
             WHERE id = $1 AND status = $2::payment_status RETURNING {PAYMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment_id.as_str())
            .bind(expected.as_str())
            .bind(next.as_str())
            .bind(provider_reference)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        match row {
            Some(row) => row.try_into(),
            None => match self.get_payment(payment_id).await? {
                Some(current) => Err(PrectaError::conflict(format!(
                    "Payment is now '{}', expected '{}'",
                    current.status, expected
                ))),
                None => Err(PrectaError::not_found("Payment not found")),
            },
        }
    }
}

#[async_trait]
impl RecordStore for PostgresStorage {
    async fn insert_record(&self, record: MedicalRecord) -> PrectaResult<MedicalRecord> {
        sqlx::query(
            "INSERT INTO medical_records (id, patient_id, title, record_type, description, file_url, \
             recorded_on, created_at) VALUES ($1, $2, $3, $4::record_type, $5, $6, $7, $8)",
        )
        .bind(record.id.as_str())
        .bind(record.patient_id.as_str())
        .bind(&record.title)
        .bind(record.record_type.as_str())
        .bind(&record.description)
        .bind(&record.file_url)
        .bind(record.recorded_on)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        self.get_record(&record.id)
            .await?
            .ok_or_else(|| PrectaError::InternalError("Inserted record vanished".to_string()))
    }

    async fn get_record(&self, record_id: &EntityId) -> PrectaResult<Option<MedicalRecord>> {
        let sql = format!("{RECORD_SELECT} WHERE r.id = $1 GROUP BY r.id");
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(record_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn list_records_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<MedicalRecord>> {
        let sql = format!("{RECORD_SELECT} WHERE r.patient_id = $1 GROUP BY r.id ORDER BY r.created_at DESC");
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(patient_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn delete_record(&self, record_id: &EntityId) -> PrectaResult<bool> {
        let result = sqlx::query("DELETE FROM medical_records WHERE id = $1")
            .bind(record_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn share_record(&self, record_id: &EntityId, doctor_id: &EntityId) -> PrectaResult<MedicalRecord> {
        sqlx::query(
            "INSERT INTO record_shares (record_id, doctor_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(record_id.as_str())
        .bind(doctor_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        self.get_record(record_id)
            .await?
            .ok_or_else(|| PrectaError::not_found("Record not found"))
    }

    async fn revoke_record(&self, record_id: &EntityId, doctor_id: &EntityId) -> PrectaResult<MedicalRecord> {
        sqlx::query("DELETE FROM record_shares WHERE record_id = $1 AND doctor_id = $2")
            .bind(record_id.as_str())
            .bind(doctor_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        self.get_record(record_id)
            .await?
            .ok_or_else(|| PrectaError::not_found("Record not found"))
    }
}

#[async_trait]
impl ActivityStore for PostgresStorage {
    async fn insert_notification(&self, notification: Notification) -> PrectaResult<()> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, title, body, read_at, created_at) \
             VALUES ($1, $2, $3::notification_kind, $4, $5, $6, $7)",
        )
        .bind(notification.id.as_str())
        .bind(notification.user_id.as_str())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_notifications(&self, user_id: &EntityId, limit: i64) -> PrectaResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(user_id.as_str())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        convert_all(rows)
    }

    async fn mark_notification_read(
        &self,
        notification_id: &EntityId,
        user_id: &EntityId,
        at: DateTime<Utc>,
    ) -> PrectaResult<Option<Notification>> {
        let sql = format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, $3) WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(notification_id.as_str())
            .bind(user_id.as_str())
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        convert_opt(row)
    }

    async fn insert_audit_log(&self, entry: AuditLogEntry) -> PrectaResult<()> {
        sqlx::query(
            "INSERT INTO audit_logs (id, actor_id, action, entity_type, entity_id, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(entry.id.as_str())
        .bind(entry.actor_id.as_ref().map(|a| a.as_str()))
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(entry.entity_id.as_str())
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn list_recent_audit_logs(&self, limit: i64) -> PrectaResult<Vec<AuditLogEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, actor_id, action, entity_type, entity_id, details, created_at FROM audit_logs \
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        convert_all(rows)
    }
}

#[async_trait]
impl AnalyticsStore for PostgresStorage {
    async fn platform_metrics(&self) -> PrectaResult<PlatformMetrics> {
        let (total_users, total_patients, total_doctors, revenue_cents): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT (SELECT count(*) FROM users), (SELECT count(*) FROM patients), \
                 (SELECT count(*) FROM doctors), \
                 (SELECT COALESCE(sum(amount_cents), 0)::bigint FROM payments WHERE status = 'completed')",
            )
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let verification_counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT verification_status::text, count(*) FROM doctors GROUP BY 1",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        let mut doctors_by_verification: BTreeMap<String, i64> = VerificationStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        doctors_by_verification.extend(verification_counts);

        let status_counts: Vec<(String, i64)> =
            sqlx::query_as("SELECT status::text, count(*) FROM appointments GROUP BY 1")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        let mut appointments_by_status: BTreeMap<String, i64> = AppointmentStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        appointments_by_status.extend(status_counts);

        Ok(PlatformMetrics {
            total_users,
            total_patients,
            total_doctors,
            pending_verifications: doctors_by_verification
                .get(VerificationStatus::Pending.as_str())
                .copied()
                .unwrap_or(0),
            doctors_by_verification,
            appointments_by_status,
            revenue_cents,
        })
    }

    async fn signups_by_month(&self, since: NaiveDate) -> PrectaResult<Vec<(NaiveDate, i64)>> {
        sqlx::query_as(
            "SELECT date_trunc('month', created_at AT TIME ZONE 'UTC')::date AS month, count(*) \
             FROM users WHERE created_at >= ($1::date)::timestamp AT TIME ZONE 'UTC' \
             GROUP BY 1 ORDER BY 1",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn appointments_by_day(&self, from: NaiveDate, to: NaiveDate) -> PrectaResult<Vec<(NaiveDate, i64)>> {
        sqlx::query_as(
            "SELECT (created_at AT TIME ZONE 'UTC')::date AS day, count(*) FROM appointments \
             WHERE (created_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2 GROUP BY 1 ORDER BY 1",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn top_doctors(&self, limit: i64) -> PrectaResult<Vec<DoctorRanking>> {
        let rows: Vec<(String, String, String, i64)> = sqlx::query_as(
            "SELECT d.id, d.full_name, d.specialty, count(*) AS completed FROM appointments a \
             JOIN doctors d ON d.id = a.doctor_id WHERE a.status = 'completed' \
             GROUP BY d.id, d.full_name, d.specialty ORDER BY completed DESC, d.full_name ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(|(doctor_id, full_name, specialty, completed_appointments)| {
                Ok(DoctorRanking {
                    doctor_id: id(doctor_id)?,
                    full_name,
                    specialty,
                    completed_appointments,
                })
            })
            .collect()
    }
}
