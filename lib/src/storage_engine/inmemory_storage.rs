// lib/src/storage_engine/inmemory_storage.rs

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use tokio::sync::RwLock;

use models::errors::{PrectaError, PrectaResult};
use models::{
    Appointment, AppointmentStatus, AuditLogEntry, AvailabilityWindow, Cancellation, Clinic,
    Consultation, ConsultationNotes, Doctor, DoctorRanking, EntityId, Lifecycle, MedicalRecord,
    Notification, Order, OrderStatus, Patient, Payment, PaymentStatus, PlatformMetrics,
    Prescription, User, VerificationDecision, VerificationStatus,
};

use super::storage_engine::{
    ActivityStore, AnalyticsStore, AppointmentStore, CareStore, DirectoryStore, RecordStore,
    StorageEngine,
};
use crate::config::StorageEngineType;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<EntityId, User>,
    patients: HashMap<EntityId, Patient>,
    doctors: HashMap<EntityId, Doctor>,
    clinics: HashMap<EntityId, Clinic>,
    availability: HashMap<EntityId, Vec<AvailabilityWindow>>,
    appointments: HashMap<EntityId, Appointment>,
    consultations: HashMap<EntityId, Consultation>,
    prescriptions: HashMap<EntityId, Prescription>,
    orders: HashMap<EntityId, Order>,
    payments: HashMap<EntityId, Payment>,
    records: HashMap<EntityId, MedicalRecord>,
    notifications: Vec<Notification>,
    audit_log: Vec<AuditLogEntry>,
}

/// Process-local storage with the same constraint semantics as the
/// PostgreSQL schema. Every write takes the single table lock, so the
/// uniqueness checks and the insert that follows them are atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts are owned by the auth provider; this stands in for its writes.
    pub async fn seed_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id.clone(), user);
    }

    pub async fn seed_clinic(&self, clinic: Clinic) {
        self.tables.write().await.clinics.insert(clinic.id.clone(), clinic);
    }
}

fn newest_first<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl StorageEngine for InMemoryStorage {
    async fn connect(&self) -> PrectaResult<()> {
        Ok(())
    }

    async fn migrate(&self) -> PrectaResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> PrectaResult<()> {
        Ok(())
    }

    fn engine_type(&self) -> StorageEngineType {
        StorageEngineType::Memory
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStorage {
    async fn get_user(&self, id: &EntityId) -> PrectaResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn insert_patient(&self, patient: Patient) -> PrectaResult<Patient> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&patient.user_id) {
            return Err(PrectaError::not_found("User not found"));
        }
        if tables.patients.values().any(|p| p.user_id == patient.user_id) {
            return Err(PrectaError::conflict("A patient profile already exists for this account"));
        }
        tables.patients.insert(patient.id.clone(), patient.clone());
        Ok(patient)
    }

    async fn get_patient(&self, id: &EntityId) -> PrectaResult<Option<Patient>> {
        Ok(self.tables.read().await.patients.get(id).cloned())
    }

    async fn get_patient_by_user(&self, user_id: &EntityId) -> PrectaResult<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables.patients.values().find(|p| &p.user_id == user_id).cloned())
    }

    async fn insert_doctor(&self, doctor: Doctor) -> PrectaResult<Doctor> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&doctor.user_id) {
            return Err(PrectaError::not_found("User not found"));
        }
        if let Some(clinic_id) = &doctor.clinic_id {
            if !tables.clinics.contains_key(clinic_id) {
                return Err(PrectaError::not_found("Clinic not found"));
            }
        }
        if tables.doctors.values().any(|d| d.user_id == doctor.user_id) {
            return Err(PrectaError::conflict("A doctor profile already exists for this account"));
        }
        tables.doctors.insert(doctor.id.clone(), doctor.clone());
        Ok(doctor)
    }

    async fn get_doctor(&self, id: &EntityId) -> PrectaResult<Option<Doctor>> {
        Ok(self.tables.read().await.doctors.get(id).cloned())
    }

    async fn get_doctor_by_user(&self, user_id: &EntityId) -> PrectaResult<Option<Doctor>> {
        let tables = self.tables.read().await;
        Ok(tables.doctors.values().find(|d| &d.user_id == user_id).cloned())
    }

    async fn list_doctors_by_verification(
        &self,
        status: VerificationStatus,
    ) -> PrectaResult<Vec<Doctor>> {
        let tables = self.tables.read().await;
        let mut doctors: Vec<Doctor> = tables
            .doctors
            .values()
            .filter(|d| d.verification_status == status)
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(doctors)
    }

    async fn decide_verification(
        &self,
        doctor_id: &EntityId,
        decision: &VerificationDecision,
    ) -> PrectaResult<Option<Doctor>> {
        let mut tables = self.tables.write().await;
        let Some(doctor) = tables.doctors.get_mut(doctor_id) else {
            return Ok(None);
        };
        if doctor.verification_status != VerificationStatus::Pending {
            return Err(PrectaError::conflict("Verification already decided"));
        }
        decision.apply(doctor);
        Ok(Some(doctor.clone()))
    }

    async fn get_clinic(&self, id: &EntityId) -> PrectaResult<Option<Clinic>> {
        Ok(self.tables.read().await.clinics.get(id).cloned())
    }

    async fn list_availability(&self, doctor_id: &EntityId) -> PrectaResult<Vec<AvailabilityWindow>> {
        let tables = self.tables.read().await;
        Ok(tables.availability.get(doctor_id).cloned().unwrap_or_default())
    }

    async fn replace_availability(
        &self,
        doctor_id: &EntityId,
        mut windows: Vec<AvailabilityWindow>,
    ) -> PrectaResult<Vec<AvailabilityWindow>> {
        let mut tables = self.tables.write().await;
        if !tables.doctors.contains_key(doctor_id) {
            return Err(PrectaError::not_found("Doctor not found"));
        }
        windows.sort_by_key(|w| (w.weekday.num_days_from_monday(), w.start_time));
        tables.availability.insert(doctor_id.clone(), windows.clone());
        Ok(windows)
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStorage {
    async fn insert_appointment(&self, appointment: Appointment) -> PrectaResult<Appointment> {
        let mut tables = self.tables.write().await;
        let taken = tables.appointments.values().any(|a| {
            a.doctor_id == appointment.doctor_id
                && a.scheduled_at == appointment.scheduled_at
                && a.status.occupies_slot()
        });
        if taken {
            return Err(PrectaError::conflict("This time slot is already booked"));
        }
        tables.appointments.insert(appointment.id.clone(), appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(&self, id: &EntityId) -> PrectaResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(id).cloned())
    }

    async fn list_appointments_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| &a.patient_id == patient_id)
            .cloned()
            .collect();
        newest_first(&mut found, |a| a.scheduled_at);
        Ok(found)
    }

    async fn list_appointments_for_doctor(&self, doctor_id: &EntityId) -> PrectaResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| &a.doctor_id == doctor_id)
            .cloned()
            .collect();
        newest_first(&mut found, |a| a.scheduled_at);
        Ok(found)
    }

    async fn list_booked_between(
        &self,
        doctor_id: &EntityId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PrectaResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| {
                &a.doctor_id == doctor_id
                    && a.status.occupies_slot()
                    && a.scheduled_at >= from
                    && a.scheduled_at < to
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| a.scheduled_at);
        Ok(found)
    }

    async fn update_appointment_status(
        &self,
        id: &EntityId,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        cancellation: Option<Cancellation>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Appointment> {
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .get_mut(id)
            .ok_or_else(|| PrectaError::not_found("Appointment not found"))?;
        if appointment.status != expected {
            return Err(PrectaError::conflict(format!(
                "Appointment is now '{}', expected '{}'",
                appointment.status, expected
            )));
        }
        expected.ensure_transition(next)?;
        appointment.status = next;
        if cancellation.is_some() {
            appointment.cancellation = cancellation;
        }
        appointment.updated_at = at;
        Ok(appointment.clone())
    }
}

#[async_trait]
impl CareStore for InMemoryStorage {
    async fn insert_consultation(&self, consultation: Consultation) -> PrectaResult<Consultation> {
        let mut tables = self.tables.write().await;
        if tables
            .consultations
            .values()
            .any(|c| c.appointment_id == consultation.appointment_id)
        {
            return Err(PrectaError::conflict("A consultation already exists for this appointment"));
        }
        tables.consultations.insert(consultation.id.clone(), consultation.clone());
        Ok(consultation)
    }

    async fn get_consultation_by_appointment(
        &self,
        appointment_id: &EntityId,
    ) -> PrectaResult<Option<Consultation>> {
        let tables = self.tables.read().await;
        Ok(tables
            .consultations
            .values()
            .find(|c| &c.appointment_id == appointment_id)
            .cloned())
    }

    async fn get_consultation(&self, id: &EntityId) -> PrectaResult<Option<Consultation>> {
        Ok(self.tables.read().await.consultations.get(id).cloned())
    }

    async fn update_consultation(
        &self,
        id: &EntityId,
        notes: ConsultationNotes,
        ended_at: Option<DateTime<Utc>>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Consultation> {
        let mut tables = self.tables.write().await;
        let consultation = tables
            .consultations
            .get_mut(id)
            .ok_or_else(|| PrectaError::not_found("Consultation not found"))?;
        if notes.notes.is_some() {
            consultation.notes = notes.notes;
        }
        if notes.diagnosis.is_some() {
            consultation.diagnosis = notes.diagnosis;
        }
        if ended_at.is_some() {
            consultation.ended_at = ended_at;
        }
        consultation.updated_at = at;
        Ok(consultation.clone())
    }

    async fn insert_prescription(&self, prescription: Prescription) -> PrectaResult<Prescription> {
        let mut tables = self.tables.write().await;
        if !tables.consultations.contains_key(&prescription.consultation_id) {
            return Err(PrectaError::not_found("Consultation not found"));
        }
        tables.prescriptions.insert(prescription.id.clone(), prescription.clone());
        Ok(prescription)
    }

    async fn get_prescription(&self, id: &EntityId) -> PrectaResult<Option<Prescription>> {
        Ok(self.tables.read().await.prescriptions.get(id).cloned())
    }

    async fn list_prescriptions_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Prescription>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Prescription> = tables
            .prescriptions
            .values()
            .filter(|p| &p.patient_id == patient_id)
            .cloned()
            .collect();
        newest_first(&mut found, |p| p.issued_at);
        Ok(found)
    }

    async fn insert_order(&self, order: Order) -> PrectaResult<Order> {
        let mut tables = self.tables.write().await;
        tables.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: &EntityId) -> PrectaResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(id).cloned())
    }

    async fn list_orders_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| &o.patient_id == patient_id)
            .cloned()
            .collect();
        newest_first(&mut found, |o| o.created_at);
        Ok(found)
    }

    async fn update_order_status(
        &self,
        id: &EntityId,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> PrectaResult<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(id)
            .ok_or_else(|| PrectaError::not_found("Order not found"))?;
        if order.status != expected {
            return Err(PrectaError::conflict(format!(
                "Order is now '{}', expected '{}'",
                order.status, expected
            )));
        }
        expected.ensure_transition(next)?;
        order.status = next;
        order.updated_at = at;
        Ok(order.clone())
    }

    async fn insert_payment(&self, payment: Payment) -> PrectaResult<Payment> {
        let mut tables = self.tables.write().await;
        tables.payments.insert(payment.id.clone(), payment.clone());
        Ok(payment)
    }

    async fn get_payment(&self, id: &EntityId) -> PrectaResult<Option<Payment>> {
        Ok(self.tables.read().await.payments.get(id).cloned())
    }

    async fn update_payment_status(
        &self,
        id: &EntityId,
        expected: PaymentStatus,
        next: PaymentStatus,
        provider_reference: Option<String>,
        at: DateTime<Utc>,
    ) -> PrectaResult<Payment> {
        let mut tables = self.tables.write().await;
        let payment = tables
            .payments
            .get_mut(id)
            .ok_or_else(|| PrectaError::not_found("Payment not found"))?;
        if payment.status != expected {
            return Err(PrectaError::conflict(format!(
                "Payment is now '{}', expected '{}'",
                payment.status, expected
            )));
        }
        expected.ensure_transition(next)?;
        payment.status = next;
        if provider_reference.is_some() {
            payment.provider_reference = provider_reference;
        }
        payment.updated_at = at;
        Ok(payment.clone())
    }
}

#[async_trait]
impl RecordStore for InMemoryStorage {
    async fn insert_record(&self, record: MedicalRecord) -> PrectaResult<MedicalRecord> {
        let mut tables = self.tables.write().await;
        if !tables.patients.contains_key(&record.patient_id) {
            return Err(PrectaError::not_found("Patient not found"));
        }
        tables.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_record(&self, id: &EntityId) -> PrectaResult<Option<MedicalRecord>> {
        Ok(self.tables.read().await.records.get(id).cloned())
    }

    async fn list_records_for_patient(&self, patient_id: &EntityId) -> PrectaResult<Vec<MedicalRecord>> {
        let tables = self.tables.read().await;
        let mut found: Vec<MedicalRecord> = tables
            .records
            .values()
            .filter(|r| &r.patient_id == patient_id)
            .cloned()
            .collect();
        newest_first(&mut found, |r| r.created_at);
        Ok(found)
    }

    async fn delete_record(&self, id: &EntityId) -> PrectaResult<bool> {
        Ok(self.tables.write().await.records.remove(id).is_some())
    }

    async fn share_record(&self, record_id: &EntityId, doctor_id: &EntityId) -> PrectaResult<MedicalRecord> {
        let mut tables = self.tables.write().await;
        if !tables.doctors.contains_key(doctor_id) {
            return Err(PrectaError::not_found("Doctor not found"));
        }
        let record = tables
            .records
            .get_mut(record_id)
            .ok_or_else(|| PrectaError::not_found("Record not found"))?;
        if !record.shared_with.contains(doctor_id) {
            record.shared_with.push(doctor_id.clone());
        }
        Ok(record.clone())
    }

    async fn revoke_record(&self, record_id: &EntityId, doctor_id: &EntityId) -> PrectaResult<MedicalRecord> {
        let mut tables = self.tables.write().await;
        let record = tables
            .records
            .get_mut(record_id)
            .ok_or_else(|| PrectaError::not_found("Record not found"))?;
        record.shared_with.retain(|d| d != doctor_id);
        Ok(record.clone())
    }
}

#[async_trait]
impl ActivityStore for InMemoryStorage {
    async fn insert_notification(&self, notification: Notification) -> PrectaResult<()> {
        self.tables.write().await.notifications.push(notification);
        Ok(())
    }

    async fn list_notifications(&self, user_id: &EntityId, limit: i64) -> PrectaResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| &n.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut found, |n| n.created_at);
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn mark_notification_read(
        &self,
        id: &EntityId,
        user_id: &EntityId,
        at: DateTime<Utc>,
    ) -> PrectaResult<Option<Notification>> {
        let mut tables = self.tables.write().await;
        let Some(notification) = tables
            .notifications
            .iter_mut()
            .find(|n| &n.id == id && &n.user_id == user_id)
        else {
            return Ok(None);
        };
        notification.read_at.get_or_insert(at);
        Ok(Some(notification.clone()))
    }

    async fn insert_audit_log(&self, entry: AuditLogEntry) -> PrectaResult<()> {
        self.tables.write().await.audit_log.push(entry);
        Ok(())
    }

    async fn list_recent_audit_logs(&self, limit: i64) -> PrectaResult<Vec<AuditLogEntry>> {
        let tables = self.tables.read().await;
        let mut entries = tables.audit_log.clone();
        newest_first(&mut entries, |e| e.created_at);
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}

fn month_start(at: DateTime<Utc>) -> NaiveDate {
    NaiveDate::from_ymd_opt(at.year(), at.month(), 1).unwrap_or_default()
}

#[async_trait]
impl AnalyticsStore for InMemoryStorage {
    async fn platform_metrics(&self) -> PrectaResult<PlatformMetrics> {
        let tables = self.tables.read().await;

        let mut doctors_by_verification: BTreeMap<String, i64> = VerificationStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for doctor in tables.doctors.values() {
            *doctors_by_verification
                .entry(doctor.verification_status.to_string())
                .or_default() += 1;
        }

        let mut appointments_by_status: BTreeMap<String, i64> = AppointmentStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for appointment in tables.appointments.values() {
            *appointments_by_status.entry(appointment.status.to_string()).or_default() += 1;
        }

        let revenue_cents = tables
            .payments
            .values()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount_cents)
            .sum();

        Ok(PlatformMetrics {
            total_users: tables.users.len() as i64,
            total_patients: tables.patients.len() as i64,
            total_doctors: tables.doctors.len() as i64,
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
        let tables = self.tables.read().await;
        let mut months: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for user in tables.users.values() {
            let month = month_start(user.created_at);
            if month >= since {
                *months.entry(month).or_default() += 1;
            }
        }
        Ok(months.into_iter().collect())
    }

    async fn appointments_by_day(&self, from: NaiveDate, to: NaiveDate) -> PrectaResult<Vec<(NaiveDate, i64)>> {
        let tables = self.tables.read().await;
        let mut days: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for appointment in tables.appointments.values() {
            let day = appointment.created_at.date_naive();
            if day >= from && day <= to {
                *days.entry(day).or_default() += 1;
            }
        }
        Ok(days.into_iter().collect())
    }

    async fn top_doctors(&self, limit: i64) -> PrectaResult<Vec<DoctorRanking>> {
        let tables = self.tables.read().await;
        let mut completed: HashMap<&EntityId, i64> = HashMap::new();
        for appointment in tables.appointments.values() {
            if appointment.status == AppointmentStatus::Completed {
                *completed.entry(&appointment.doctor_id).or_default() += 1;
            }
        }
        let mut rankings: Vec<DoctorRanking> = completed
            .into_iter()
            .filter_map(|(doctor_id, count)| {
                tables.doctors.get(doctor_id).map(|d| DoctorRanking {
                    doctor_id: d.id.clone(),
                    full_name: d.full_name.clone(),
                    specialty: d.specialty.clone(),
                    completed_appointments: count,
                })
            })
            .collect();
        rankings.sort_by(|a, b| {
            b.completed_appointments
                .cmp(&a.completed_appointments)
                .then_with(|| a.full_name.cmp(&b.full_name))
        });
        rankings.truncate(limit.max(0) as usize);
        Ok(rankings)
    }
}
