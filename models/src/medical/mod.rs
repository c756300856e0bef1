// models/src/medical/mod.rs

pub mod appointment;
pub mod audit_log;
pub mod clinic;
pub mod consultation;
pub mod doctor;
pub mod medical_record;
pub mod notification;
pub mod order;
pub mod patient;
pub mod payment;
pub mod prescription;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus, Cancellation, ConsultationType, NewAppointment};
pub use audit_log::AuditLogEntry;
pub use clinic::{AvailabilityWindow, Clinic, NewAvailabilityWindow, SchedulingSettings};
pub use consultation::{Consultation, ConsultationNotes};
pub use doctor::{Doctor, NewDoctor, VerificationDecision, VerificationStatus};
pub use medical_record::{MedicalRecord, RecordType};
pub use notification::{Notification, NotificationKind};
pub use order::{Order, OrderStatus};
pub use patient::{NewPatient, Patient};
pub use payment::{Payment, PaymentPurpose, PaymentStatus};
pub use prescription::{Prescription, PrescriptionItem};
pub use user::{User, UserRole};
