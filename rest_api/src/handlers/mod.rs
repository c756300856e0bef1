// rest_api/src/handlers/mod.rs

pub mod admin;
pub mod appointments;
pub mod auth_proxy;
pub mod consultations;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod profiles;
pub mod records;
pub mod system;
