// lib/src/services/mod.rs

//! Business rules. Every operation takes the storage as `&dyn PrectaStorage`
//! and the current time explicitly.

pub mod access;
pub mod activity;
pub mod analytics;
pub mod booking;
pub mod cancellation;
pub mod consultation;
pub mod lifecycle;
pub mod orders;
pub mod payments;
pub mod profiles;
pub mod records;
pub mod slots;
pub mod verification;

#[cfg(test)]
pub(crate) mod testing;

pub use access::Actor;
pub use payments::Checkout;
