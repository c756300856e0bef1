// lib/src/lib.rs

//! Storage engines, configuration, slot generation and the business rules
//! of the Precta backend.

pub mod config;
pub mod scheduling;
pub mod services;
pub mod storage_engine;

pub use config::{load_config, AppConfig, StorageEngineType};
pub use scheduling::{generate_slots, Slot, SlotRequest};
pub use services::{Actor, Checkout};
pub use storage_engine::{open_storage, InMemoryStorage, PostgresStorage, PrectaStorage, StorageEngine};
