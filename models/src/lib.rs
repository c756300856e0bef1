// models/src/lib.rs

#[macro_use]
mod macros;

pub mod analytics;
pub mod errors;
pub mod identifiers;
pub mod lifecycle;
pub mod medical;

pub use analytics::{DoctorRanking, GrowthPoint, PlatformMetrics, TimeseriesPoint};
pub use errors::{PrectaError, PrectaResult, ValidationError, ValidationResult};
pub use identifiers::EntityId;
pub use lifecycle::Lifecycle;
pub use medical::*;
