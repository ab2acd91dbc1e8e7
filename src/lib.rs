#![forbid(unsafe_code)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod ops;
mod paths;
pub mod registry;
pub mod repo;
pub mod secrets;
pub mod store;
pub mod telemetry;

pub use error::{Effect, Error, Transience};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export domain types at crate root for convenience
pub use crate::model::{Environment, EventKind, ImageRef, PromotionEvent, SERVICES, Service};
pub use crate::monitor::{Convergence, HealthState, SyncState, SyncStatus};
pub use crate::registry::StrictnessPolicy;
