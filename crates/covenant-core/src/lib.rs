pub mod error;
pub mod types;

#[cfg(feature = "covenants")]
pub mod covenants;

#[cfg(feature = "pricing")]
pub mod pricing;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "audit")]
pub mod audit;

#[cfg(feature = "simulation")]
pub mod simulation;

#[cfg(feature = "service")]
pub mod service;

#[cfg(feature = "analyst")]
pub mod analyst;

pub use error::CovenantError;
pub use types::*;

/// Standard result type for all covenant engine operations
pub type CovenantResult<T> = Result<T, CovenantError>;
