pub mod analysis;
pub mod error;
pub mod risk;
pub(crate) mod stats;
pub mod types;

#[cfg(feature = "loader")]
pub mod loader;

#[cfg(feature = "performance")]
pub mod performance;

pub use error::RiskError;
pub use types::*;

/// Standard result type for all return-risk operations
pub type RiskResult<T> = Result<T, RiskError>;
