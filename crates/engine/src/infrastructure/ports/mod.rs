//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Element, combination and inventory storage (SQLite or in-memory arena)
//! - The generative oracle (OpenAI-compatible HTTP or a test double)
//! - Clock (for testing)

mod error;
mod external;
mod repos;
mod testing;

// =============================================================================
// Repository Ports
// =============================================================================
pub use repos::{CombinationRepo, ElementRepo, InventoryRepo};

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{OracleClient, RawOracleResponse};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use repos::{MockCombinationRepo, MockElementRepo, MockInventoryRepo};

#[cfg(test)]
pub use external::MockOracleClient;

#[cfg(test)]
pub use testing::MockClockPort;

// =============================================================================
// Testing Ports
// =============================================================================
pub use testing::ClockPort;

// =============================================================================
// Error Types
// =============================================================================
pub use error::{OracleError, RepoError, TransportErrorKind};
