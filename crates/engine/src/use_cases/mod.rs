//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.
//! Use cases orchestrate across entity modules to fulfill user stories.

pub mod arcade;
pub mod combination;
pub mod inventory;

// Re-export main types
pub use arcade::ArcadeOps;
pub use combination::{
    ResolutionError, ResolutionSource, ResolveCombination, ResolvedElement, SynthesisSettings,
};
pub use inventory::{InventoryOps, InventoryStats};
