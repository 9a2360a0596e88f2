//! Mixit Engine library.
//!
//! Resolves combinations of two elements into a third, caching every answer
//! of the generative oracle so a pair is only ever synthesized once, and
//! tracks which elements each owner has discovered.
//!
//! ## Structure
//!
//! - `entities/` - Entity modules wrapping domain operations
//! - `use_cases/` - Combination resolution and inventory orchestration
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `app` - Application composition

pub mod app;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;

/// E2E tests over the fully wired App.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
pub use infrastructure::config::EngineConfig;
pub use infrastructure::telemetry::init_tracing;
pub use use_cases::{ResolutionError, ResolutionSource, ResolvedElement};
