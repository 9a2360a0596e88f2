//! Combination use cases.
//!
//! Turns an unordered pair of elements into its result: from the combination
//! store when the pair is known, otherwise from the oracle, with concurrent
//! requests for the same pair collapsed into one oracle call.

mod error;
mod in_flight;
mod resolve;
mod validate;

pub use error::{ResolutionError, ResolutionSource, ResolvedElement};
pub use in_flight::InFlightRegistry;
pub use resolve::{ResolveCombination, SynthesisSettings};
pub use validate::{OracleResponseValidator, ValidatedResponse};
