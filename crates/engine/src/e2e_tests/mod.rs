//! Backend E2E integration tests.
//!
//! These tests drive the complete App (coordinator, inventory, arcade and a
//! real store) with a scripted oracle in place of the HTTP client.
//!
//! ```bash
//! cargo test -p mixit-engine --lib e2e_tests
//! ```

mod e2e_helpers;

pub use e2e_helpers::*;
