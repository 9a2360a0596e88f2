//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod clock;
pub mod config;
pub mod openai;
pub mod persistence;
pub mod ports;
pub mod retry;
pub mod telemetry;
