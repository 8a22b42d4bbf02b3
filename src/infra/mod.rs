//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod output;
pub mod pinata;
pub mod snapshot;
pub mod telemetry;
