//! # Concord Core
//!
//! Core types, error taxonomy, and domain records shared by the Concord
//! coordination primitives: leases, queue messages, and scheduled tasks.

pub mod domain;
pub mod error;
pub mod id;
pub mod result;
pub mod telemetry;

pub use domain::*;
pub use error::*;
pub use id::*;
pub use result::*;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};

// Re-export shaku for dependency injection
pub use shaku::Interface;
