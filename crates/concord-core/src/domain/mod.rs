//! # Concord Domain
//!
//! Records persisted by the coordination stores and the value objects
//! describing their lifecycle.

pub mod entities;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
