//! # docket-core
//!
//! Core types, traits, and abstractions for the docket case-management
//! backend.
//!
//! This crate provides the domain models, error type, storage seams, clock
//! and calendar helpers that the other docket crates depend on.

pub mod calendar;
pub mod defaults;
pub mod error;
pub mod events;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::PushEvent;
pub use models::*;
pub use traits::*;
