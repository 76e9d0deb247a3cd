//! Core types for Rabit.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod status;
pub mod validation;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
pub use validation::FieldErrors;
