//! Shared types and models for the Automaten Manager
//!
//! This crate contains the refill calculator, submission parsing, posting
//! plans and stock math shared between the backend and the browser (via WASM).
//! It performs no I/O.

pub mod error;
pub mod models;
pub mod posting;
pub mod pricing;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use posting::*;
pub use pricing::*;
pub use types::*;
pub use validation::*;
