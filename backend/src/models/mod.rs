//! Domain models for the Automaten Manager backend
//!
//! Re-exports the models, calculator and posting plans from the shared crate

pub use shared::*;
