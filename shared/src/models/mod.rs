//! Domain models

pub mod catalog;
pub mod expense;
pub mod inventory;
pub mod refill;

pub use catalog::*;
pub use expense::*;
pub use inventory::*;
pub use refill::*;
