//! HTTP handlers

pub mod device;
pub mod expense;
pub mod health;
pub mod inventory;
pub mod product;
pub mod refill;
pub mod supplier;

pub use device::*;
pub use expense::*;
pub use health::*;
pub use inventory::*;
pub use product::*;
pub use refill::*;
pub use supplier::*;
