//! Business logic services for the Automaten Manager

pub mod catalog;
pub mod expense;
pub mod ledger;
pub mod refill;
pub mod reporting;

pub use catalog::CatalogService;
pub use expense::ExpenseService;
pub use ledger::LedgerService;
pub use refill::RefillService;
pub use reporting::ReportingService;
