//! Domain models for the ERP backend

mod ledger;
mod order;
mod payroll;
mod purchase;
mod rollup;
mod sale;

pub use ledger::*;
pub use order::*;
pub use payroll::*;
pub use purchase::*;
pub use rollup::*;
pub use sale::*;
