//! Shared types, models and the effect planner for the ERP backend
//!
//! Everything in this crate is pure: it decides what an operation changes,
//! and the backend applies those changes inside a database transaction.

pub mod effects;
pub mod memo;
pub mod models;
pub mod types;
pub mod validation;

pub use effects::*;
pub use memo::*;
pub use models::*;
pub use types::*;
pub use validation::*;
