//! HTTP request handlers

pub mod auth;
pub mod customer;
pub mod employee;
pub mod health;
pub mod order;
pub mod product;
pub mod purchase;
pub mod reporting;
pub mod sale;

pub use auth::*;
pub use customer::*;
pub use employee::*;
pub use health::*;
pub use order::*;
pub use product::*;
pub use purchase::*;
pub use reporting::*;
pub use sale::*;
