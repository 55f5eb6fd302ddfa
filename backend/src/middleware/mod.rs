//! Request middleware and extractors

pub mod auth;
pub mod branch;

pub use auth::{auth_middleware, AuthUser, CurrentUser};
pub use branch::Branch;
