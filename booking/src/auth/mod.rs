//! Authentication for the booking API.
//!
//! Tokens are resolved by the [`crate::accounts::AccountDirectory`]; this
//! module only turns request headers into callers.

pub mod middleware;

pub use middleware::{BearerToken, RequireAdmin, SessionUser};
