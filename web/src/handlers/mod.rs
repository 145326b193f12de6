//! HTTP handlers shared by every Eventbook service.

pub mod health;
