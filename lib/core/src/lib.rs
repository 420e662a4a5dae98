//! Core domain types for the authgate authentication gateway.
//!
//! This crate provides the foundational types shared by every gateway crate:
//! the strategy selector (`AuthMethod`) and the normalized user record
//! (`AuthUser`) that the wrapped application sees regardless of which
//! authentication strategy is active.

pub mod method;
pub mod user;

pub use method::{AuthMethod, UnknownAuthMethod};
pub use user::AuthUser;
