//! `tickbox-core`: shared domain primitives (identifiers, errors).
//!
//! No IO, no HTTP, no storage.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::{AccountId, SessionId, TodoId, UserId};
