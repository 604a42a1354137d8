//! Persistence boundary for users, sessions, verifications and todos.
//!
//! Two backends implement every trait here: `InMemoryStore` (dev/tests) and
//! `PostgresStore` (production).

pub mod in_memory;
pub mod postgres;
pub mod schema;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{SessionStore, StoreError, TodoStore, UserStore, Verification, VerificationStore};
