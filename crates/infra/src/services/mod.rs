//! Application services: the use cases behind the HTTP routes.
//!
//! Services depend on store traits only and are cheap to clone.

pub mod admin;
pub mod auth;
pub mod todos;

pub use admin::{AdminError, AdminService};
pub use auth::{AuthError, AuthService, ClientInfo, IssuedSession, ResolvedSession};
pub use todos::{TodoError, TodoService};
