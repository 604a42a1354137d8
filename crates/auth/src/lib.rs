//! `tickbox-auth`: authentication/authorization boundary.
//!
//! Pure types and policy: no HTTP, no storage. The API crate resolves sessions
//! and calls into the predicates here; infra persists what is modelled here.

pub mod authorize;
pub mod identity;
pub mod password;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{AuthzError, Owned, authorize_owner, require_admin, require_identity};
pub use identity::Identity;
pub use password::{PasswordError, hash_password, validate_password, verify_dummy_password, verify_password};
pub use roles::Role;
pub use session::{Session, SessionToken, SessionValidationError, validate_session};
pub use user::{Account, OAuthProfile, ProviderId, SignUpInput, User, normalize_email, validate_email, validate_name};
