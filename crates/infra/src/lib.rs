//! Infrastructure layer: persistence, OAuth clients, and the services that
//! compose them.

pub mod oauth;
pub mod services;
pub mod store;
