//! HTTP API: config, routing, session middleware, and request/response mapping.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod cookie;
pub mod middleware;
