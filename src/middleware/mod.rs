//! HTTP middleware components.
//!
//! Middleware run before route handlers; here that means authenticating the
//! request and injecting the principal the core operates on.

/// API key authentication middleware
pub mod auth;
