//! HTTP request handlers (route handlers).
//!
//! Handlers receive HTTP requests, validate input, call the service layer,
//! and return HTTP responses.

/// Registration and login handlers
pub mod auth;

/// Health check handler for monitoring
pub mod health;

/// Service management handlers (create, list, stats)
pub mod services;

/// Ticket lifecycle handlers (check-in, scan, release)
pub mod tickets;

/// Webhook endpoint management handlers
pub mod webhooks;
