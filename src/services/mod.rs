//! Business logic services.
//!
//! Services contain core logic separated from HTTP handlers: database
//! transactions, validation, the slot-capacity state machine, and the
//! ticket lifecycle engine.

pub mod auth_service;
pub mod catalog_service;
pub mod slot_service;
pub mod tenancy;
pub mod ticket_service;
pub mod webhook_service;
