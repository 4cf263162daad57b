//! Data models representing database entities and API request/response types.

/// Business (tenant) model and registration types
pub mod business;

/// Customer model and login types
pub mod customer;

/// Service and slot models, occupancy stats
pub mod service;

/// Ticket model and check-in / scan / release types
pub mod ticket;

/// Webhook endpoint and delivery-event models
pub mod webhook;
