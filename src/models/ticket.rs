//! Ticket model and the check-in / scan / release API types.
//!
//! A ticket is an issued claim on one slot of one service, optionally bound
//! to a customer. Every active ticket corresponds to exactly one occupied
//! slot; releasing the ticket frees the slot. `hmac_digest` is the signature
//! carried by the QR code, stored verbatim for scan lookups and audit.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ticket status: slot claimed, QR valid for admission decisions.
pub const TICKET_ACTIVE: &str = "active";

/// Ticket status: terminal; the slot has been returned to the pool.
pub const TICKET_RELEASED: &str = "released";

/// Represents a ticket record from the database.
///
/// Invariants upheld by the ticket engine:
/// - an `active` ticket's slot is `occupied` and belongs to the same service;
/// - `released_at` is set iff `status = "released"`; released is terminal;
/// - `hmac_digest` is unique (the insert aborts on a duplicate and check-in
///   retries once with a fresh id).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub service_id: Uuid,
    pub slot_id: Uuid,

    /// Denormalized from the slot row for display
    pub slot_number: i32,

    /// Optional holder; tickets may be anonymous
    pub customer_id: Option<Uuid>,

    /// "active" or "released"
    pub status: String,

    /// Lowercase hex HMAC-SHA256 digest from the signed QR payload
    pub hmac_digest: String,

    /// Issue time, seconds since epoch (the payload's `iat`)
    pub issued_at: i64,

    /// Release time, seconds since epoch; set exactly once
    pub released_at: Option<i64>,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Request body for checking in: claim a slot and issue a signed QR ticket.
///
/// ```json
/// {
///   "service_id": "550e8400-e29b-41d4-a716-446655440000",
///   "customer_id": null
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub service_id: Uuid,

    /// Optional holder to bind the ticket to
    pub customer_id: Option<Uuid>,
}

/// Response body for a successful check-in.
///
/// `qr_payload` is the base64url string to render as a QR image; it is
/// opaque to clients and only the server can verify it.
#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub ticket_id: Uuid,
    pub slot_number: i32,
    pub qr_payload: String,
    pub issued_at: i64,
}

/// Request body for scanning a QR code.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// The base64url payload read from the QR image
    pub qr_payload: String,
}

/// Response body for a scan.
///
/// Scanning is a query, not an admission gate: it never mutates state. An
/// admission policy (e.g. reject already-released tickets) is the caller's
/// responsibility; this response carries enough to decide.
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub ticket_id: Uuid,
    pub service_id: Uuid,
    pub slot_number: i32,
    pub status: String,
    pub issued_at: i64,
    pub released_at: Option<i64>,
}

impl From<Ticket> for ScanResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            ticket_id: ticket.id,
            service_id: ticket.service_id,
            slot_number: ticket.slot_number,
            status: ticket.status,
            issued_at: ticket.issued_at,
            released_at: ticket.released_at,
        }
    }
}

/// Response body for ticket listings and release.
///
/// Excludes `hmac_digest`: the stored signature is for scan lookups and
/// audit, not for re-deriving QR codes client-side.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket_id: Uuid,
    pub service_id: Uuid,
    pub slot_number: i32,
    pub customer_id: Option<Uuid>,
    pub status: String,
    pub issued_at: i64,
    pub released_at: Option<i64>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            ticket_id: ticket.id,
            service_id: ticket.service_id,
            slot_number: ticket.slot_number,
            customer_id: ticket.customer_id,
            status: ticket.status,
            issued_at: ticket.issued_at,
            released_at: ticket.released_at,
        }
    }
}
