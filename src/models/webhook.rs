//! Webhook models for endpoint registration and event delivery.
//!
//! # Webhook Flow
//!
//! 1. Business registers a webhook endpoint via `POST /api/v1/webhooks`
//! 2. System generates a secret for HMAC signature verification
//! 3. When a ticket is checked in or released, the system sends a signed
//!    notification to every active endpoint of the owning business
//! 4. Business verifies the `X-Webhook-Signature` header using the secret
//!
//! # Security
//!
//! - Secrets are only shown once during registration
//! - Payloads are signed using HMAC-SHA256
//! - HTTPS is required for production endpoints

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::ticket::TicketResponse;

/// Webhook endpoint registered by a business.
///
/// The `secret` is stored in plaintext (required for HMAC generation) but
/// never returned in list operations.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WebhookEndpoint {
    pub id: Uuid,
    pub business_id: Uuid,
    pub url: String,
    pub secret: String,
    pub is_active: bool,
    pub created_at: i64,
}

/// Request to register a new webhook endpoint.
///
/// ```json
/// {
///   "url": "https://example.com/webhook"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct WebhookEndpointRequest {
    pub url: String,
}

/// Response when registering or listing a webhook endpoint.
///
/// The `secret` field is ONLY included when creating a new endpoint; list
/// operations omit it.
#[derive(Debug, Serialize)]
pub struct WebhookEndpointResponse {
    pub id: Uuid,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
}

impl From<WebhookEndpoint> for WebhookEndpointResponse {
    fn from(endpoint: WebhookEndpoint) -> Self {
        Self {
            id: endpoint.id,
            url: endpoint.url,
            secret: None,
            is_active: endpoint.is_active,
            created_at: endpoint.created_at,
        }
    }
}

impl WebhookEndpointResponse {
    /// Attach the plaintext secret (registration response only).
    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }
}

/// The JSON body POSTed to webhook endpoints.
///
/// ```json
/// {
///   "event_id": "770e8400-e29b-41d4-a716-446655440002",
///   "event_type": "ticket.checked_in",
///   "ticket": { "ticket_id": "...", "slot_number": 12, "status": "active", ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub event_id: Uuid,
    pub event_type: String,
    pub ticket: TicketResponse,
}

/// Delivery-attempt record persisted for every webhook POST.
#[derive(Debug)]
pub struct NewWebhookEvent {
    pub id: Uuid,
    pub webhook_endpoint_id: Uuid,
    pub ticket_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub response_status: Option<i32>,
    pub response_body: Option<String>,
}
