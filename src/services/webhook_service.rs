//! Webhook service for managing endpoints and sending ticket events.
//!
//! Businesses register HTTPS endpoints that receive signed notifications
//! when tickets are checked in or released. Delivery is best-effort and
//! post-commit: a failed POST is logged and recorded, never surfaced to the
//! operation that triggered it.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppError;
use crate::models::ticket::Ticket;
use crate::models::webhook::{
    NewWebhookEvent, WebhookEndpoint, WebhookEndpointRequest, WebhookEndpointResponse,
    WebhookPayload,
};

type HmacSha256 = Hmac<Sha256>;

/// Event type sent when a ticket is issued.
pub const EVENT_CHECKED_IN: &str = "ticket.checked_in";

/// Event type sent when a ticket is released.
pub const EVENT_RELEASED: &str = "ticket.released";

/// Create a new webhook endpoint.
///
/// # Process
///
/// 1. Validate URL format (HTTPS required; HTTP allowed for localhost)
/// 2. Generate a cryptographically secure secret (32 bytes, 64 hex chars)
/// 3. Store the endpoint
/// 4. Return the endpoint with the secret — the only time it is shown
pub async fn create_webhook_endpoint(
    pool: &DbPool,
    business_id: Uuid,
    request: WebhookEndpointRequest,
) -> Result<WebhookEndpointResponse, AppError> {
    validate_webhook_url(&request.url)?;

    let secret = generate_secret();
    let now = Utc::now().timestamp();

    let endpoint = sqlx::query_as::<_, WebhookEndpoint>(
        r#"
        INSERT INTO webhook_endpoints (business_id, url, secret, created_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(business_id)
    .bind(&request.url)
    .bind(&secret)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(WebhookEndpointResponse::from(endpoint).with_secret(secret))
}

/// List the business's active webhook endpoints. Secrets are not returned.
pub async fn list_webhook_endpoints(
    pool: &DbPool,
    business_id: Uuid,
) -> Result<Vec<WebhookEndpointResponse>, AppError> {
    let endpoints = sqlx::query_as::<_, WebhookEndpoint>(
        "SELECT * FROM webhook_endpoints WHERE business_id = $1 AND is_active = true ORDER BY created_at DESC",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await?;

    Ok(endpoints.into_iter().map(Into::into).collect())
}

/// Soft-delete a webhook endpoint, preserving its event history.
pub async fn delete_webhook_endpoint(
    pool: &DbPool,
    business_id: Uuid,
    endpoint_id: Uuid,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE webhook_endpoints SET is_active = false WHERE id = $1 AND business_id = $2",
    )
    .bind(endpoint_id)
    .bind(business_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("webhook endpoint"));
    }

    Ok(())
}

/// Send a ticket lifecycle event to all active endpoints of a business.
///
/// Failures are logged and recorded per endpoint; the triggering operation
/// has already committed and never observes them.
pub async fn notify_ticket_event(
    pool: &DbPool,
    business_id: Uuid,
    event_type: &str,
    ticket: &Ticket,
) {
    let endpoints = match sqlx::query_as::<_, WebhookEndpoint>(
        "SELECT * FROM webhook_endpoints WHERE business_id = $1 AND is_active = true",
    )
    .bind(business_id)
    .fetch_all(pool)
    .await
    {
        Ok(endpoints) => endpoints,
        Err(e) => {
            tracing::error!("failed to load webhook endpoints: {e}");
            return;
        }
    };

    for endpoint in endpoints {
        if let Err(e) = send_webhook(pool, &endpoint, event_type, ticket).await {
            tracing::error!("failed to send webhook to {}: {e}", endpoint.url);
            // Continue to the next endpoint even if one fails
        }
    }
}

/// Send a single webhook with an HMAC signature and record the attempt.
///
/// # Headers Sent
///
/// - `Content-Type: application/json`
/// - `X-Webhook-Signature: sha256=<hex>`
/// - `X-Webhook-Event-Id: <uuid>`
///
/// Each POST has a 5-second timeout so a slow endpoint cannot stall the
/// delivery loop indefinitely.
async fn send_webhook(
    pool: &DbPool,
    endpoint: &WebhookEndpoint,
    event_type: &str,
    ticket: &Ticket,
) -> Result<(), AppError> {
    let event_id = Uuid::new_v4();

    let payload = WebhookPayload {
        event_id,
        event_type: event_type.to_string(),
        ticket: ticket.clone().into(),
    };
    let payload_json = serde_json::to_string(&payload)
        .map_err(|e| AppError::Internal(format!("failed to serialize webhook payload: {e}")))?;

    let signature = generate_signature(&endpoint.secret, &payload_json);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .map_err(|e| AppError::Internal(format!("HTTP client error: {e}")))?;

    let response = client
        .post(&endpoint.url)
        .header("Content-Type", "application/json")
        .header("X-Webhook-Signature", &signature)
        .header("X-Webhook-Event-Id", event_id.to_string())
        .body(payload_json.clone())
        .send()
        .await;

    let (status, body) = match response {
        Ok(resp) => {
            let status = resp.status().as_u16() as i32;
            let body = resp.text().await.ok();
            (Some(status), body)
        }
        Err(e) => (None, Some(format!("request failed: {e}"))),
    };

    let payload_value: serde_json::Value = serde_json::from_str(&payload_json)
        .map_err(|e| AppError::Internal(format!("failed to parse webhook payload: {e}")))?;

    let event = NewWebhookEvent {
        id: event_id,
        webhook_endpoint_id: endpoint.id,
        ticket_id: ticket.id,
        event_type: event_type.to_string(),
        payload: payload_value,
        response_status: status,
        response_body: body,
    };

    sqlx::query(
        r#"
        INSERT INTO webhook_events (
            id, webhook_endpoint_id, ticket_id, event_type,
            payload, response_status, response_body, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(event.id)
    .bind(event.webhook_endpoint_id)
    .bind(event.ticket_id)
    .bind(&event.event_type)
    .bind(&event.payload)
    .bind(event.response_status)
    .bind(&event.response_body)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;

    Ok(())
}

/// HMAC-SHA256 signature over the payload body, formatted `sha256=<hex>`.
///
/// Receivers recompute the digest over the raw request body and compare in
/// constant time.
fn generate_signature(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// 32 random bytes as 64 hex characters.
fn generate_secret() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Validate webhook URL format.
///
/// # Rules
///
/// - Must parse as a URL, at most 2048 characters
/// - Must be HTTPS; HTTP is allowed for localhost only
fn validate_webhook_url(url: &str) -> Result<(), AppError> {
    if url.len() > 2048 {
        return Err(AppError::Validation(
            "webhook URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed = url::Url::parse(url)
        .map_err(|_| AppError::Validation("invalid webhook URL".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            if matches!(
                parsed.host_str(),
                Some("localhost") | Some("127.0.0.1") | Some("0.0.0.0")
            ) {
                Ok(())
            } else {
                Err(AppError::Validation(
                    "HTTP is only allowed for localhost; use HTTPS".to_string(),
                ))
            }
        }
        _ => Err(AppError::Validation(
            "webhook URL must use HTTP or HTTPS".to_string(),
        )),
    }
}
