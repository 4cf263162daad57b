//! Service and slot models, plus the service API request/response types.
//!
//! A service is a capacity-limited offering (e.g. "Cloakroom") owned by one
//! business. Its capacity is materialized as `total_slots` individual slot
//! rows, numbered `1..=total_slots`; the slot is the unit of contention
//! between concurrent check-ins.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slot status: available for claiming.
pub const SLOT_FREE: &str = "free";

/// Slot status: bound to exactly one active ticket.
pub const SLOT_OCCUPIED: &str = "occupied";

/// Represents a service record from the database.
///
/// `total_slots` is immutable after creation; the invariant is that exactly
/// `total_slots` slot rows exist for this service at all times.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,

    /// Owning business; enforced on every operation that touches the service
    pub business_id: Uuid,

    pub name: String,
    pub total_slots: i32,

    /// Creation time, seconds since epoch
    pub created_at: i64,

    /// Last update time, seconds since epoch
    pub updated_at: i64,
}

/// Represents a slot record from the database.
///
/// Slots are generated in a batch when the service is created and are never
/// deleted except by cascade with the service. Status mutates only through
/// the slot pool: claim (free → occupied) and release (occupied → free).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Slot {
    pub id: Uuid,
    pub service_id: Uuid,

    /// Position within the service, 1-based
    pub slot_number: i32,

    /// "free" or "occupied"
    pub status: String,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Request body for creating a service.
///
/// ```json
/// {
///   "name": "Cloakroom",
///   "total_slots": 120
/// }
/// ```
///
/// # Validation
///
/// - `name`: required, non-empty
/// - `total_slots`: required, must be greater than zero
#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub total_slots: i32,
}

/// Response body for service endpoints.
#[derive(Debug, Serialize)]
pub struct ServiceResponse {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub total_slots: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Service> for ServiceResponse {
    fn from(service: Service) -> Self {
        Self {
            id: service.id,
            business_id: service.business_id,
            name: service.name,
            total_slots: service.total_slots,
            created_at: service.created_at,
            updated_at: service.updated_at,
        }
    }
}

/// Occupancy statistics for a service, computed from a single aggregate
/// query over the slot rows.
///
/// ```json
/// {
///   "service_id": "550e8400-e29b-41d4-a716-446655440000",
///   "name": "Cloakroom",
///   "total": 120,
///   "occupied": 37,
///   "free": 83
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ServiceStatsResponse {
    pub service_id: Uuid,
    pub name: String,
    pub total: i64,
    pub occupied: i64,
    pub free: i64,
}
