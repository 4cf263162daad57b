//! Tenancy guard: ownership predicates enforced before any state mutation.
//!
//! A business exclusively owns its services, slots (transitively), and
//! tickets. Every operation checks ownership up front so the core never
//! emits a state change that would be rolled back for tenancy reasons.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::service::Service;

/// True when the service belongs to the business.
pub fn owns_service(business_id: Uuid, service: &Service) -> bool {
    service.business_id == business_id
}

/// Ownership check for service-scoped operations.
pub fn ensure_service_owner(business_id: Uuid, service: &Service) -> Result<(), AppError> {
    if owns_service(business_id, service) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "service does not belong to this business".to_string(),
        ))
    }
}

/// Ownership check for ticket-scoped operations, resolved through the
/// ticket's service.
pub fn ensure_ticket_owner(business_id: Uuid, service: &Service) -> Result<(), AppError> {
    if owns_service(business_id, service) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "ticket does not belong to this business".to_string(),
        ))
    }
}
