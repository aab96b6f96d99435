//! Service-layer error model.

use thiserror::Error;

use wareflow_core::DomainError;

use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure of a service operation.
///
/// Domain errors pass through unchanged; the two saga-specific variants name
/// the step that failed so callers can tell an inventory rejection from an
/// audit-log outage.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The atomic inventory adjustment was rejected or failed.
    #[error("inventory update failed: {0}")]
    InventoryUpdate(String),

    /// Writing the transaction log entry failed.
    #[error("transaction log append failed: {0}")]
    LogAppend(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::Domain(DomainError::not_found(entity, id))
    }
}
