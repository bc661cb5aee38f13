use hotel_access::{AccessError, PlanError};
use hotel_history::HistoryError;
use hotel_types::StoreError;

/// Errors surfaced by entity services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not authorized: {0}")]
    AccessDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    /// Safe to retry without side effects on read paths.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::StorageUnavailable(_))
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ServiceError::NotFound(what),
            StoreError::InvalidQuery(_) | StoreError::MissingIndex(_) => {
                tracing::error!(error = %e, "store rejected a planned query");
                ServiceError::StorageUnavailable(e.to_string())
            }
            StoreError::Unavailable(_) | StoreError::Timeout(_) => {
                ServiceError::StorageUnavailable(e.to_string())
            }
        }
    }
}

impl From<AccessError> for ServiceError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::Store(e) => e.into(),
        }
    }
}

impl From<PlanError> for ServiceError {
    fn from(e: PlanError) -> Self {
        match e {
            PlanError::AccessDenied(unit) => ServiceError::AccessDenied(unit),
            PlanError::Access(e) => e.into(),
        }
    }
}

impl From<HistoryError> for ServiceError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::Store(e) => e.into(),
            HistoryError::Encode(msg) => ServiceError::InvalidInput(msg),
        }
    }
}
