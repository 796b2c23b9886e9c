//! Mapping of lifecycle errors onto HTTP errors

use common::error::ApiError;
use tracing::error;

use crate::lifecycle::LifecycleError;

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LifecycleError::Gone => ApiError::Gone(err.to_string()),
            LifecycleError::Expired | LifecycleError::NoChangeRequested => {
                ApiError::Validation(err.to_string())
            }
            LifecycleError::QuotaExceeded(_)
            | LifecycleError::PhotoLimitReached(_)
            | LifecycleError::PhotoQuotaExceeded { .. } => ApiError::QuotaExceeded(err.to_string()),
            LifecycleError::Store(e) => {
                error!("Album store error: {:#}", e);
                ApiError::Internal
            }
        }
    }
}
