use axum::{http::StatusCode, Json};
use thiserror::Error;

use crate::models::ApiResponse;
use crate::schedule::TimeOfDay;

/// Failure talking to the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed {table} row {key}: {reason}")]
    Corrupt {
        table: &'static str,
        key: String,
        reason: String,
    },

    #[error("slot list encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything the scheduling core can report to its callers.
#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("invalid service window {start}-{end} with {slot_minutes}-minute slots")]
    InvalidWindow {
        start: TimeOfDay,
        end: TimeOfDay,
        slot_minutes: u16,
    },

    #[error("requested range conflicts with reservation {0}")]
    SlotConflict(i64),

    #[error("record store unavailable: {0}")]
    RecordStoreUnavailable(#[from] StoreError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("reservation {0} not found")]
    NotFound(i64),
}

impl SchedulingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Handler error shape, same envelope as successful responses.
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

pub fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::error(msg)))
}

/// Requesters only ever see "choose another time" or "try again".
impl From<SchedulingError> for ApiError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::SlotConflict(id) => {
                tracing::info!("request rejected: overlaps reservation {}", id);
                api_error(
                    StatusCode::CONFLICT,
                    "This time is already taken. Please choose another time.",
                )
            }
            SchedulingError::Validation(msg) => api_error(StatusCode::BAD_REQUEST, msg),
            SchedulingError::NotFound(id) => {
                api_error(StatusCode::NOT_FOUND, format!("Booking {} not found", id))
            }
            SchedulingError::RecordStoreUnavailable(e) => {
                tracing::error!("record store failure: {}", e);
                api_error(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Something went wrong. Please try again.",
                )
            }
            SchedulingError::InvalidWindow {
                start,
                end,
                slot_minutes,
            } => {
                tracing::error!(
                    "service window {}-{} with {}-minute slots is misconfigured",
                    start,
                    end,
                    slot_minutes
                );
                api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_hide_detail() {
        let err = SchedulingError::from(StoreError::Database(sqlx::Error::PoolClosed));
        let (status, Json(body)) = ApiError::from(err);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.ok);
        assert!(!body.error.unwrap().contains("pool"));
    }

    #[test]
    fn conflict_maps_to_409() {
        let (status, _) = ApiError::from(SchedulingError::SlotConflict(7));
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn validation_message_is_passed_through() {
        let (status, Json(body)) = ApiError::from(SchedulingError::validation("phone is required"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("phone is required"));
    }
}
