use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::submission::SubmissionError;

/// Failure taxonomy for the booking lifecycle. Submission and confirmation
/// failures keep the booking reference so the user can quote it to support.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("submission failed for booking {booking_id}: {source}")]
    Submission {
        booking_id: String,
        #[source]
        source: SubmissionError,
    },

    #[error("no confirmation received for booking {booking_id}")]
    ConfirmationTimeout { booking_id: String },

    #[error("booking {booking_id} was rejected: {message}")]
    ConfirmationRejected { booking_id: String, message: String },

    #[error("a booking is already in progress")]
    BookingInFlight,

    #[error("no failed booking to retry")]
    NothingToRetry,
}

impl BookingError {
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation",
            BookingError::Submission { source, .. } => source.kind(),
            BookingError::ConfirmationTimeout { .. } => "confirmation_timeout",
            BookingError::ConfirmationRejected { .. } => "confirmation_rejected",
            BookingError::BookingInFlight => "in_flight",
            BookingError::NothingToRetry => "nothing_to_retry",
        }
    }

    pub fn booking_id(&self) -> Option<&str> {
        match self {
            BookingError::Submission { booking_id, .. }
            | BookingError::ConfirmationTimeout { booking_id }
            | BookingError::ConfirmationRejected { booking_id, .. } => Some(booking_id),
            _ => None,
        }
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Submission { source, .. } => match source {
                SubmissionError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            BookingError::ConfirmationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            BookingError::ConfirmationRejected { .. } => StatusCode::BAD_GATEWAY,
            BookingError::BookingInFlight => StatusCode::CONFLICT,
            BookingError::NothingToRetry => StatusCode::CONFLICT,
        };

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        if let Some(id) = self.booking_id() {
            body["bookingId"] = id.into();
        }
        (status, axum::Json(body)).into_response()
    }
}
