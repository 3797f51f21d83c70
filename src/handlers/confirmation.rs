use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use crate::models::ConfirmationEvent;
use crate::services::confirmation;
use crate::state::AppState;

pub const CONFIRMATION_EVENT_TYPE: &str = "booking_confirmation";

/// Structural confirmation event as posted by the external system.
#[derive(Deserialize)]
pub struct ConfirmationEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub event: ConfirmationEvent,
}

fn validate_signature(secret: &str, signature: &str, body: &str) -> bool {
    let mut mac = match Hmac::<Sha1>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body.as_bytes());
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    expected == signature
}

// POST /webhook/confirmation — the inbound push channel. Delegates to the
// same hook the callable channel uses.
pub async fn confirmation_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    // Validate the signature over the raw body (skip if no secret is
    // configured — dev mode)
    if !state.config.confirmation_secret.is_empty() {
        let signature = headers
            .get("x-confirmation-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if signature.is_empty() {
            tracing::warn!("missing X-Confirmation-Signature header");
            return (StatusCode::FORBIDDEN, "Missing signature").into_response();
        }
        if !validate_signature(&state.config.confirmation_secret, signature, &body) {
            tracing::warn!("invalid confirmation signature");
            return (StatusCode::FORBIDDEN, "Invalid signature").into_response();
        }
    }

    let envelope: ConfirmationEnvelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": format!("invalid confirmation event: {e}")})),
            )
                .into_response();
        }
    };

    if envelope.kind != CONFIRMATION_EVENT_TYPE {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "unsupported event type"})),
        )
            .into_response();
    }

    tracing::info!(
        booking_id = %envelope.event.booking_id,
        status = envelope.event.status.as_str(),
        "confirmation event received"
    );

    let response = confirmation::confirm_booking(state.session.pending(), envelope.event);
    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_roundtrip() {
        let secret = "shared-secret";
        let body = r#"{"type":"booking_confirmation","bookingId":"TB-1-AAAAA"}"#;

        let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        let signature =
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        assert!(validate_signature(secret, &signature, body));
        assert!(!validate_signature(secret, &signature, "tampered"));
        assert!(!validate_signature("other-secret", &signature, body));
    }

    #[test]
    fn test_envelope_parsing() {
        let envelope: ConfirmationEnvelope = serde_json::from_str(
            r#"{"type":"booking_confirmation","booking_id":"TB-1-AAAAA","name":"Ann Lee","status":"confirmed"}"#,
        )
        .unwrap();
        assert_eq!(envelope.kind, CONFIRMATION_EVENT_TYPE);
        assert_eq!(envelope.event.booking_id, "TB-1-AAAAA");
    }
}
