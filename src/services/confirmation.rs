use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::errors::BookingError;
use crate::models::{ConfirmationEvent, HookResponse};
use crate::services::submission::SubmissionClient;

/// Handler installed while a booking awaits confirmation. At most one exists
/// per session; resolving or replacing it retires the previous sender, so a
/// stale handler can never misfire against a later booking.
pub struct PendingConfirmation {
    booking_id: Option<String>,
    tx: oneshot::Sender<ConfirmationEvent>,
}

pub type PendingSlot = Mutex<Option<PendingConfirmation>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    NoPending,
    Mismatch,
}

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_attempts: u32,
    pub poll_delay: Duration,
    pub endpoint_configured: bool,
}

/// Installs a fresh handler for `booking_id`, clearing any stale one first.
pub fn install_handler(
    slot: &PendingSlot,
    booking_id: Option<String>,
) -> oneshot::Receiver<ConfirmationEvent> {
    let (tx, rx) = oneshot::channel();
    let mut guard = slot.lock().unwrap();
    guard.take();
    *guard = Some(PendingConfirmation { booking_id, tx });
    rx
}

pub fn clear_handler(slot: &PendingSlot) {
    slot.lock().unwrap().take();
}

/// Routes an externally-delivered confirmation to the waiting booking, if
/// any. Events for a different booking id, or arriving when nothing awaits
/// confirmation, are ignored rather than errored.
pub fn deliver_confirmation(slot: &PendingSlot, event: ConfirmationEvent) -> Delivery {
    let mut guard = slot.lock().unwrap();

    let matches = match guard.as_ref() {
        None => {
            tracing::debug!(booking_id = %event.booking_id, "confirmation with no booking awaiting, ignoring");
            return Delivery::NoPending;
        }
        Some(pending) => pending
            .booking_id
            .as_deref()
            .map_or(true, |id| id == event.booking_id),
    };
    if !matches {
        tracing::debug!(booking_id = %event.booking_id, "confirmation for a different booking, ignoring");
        return Delivery::Mismatch;
    }

    match guard.take() {
        Some(pending) => {
            if pending.tx.send(event).is_err() {
                // The waiter resolved in the meantime; nothing to apply.
                return Delivery::NoPending;
            }
            Delivery::Applied
        }
        None => Delivery::NoPending,
    }
}

/// Callable confirmation hook. Every inbound channel (direct calls and the
/// structural webhook event) funnels through here so validation and matching
/// stay identical.
pub fn confirm_booking(slot: &PendingSlot, event: ConfirmationEvent) -> HookResponse {
    match deliver_confirmation(slot, event) {
        Delivery::Applied => HookResponse::applied("confirmation received"),
        Delivery::NoPending => HookResponse::ignored("no booking awaiting confirmation"),
        Delivery::Mismatch => HookResponse::ignored("booking id does not match the current booking"),
    }
}

/// Waits for the booking's confirmation: races the timeout, the
/// externally-delivered event, and (when an endpoint is configured) a bounded
/// series of confirmation-request attempts that may answer eagerly. The first
/// source to become ready wins; the losers are dropped and the handler is
/// retired before returning.
pub async fn await_confirmation(
    client: &dyn SubmissionClient,
    slot: &PendingSlot,
    booking_id: &str,
    config: &WaitConfig,
) -> Result<ConfirmationEvent, BookingError> {
    let rx = install_handler(slot, Some(booking_id.to_string()));

    let external = async {
        match rx.await {
            Ok(event) => event,
            // Sender retired without firing; leave the timeout to decide.
            Err(_) => std::future::pending().await,
        }
    };

    let outcome = tokio::select! {
        event = external => Some(event),
        event = poll_for_confirmation(client, booking_id, config) => Some(event),
        _ = tokio::time::sleep(config.timeout) => None,
    };

    clear_handler(slot);

    let Some(event) = outcome else {
        tracing::warn!(booking_id = %booking_id, "confirmation wait timed out");
        return Err(BookingError::ConfirmationTimeout {
            booking_id: booking_id.to_string(),
        });
    };

    if event.status.is_success() {
        tracing::info!(booking_id = %booking_id, "booking confirmed");
        Ok(event)
    } else {
        let message = event
            .message
            .unwrap_or_else(|| "booking was not accepted".to_string());
        tracing::warn!(booking_id = %booking_id, message = %message, "booking rejected by confirmation");
        Err(BookingError::ConfirmationRejected {
            booking_id: booking_id.to_string(),
            message,
        })
    }
}

/// Issues up to `poll_attempts` confirmation requests with a fixed delay
/// between them. Resolves only on an eager confirmation; once attempts are
/// exhausted (or no endpoint is configured) the push channel and the timeout
/// decide the outcome.
async fn poll_for_confirmation(
    client: &dyn SubmissionClient,
    booking_id: &str,
    config: &WaitConfig,
) -> ConfirmationEvent {
    if config.endpoint_configured {
        for attempt in 1..=config.poll_attempts {
            match client.request_confirmation(booking_id, attempt).await {
                Ok(Some(event)) => {
                    tracing::info!(booking_id = %booking_id, attempt, "eager confirmation received");
                    return event;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(booking_id = %booking_id, attempt, error = %e, "confirmation request failed");
                }
            }
            if attempt < config.poll_attempts {
                tokio::time::sleep(config.poll_delay).await;
            }
        }
    }
    std::future::pending().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConfirmationStatus;
    use crate::services::submission::SubmissionError;

    struct NoConfirmClient;

    #[async_trait::async_trait]
    impl SubmissionClient for NoConfirmClient {
        async fn submit(&self, _payload: &serde_json::Value) -> Result<(), SubmissionError> {
            Ok(())
        }

        async fn request_confirmation(
            &self,
            _booking_id: &str,
            _attempt: u32,
        ) -> Result<Option<ConfirmationEvent>, SubmissionError> {
            Ok(None)
        }
    }

    struct EagerClient {
        status: ConfirmationStatus,
    }

    #[async_trait::async_trait]
    impl SubmissionClient for EagerClient {
        async fn submit(&self, _payload: &serde_json::Value) -> Result<(), SubmissionError> {
            Ok(())
        }

        async fn request_confirmation(
            &self,
            booking_id: &str,
            _attempt: u32,
        ) -> Result<Option<ConfirmationEvent>, SubmissionError> {
            Ok(Some(ConfirmationEvent {
                booking_id: booking_id.to_string(),
                name: Some("Eager Eve".to_string()),
                status: self.status,
                message: None,
            }))
        }
    }

    fn event(id: &str, status: ConfirmationStatus) -> ConfirmationEvent {
        ConfirmationEvent {
            booking_id: id.to_string(),
            name: Some("Ann Lee".to_string()),
            status,
            message: None,
        }
    }

    fn wait_config(timeout_ms: u64, endpoint_configured: bool) -> WaitConfig {
        WaitConfig {
            timeout: Duration::from_millis(timeout_ms),
            poll_attempts: 2,
            poll_delay: Duration::from_millis(5),
            endpoint_configured,
        }
    }

    #[test]
    fn test_deliver_with_no_pending_is_ignored() {
        let slot: PendingSlot = Mutex::new(None);
        let outcome = deliver_confirmation(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed));
        assert_eq!(outcome, Delivery::NoPending);
    }

    #[test]
    fn test_deliver_mismatched_id_is_ignored_and_keeps_handler() {
        let slot: PendingSlot = Mutex::new(None);
        let mut rx = install_handler(&slot, Some("TB-1-AAAAA".to_string()));

        let outcome = deliver_confirmation(&slot, event("TB-2-BBBBB", ConfirmationStatus::Confirmed));
        assert_eq!(outcome, Delivery::Mismatch);
        // The handler is still armed for the right booking.
        assert!(rx.try_recv().is_err());
        let outcome = deliver_confirmation(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed));
        assert_eq!(outcome, Delivery::Applied);
        assert_eq!(rx.try_recv().unwrap().booking_id, "TB-1-AAAAA");
    }

    #[test]
    fn test_second_delivery_finds_slot_empty() {
        let slot: PendingSlot = Mutex::new(None);
        let _rx = install_handler(&slot, Some("TB-1-AAAAA".to_string()));

        assert_eq!(
            deliver_confirmation(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed)),
            Delivery::Applied
        );
        assert_eq!(
            deliver_confirmation(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed)),
            Delivery::NoPending
        );
    }

    #[test]
    fn test_deliver_matches_when_pending_has_no_id_yet() {
        let slot: PendingSlot = Mutex::new(None);
        let mut rx = install_handler(&slot, None);

        assert_eq!(
            deliver_confirmation(&slot, event("TB-9-ZZZZZ", ConfirmationStatus::Confirmed)),
            Delivery::Applied
        );
        assert_eq!(rx.try_recv().unwrap().booking_id, "TB-9-ZZZZZ");
    }

    #[tokio::test]
    async fn test_wait_resolves_on_external_delivery() {
        let slot: PendingSlot = Mutex::new(None);
        let client = NoConfirmClient;
        let config = wait_config(500, false);

        let wait = await_confirmation(&client, &slot, "TB-1-AAAAA", &config);
        tokio::pin!(wait);

        // Let the waiter install its handler before delivering.
        tokio::select! {
            _ = &mut wait => panic!("resolved before delivery"),
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
        assert_eq!(
            deliver_confirmation(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed)),
            Delivery::Applied
        );

        let confirmed = wait.await.unwrap();
        assert_eq!(confirmed.name.as_deref(), Some("Ann Lee"));
        // Handler retired on resolution.
        assert!(slot.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wait_times_out_and_retires_handler() {
        let slot: PendingSlot = Mutex::new(None);
        let client = NoConfirmClient;
        let config = wait_config(30, false);

        let err = await_confirmation(&client, &slot, "TB-1-AAAAA", &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::ConfirmationTimeout { ref booking_id } if booking_id == "TB-1-AAAAA"
        ));

        // A late confirmation finds no handler and is ignored.
        assert_eq!(
            deliver_confirmation(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed)),
            Delivery::NoPending
        );
    }

    #[tokio::test]
    async fn test_eager_confirmation_wins() {
        let slot: PendingSlot = Mutex::new(None);
        let client = EagerClient {
            status: ConfirmationStatus::Confirmed,
        };
        let config = wait_config(500, true);

        let confirmed = await_confirmation(&client, &slot, "TB-1-AAAAA", &config)
            .await
            .unwrap();
        assert_eq!(confirmed.name.as_deref(), Some("Eager Eve"));
        assert!(slot.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eager_poll_skipped_when_endpoint_not_configured() {
        let slot: PendingSlot = Mutex::new(None);
        let client = EagerClient {
            status: ConfirmationStatus::Confirmed,
        };
        // Endpoint not configured: the eager answer must never be requested,
        // so the short timeout wins.
        let config = wait_config(30, false);

        let err = await_confirmation(&client, &slot, "TB-1-AAAAA", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ConfirmationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_rejecting_status_maps_to_rejected() {
        let slot: PendingSlot = Mutex::new(None);
        let client = EagerClient {
            status: ConfirmationStatus::Failed,
        };
        let config = wait_config(500, true);

        let err = await_confirmation(&client, &slot, "TB-1-AAAAA", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ConfirmationRejected { .. }));
    }

    #[tokio::test]
    async fn test_hook_reports_applied_and_ignored() {
        let slot: PendingSlot = Mutex::new(None);
        let _rx = install_handler(&slot, Some("TB-1-AAAAA".to_string()));

        let applied = confirm_booking(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed));
        assert!(applied.success);

        let ignored = confirm_booking(&slot, event("TB-1-AAAAA", ConfirmationStatus::Confirmed));
        assert!(!ignored.success);
        assert!(ignored.error.is_some());
    }
}
