use std::sync::Mutex;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::errors::BookingError;
use crate::models::{BookingForm, BookingRecord, ConfirmationEvent};
use crate::services::confirmation::{self, PendingSlot, WaitConfig};
use crate::services::identifier;
use crate::services::submission::{SubmissionClient, SubmissionError};
use crate::services::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Editing,
    Submitting,
    AwaitingConfirmation,
    Succeeded,
    Failed(FailureKind),
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Editing => "editing",
            Phase::Submitting => "submitting",
            Phase::AwaitingConfirmation => "awaiting_confirmation",
            Phase::Succeeded => "succeeded",
            Phase::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Timeout,
    Server,
    ConfirmationTimeout,
    ConfirmationRejected,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::Server => "server",
            FailureKind::ConfirmationTimeout => "confirmation_timeout",
            FailureKind::ConfirmationRejected => "confirmation_rejected",
        }
    }

    fn from_error(err: &BookingError) -> Option<Self> {
        match err {
            BookingError::Submission { source, .. } => Some(match source {
                SubmissionError::Network(_) => FailureKind::Network,
                SubmissionError::Timeout(_) => FailureKind::Timeout,
                SubmissionError::Server(_) => FailureKind::Server,
            }),
            BookingError::ConfirmationTimeout { .. } => Some(FailureKind::ConfirmationTimeout),
            BookingError::ConfirmationRejected { .. } => Some(FailureKind::ConfirmationRejected),
            _ => None,
        }
    }
}

/// Read-only view of the session for rendering, also broadcast on every
/// transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<&'static str>,
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingRecord>,
}

/// Request metadata captured at the HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub user_agent: String,
    pub referrer: Option<String>,
}

#[derive(Debug)]
pub enum RetryOutcome {
    Resubmitted(BookingRecord),
    Reset,
}

struct SessionInner {
    phase: Phase,
    booking: Option<BookingRecord>,
    // Serialized once at submission time; retries resend it byte-identical.
    payload: Option<serde_json::Value>,
    attempt: u32,
}

/// The single in-memory booking slot. One booking occupies the lifecycle at
/// a time; a new submission is refused until the previous one reaches a
/// terminal state.
pub struct BookingSession {
    inner: Mutex<SessionInner>,
    pending: PendingSlot,
    events_tx: broadcast::Sender<Snapshot>,
}

impl BookingSession {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            inner: Mutex::new(SessionInner {
                phase: Phase::Editing,
                booking: None,
                payload: None,
                attempt: 0,
            }),
            pending: Mutex::new(None),
            events_tx,
        }
    }

    pub fn pending(&self) -> &PendingSlot {
        &self.pending
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.events_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.lock().unwrap();
        Self::snapshot_of(&inner)
    }

    fn snapshot_of(inner: &SessionInner) -> Snapshot {
        Snapshot {
            phase: inner.phase.as_str(),
            failure: match inner.phase {
                Phase::Failed(kind) => Some(kind.as_str()),
                _ => None,
            },
            attempt: inner.attempt,
            booking: inner.booking.clone(),
        }
    }

    fn broadcast(&self) {
        let _ = self.events_tx.send(self.snapshot());
    }

    fn set_phase(&self, phase: Phase) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.phase = phase;
        }
        self.broadcast();
    }

    fn mark_succeeded(&self) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.phase = Phase::Succeeded;
            inner.attempt = 0;
        }
        self.broadcast();
    }

    /// Attaches the confirmation-derived fields, the only mutation a record
    /// sees after submission.
    fn apply_confirmation(
        &self,
        mut record: BookingRecord,
        event: ConfirmationEvent,
    ) -> BookingRecord {
        record.status = Some(event.status);
        record.confirmed_name = event.name;
        record.confirmation_message = event.message;
        record.confirmed_at = Some(Utc::now());

        let mut inner = self.inner.lock().unwrap();
        inner.booking = Some(record.clone());
        record
    }
}

impl Default for BookingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// The validated-form entry point: builds the record, occupies the slot and
/// drives submission plus confirmation to a terminal state. Validation
/// failures short-circuit before anything is submitted and never consume a
/// retry attempt.
pub async fn submit_booking(
    session: &BookingSession,
    client: &dyn SubmissionClient,
    config: &AppConfig,
    form: BookingForm,
    ctx: ClientContext,
) -> Result<BookingRecord, BookingError> {
    let validated = validation::validate_form(&form, Utc::now().date_naive())
        .map_err(BookingError::Validation)?;

    let record = BookingRecord {
        booking_id: identifier::generate_booking_id(),
        name: validated.name,
        date: validated.date,
        time: validated.time,
        call_type: validated.call_type,
        phone_number: validated.phone_number,
        timestamp: Utc::now(),
        timezone: form.timezone.unwrap_or_else(|| "unknown".to_string()),
        user_agent: ctx.user_agent,
        referrer: form
            .referrer
            .or(ctx.referrer)
            .unwrap_or_else(|| "direct".to_string()),
        status: None,
        confirmed_name: None,
        confirmation_message: None,
        confirmed_at: None,
    };
    let payload = serde_json::to_value(&record).unwrap_or_default();

    {
        let mut inner = session.inner.lock().unwrap();
        if matches!(inner.phase, Phase::Submitting | Phase::AwaitingConfirmation) {
            return Err(BookingError::BookingInFlight);
        }
        inner.booking = Some(record.clone());
        inner.payload = Some(payload);
        inner.attempt = 0;
        inner.phase = Phase::Submitting;
    }
    session.broadcast();

    tracing::info!(booking_id = %record.booking_id, name = %record.name, "starting booking submission");

    run_to_completion(session, client, config).await
}

/// The user-retry signal. From a failed state: resubmits the stored record
/// while attempts remain, otherwise clears the slot and returns to editing.
pub async fn retry_booking(
    session: &BookingSession,
    client: &dyn SubmissionClient,
    config: &AppConfig,
) -> Result<RetryOutcome, BookingError> {
    {
        let mut inner = session.inner.lock().unwrap();
        if !matches!(inner.phase, Phase::Failed(_)) {
            return Err(BookingError::NothingToRetry);
        }

        let can_resubmit =
            inner.booking.is_some() && inner.attempt < config.max_retries.max(1);
        if !can_resubmit {
            inner.booking = None;
            inner.payload = None;
            inner.attempt = 0;
            inner.phase = Phase::Editing;
            drop(inner);
            session.broadcast();
            tracing::info!("retry budget exhausted, returning to editing");
            return Ok(RetryOutcome::Reset);
        }
        inner.phase = Phase::Submitting;
    }
    session.broadcast();

    run_to_completion(session, client, config)
        .await
        .map(RetryOutcome::Resubmitted)
}

async fn run_to_completion(
    session: &BookingSession,
    client: &dyn SubmissionClient,
    config: &AppConfig,
) -> Result<BookingRecord, BookingError> {
    let result = drive(session, client, config).await;
    match &result {
        Ok(record) => {
            session.mark_succeeded();
            tracing::info!(booking_id = %record.booking_id, "booking succeeded");
        }
        Err(err) => {
            if let Some(kind) = FailureKind::from_error(err) {
                session.set_phase(Phase::Failed(kind));
            }
            tracing::warn!(error = %err, "booking failed");
        }
    }
    result
}

async fn drive(
    session: &BookingSession,
    client: &dyn SubmissionClient,
    config: &AppConfig,
) -> Result<BookingRecord, BookingError> {
    let (record, payload) = {
        let inner = session.inner.lock().unwrap();
        let record = inner.booking.clone().ok_or(BookingError::NothingToRetry)?;
        let payload = inner.payload.clone().ok_or(BookingError::NothingToRetry)?;
        (record, payload)
    };

    submit_with_retries(session, client, config, &record.booking_id, &payload).await?;

    session.set_phase(Phase::AwaitingConfirmation);
    let wait = WaitConfig {
        timeout: config.confirmation_timeout(),
        poll_attempts: config.confirmation_attempts,
        poll_delay: config.confirmation_poll_delay(),
        endpoint_configured: config.confirmation_endpoint().is_some(),
    };
    let event =
        confirmation::await_confirmation(client, &session.pending, &record.booking_id, &wait)
            .await?;

    Ok(session.apply_confirmation(record, event))
}

/// Bounded submission retry with linear backoff. Network, timeout and server
/// failures are retried; the attempt counter survives across manual retries
/// so the overall budget stays bounded.
async fn submit_with_retries(
    session: &BookingSession,
    client: &dyn SubmissionClient,
    config: &AppConfig,
    booking_id: &str,
    payload: &serde_json::Value,
) -> Result<(), BookingError> {
    let max_attempts = config.max_retries.max(1);

    loop {
        let attempt = {
            let mut inner = session.inner.lock().unwrap();
            inner.phase = Phase::Submitting;
            inner.attempt += 1;
            inner.attempt
        };
        session.broadcast();

        match client.submit(payload).await {
            Ok(()) => {
                tracing::info!(booking_id = %booking_id, attempt, "booking submitted");
                return Ok(());
            }
            Err(source) => {
                tracing::warn!(booking_id = %booking_id, attempt, error = %source, "submission attempt failed");
                if attempt >= max_attempts {
                    return Err(BookingError::Submission {
                        booking_id: booking_id.to_string(),
                        source,
                    });
                }
                tokio::time::sleep(config.retry_backoff() * attempt).await;
            }
        }
    }
}
