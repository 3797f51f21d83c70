use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::Json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::errors::BookingError;
use crate::models::BookingForm;
use crate::services::lifecycle::{self, ClientContext, RetryOutcome, Snapshot};
use crate::state::AppState;

fn client_context(headers: &HeaderMap) -> ClientContext {
    ClientContext {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string(),
        referrer: headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

// POST /api/bookings — drives the lifecycle to a terminal state.
pub async fn submit_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(form): Json<BookingForm>,
) -> Result<(StatusCode, Json<serde_json::Value>), BookingError> {
    let ctx = client_context(&headers);
    let record = lifecycle::submit_booking(
        &state.session,
        state.submitter.as_ref(),
        &state.config,
        form,
        ctx,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "ok": true, "booking": record })),
    ))
}

// POST /api/bookings/retry
pub async fn retry_booking(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, BookingError> {
    let outcome =
        lifecycle::retry_booking(&state.session, state.submitter.as_ref(), &state.config).await?;

    match outcome {
        RetryOutcome::Resubmitted(record) => {
            Ok(Json(serde_json::json!({ "ok": true, "booking": record })))
        }
        RetryOutcome::Reset => Ok(Json(serde_json::json!({ "ok": true, "reset": true }))),
    }
}

// GET /api/bookings/current
pub async fn current_booking(State(state): State<Arc<AppState>>) -> Json<Snapshot> {
    Json(state.session.snapshot())
}

// GET /api/bookings/events — SSE stream of lifecycle snapshots
pub async fn events_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.session.subscribe();

    let live = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(snapshot) => {
            let data = serde_json::to_string(&snapshot).unwrap_or_default();
            Some(Ok::<_, Infallible>(
                Event::default().data(data).event("booking_state"),
            ))
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(_)) => None,
    });

    let keepalive = tokio_stream::StreamExt::map(
        tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(30))),
        |_| Ok(Event::default().comment("keepalive")),
    );

    Sse::new(StreamExt::merge(live, keepalive))
}
