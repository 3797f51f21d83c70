use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use tradebook::config::AppConfig;
use tradebook::handlers;
use tradebook::services::lifecycle::BookingSession;
use tradebook::services::submission::HttpSubmissionClient;
use tradebook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        !config.webhook_url.is_empty(),
        "WEBHOOK_URL must be set to the booking submission endpoint"
    );
    match config.confirmation_endpoint() {
        Some(url) => tracing::info!("confirmation endpoint configured: {url}"),
        None => tracing::info!("no confirmation endpoint configured, relying on push delivery"),
    }

    let submitter = HttpSubmissionClient::new(
        config.webhook_url.clone(),
        config.confirmation_endpoint().map(str::to_string),
        config.webhook_token.clone(),
        config.submit_timeout(),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        submitter: Box::new(submitter),
        session: BookingSession::new(),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/bookings", post(handlers::bookings::submit_booking))
        .route("/api/bookings/retry", post(handlers::bookings::retry_booking))
        .route(
            "/api/bookings/current",
            get(handlers::bookings::current_booking),
        )
        .route("/api/bookings/events", get(handlers::bookings::events_stream))
        .route(
            "/webhook/confirmation",
            post(handlers::confirmation::confirmation_webhook),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
