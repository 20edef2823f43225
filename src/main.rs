use std::sync::Arc;
use std::time::{Duration, Instant};

use cleaning_booking::clock::SystemClock;
use cleaning_booking::config::AppConfig;
use cleaning_booking::events::TracingEventSink;
use cleaning_booking::{create_router, db, logging, AppState, Repositories};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    logging::init_logging();
    tracing::info!("Cleaning Booking API - Starting...");

    let config = AppConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    db::run_migrations(&pool).await?;

    let state = AppState::new(
        Repositories::postgres(pool),
        Arc::new(TracingEventSink),
        Arc::new(SystemClock),
    );

    // Hourly housekeeping for reminders and the rate limiter
    let bookings = state.bookings.clone();
    let metrics = state.metrics.clone();
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match bookings.dispatch_due_reminders().await {
                Ok(0) => {}
                Ok(sent) => tracing::info!(sent, "Booking reminders dispatched"),
                Err(e) => tracing::error!("Reminder dispatch failed: {}", e),
            }
            rate_limiter.cleanup_expired(Instant::now());
            metrics.log_summary();
        }
    });

    let app = create_router(state);

    let addr = config.bind_address();
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Cleaning Booking API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
