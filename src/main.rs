use std::sync::{Arc, Mutex};

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use detailbook::config::AppConfig;
use detailbook::db::{self, queries};
use detailbook::handlers;
use detailbook::services::messaging::twilio::TwilioSmsProvider;
use detailbook::services::payment::stripe::StripeGateway;
use detailbook::services::reservation;
use detailbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let seeded = queries::seed_default_products(&conn)?;
    if seeded > 0 {
        tracing::info!(seeded, "seeded default catalog");
    }

    if config.stripe_secret_key.is_empty() {
        tracing::warn!("STRIPE_SECRET_KEY is not set, checkouts will fail");
    }
    let payments = StripeGateway::new(
        config.stripe_secret_key.clone(),
        config.stripe_api_base.clone(),
        config.pending_ttl,
        config.gateway_timeout,
    )?;

    let messaging = TwilioSmsProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_phone_number.clone(),
        config.gateway_timeout,
    )?;
    if !messaging.is_configured() {
        tracing::warn!("Twilio is not configured, confirmation messages will not be delivered");
    }

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments: Box::new(payments),
        messaging: Box::new(messaging),
    });

    if let Some(every) = config.sweep_interval {
        tracing::info!(every_secs = every.as_secs(), "starting pending booking sweeper");
        reservation::spawn_sweeper(Arc::clone(&state), every);
    }

    let app = handlers::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
