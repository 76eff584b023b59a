use std::net::SocketAddr;
use std::sync::Arc;

use mela_api::checkout::spawn_sweeper;
use mela_api::{app, AppState};
use mela_infra::app_config::Config;
use mela_infra::{HttpRegistrationService, RazorpayGateway};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mela_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        "Starting {} booking API on port {} ({:?} mode)",
        config.event.name,
        config.server.port,
        config.event.mode
    );

    let gateway = RazorpayGateway::new(
        &config.razorpay.api_base,
        &config.razorpay.key_id,
        &config.razorpay.key_secret,
        &config.event.currency,
    );
    let registration = HttpRegistrationService::new(&config.registration.url);

    let app_state = AppState::from_config(&config, Arc::new(gateway), Arc::new(registration));
    spawn_sweeper(app_state.pending.clone());
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
