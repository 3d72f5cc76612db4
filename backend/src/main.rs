//! Trip board server entry-point: seeds the live store and serves trip feeds
//! over WebSocket.

mod server;

use actix_web::cookie::SameSite;
use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use tripboard::inbound::http::health::HealthState;
use tripboard::outbound::memory::{InMemoryTripStore, load_dataset};

use server::{ServerConfig, ServerSettings, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter(std::env::args_os())
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let key = settings.session_key().map_err(std::io::Error::other)?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    let origins = settings.allowed_origins().map_err(std::io::Error::other)?;

    let store = match &settings.dataset_path {
        Some(path) => {
            let dataset = load_dataset(path).map_err(std::io::Error::other)?;
            info!(
                path = %path.display(),
                trips = dataset.trips.len(),
                days = dataset.days.len(),
                "seeded trip store"
            );
            InMemoryTripStore::from_dataset(dataset)
        }
        None => InMemoryTripStore::default(),
    };

    let config = ServerConfig::new(
        key,
        settings.cookie_secure,
        SameSite::Lax,
        bind_addr,
        origins,
    )
    .with_store(store);

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "trip board listening");
    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome
}
