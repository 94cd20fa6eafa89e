mod catalog;
mod config;
mod db;
mod derivation;
mod errors;
mod identity;
mod models;
mod routes;
mod sequencer;
mod state;
#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::derivation::signals::PgSignalSource;
use crate::identity::PgIdentityDirectory;
use crate::routes::build_router;
use crate::sequencer::store::PgProgressStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mentoring progress API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;

    info!(
        "Signal timeout {}ms, aggregation failure policy {:?}",
        config.signal_timeout.as_millis(),
        config.aggregation_policy
    );

    let state = AppState {
        progress_store: Arc::new(PgProgressStore::new(db.clone())),
        signals: Arc::new(PgSignalSource::new(db.clone())),
        identities: Arc::new(PgIdentityDirectory::new(db)),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the dashboard host once it has a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
