mod applications;
mod config;
mod errors;
mod models;
mod notify;
mod profile;
mod remote;
mod routes;
mod session;
mod settings;
mod shell;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::notify::Toasts;
use crate::remote::supabase::SupabaseClient;
use crate::routes::build_router;
use crate::session::navigation::{Navigator, Screen, ScreenRouter};
use crate::session::store::SessionStore;
use crate::session::SessionState;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
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

    info!("Starting JobHunt API v{}", env!("CARGO_PKG_VERSION"));

    // Hosted auth, tables and storage behind one client
    let remote = SupabaseClient::new(
        &config.supabase_url,
        config.supabase_anon_key.clone(),
        config.session_file.clone(),
    )
    .context("Failed to build the data service client")?;
    let remote = Arc::new(remote);
    info!("Data service client initialized ({})", config.supabase_url);

    // Session store, subscribed before the startup check so no event is missed
    let screens = Arc::new(ScreenRouter::new(Screen::Auth));
    let session = SessionStore::new(remote.clone(), remote.clone(), screens.clone());
    let listener = session.spawn_listener();
    session.initialize().await;
    if matches!(session.snapshot(), SessionState::Authenticated { .. }) {
        screens.navigate(Screen::Main);
    }
    let refresher = remote.spawn_auto_refresh();

    // Build app state
    let state = AppState {
        session,
        screens,
        auth: remote.clone(),
        data: remote.clone(),
        storage: remote,
        toasts: Toasts::default(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the browser app has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let tcp = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(tcp, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.abort();
    listener.unsubscribe();
    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
