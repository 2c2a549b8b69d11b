//! combatdesk Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use combatdesk_engine::api::{self, websocket::WsState, ConnectionManager};
use combatdesk_engine::infrastructure::{
    app_config::AppConfig, clock::SystemClock, compendium::JsonCompendium,
    persistence::DebouncedJsonSaver,
};
use combatdesk_engine::stores::TrackerStore;
use combatdesk_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be started from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "combatdesk_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting combatdesk Engine");

    let config = AppConfig::from_env();

    tracing::info!(path = %config.data_path.display(), "Loading tracker store");
    let store = TrackerStore::load(&config.data_path).await?;
    let saver = Arc::new(DebouncedJsonSaver::spawn(
        store.clone(),
        config.data_path.clone(),
        config.save_debounce,
    ));

    let compendium = JsonCompendium::load(config.compendium_path.as_deref()).await?;
    tracing::info!(monsters = compendium.len(), "Compendium loaded");

    let connections = Arc::new(ConnectionManager::new());

    let app = Arc::new(App::new(
        store,
        saver.clone(),
        connections.clone(),
        Arc::new(compendium),
        Arc::new(SystemClock::new()),
    ));

    let ws_state = Arc::new(WsState { connections });

    // Build router with separate states for HTTP and WebSocket
    let mut router = api::http::routes()
        .with_state(app)
        .route("/ws", get(api::websocket::ws_handler).with_state(ws_state))
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(config.cors_allowed_origins.as_deref()) {
        router = router.layer(cors);
    }

    let addr: SocketAddr = config.bind_addr().parse()?;
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Write the final state; a pending debounced save may not have run yet.
    if let Err(e) = saver.flush().await {
        tracing::error!(path = %saver.path().display(), error = %e, "Failed to flush store on shutdown");
    } else {
        tracing::info!(path = %saver.path().display(), "Store flushed");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown requested");
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer(allowed_origins: Option<&str>) -> Option<CorsLayer> {
    let allowed_origins = allowed_origins?;

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match HeaderValue::from_str(s) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(origin = %s, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        if origins.is_empty() {
            return None;
        }
        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
