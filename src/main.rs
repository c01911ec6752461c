//! Presentation timer binary entrypoint wiring REST, run WebSockets, and the storage backend.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use presentation_timer::{
    config::AppConfig,
    dao::presentation_store::MemoryPresentationStore,
    routes,
    services::maintenance,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = match env::var("MONGO_URI") {
        Ok(uri) => start_with_mongo(config, uri),
        Err(_) => {
            info!("MONGO_URI not set; using in-memory storage");
            AppState::with_store(config, Arc::new(MemoryPresentationStore::new()))
        }
    };

    let background = CancellationToken::new();
    tokio::spawn(maintenance::run(app_state.clone(), background.child_token()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutting down; closing runs");
            background.cancel();
            app_state.runs().shutdown();
        })
        .await
        .context("serving axum")?;

    Ok(())
}

#[cfg(feature = "mongo-store")]
fn start_with_mongo(config: AppConfig, uri: String) -> SharedState {
    use presentation_timer::{
        dao::presentation_store::{
            PresentationStore,
            mongodb::{MongoConfig, MongoPresentationStore},
        },
        services::storage_supervisor,
    };

    let db_name = env::var("MONGO_DB").ok();
    let state = AppState::new(config);

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let uri = uri.clone();
        let db_name = db_name.clone();
        async move {
            let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
            let store = MongoPresentationStore::connect(config).await?;
            Ok(Arc::new(store) as Arc<dyn PresentationStore>)
        }
    }));

    state
}

#[cfg(not(feature = "mongo-store"))]
fn start_with_mongo(config: AppConfig, _uri: String) -> SharedState {
    tracing::warn!("MONGO_URI is set but the mongo-store feature is disabled; using in-memory storage");
    AppState::with_store(config, Arc::new(MemoryPresentationStore::new()))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
