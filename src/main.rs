use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use candor::api::{self, AppState};
use candor::config::Config;
use candor::services::{DatasetStore, SignalStore, SignalTracker};
use candor::sources::{BinanceClient, BinanceWs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "candor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Candor server on {}:{}", config.host, config.port);

    // Open stores
    let store = Arc::new(SignalStore::new(&config.database_path)?);
    let datasets = Arc::new(DatasetStore::new(&config.dataset_root)?);

    // Start the signal tracker
    let tracker = SignalTracker::new(
        store.clone(),
        Duration::from_secs(config.tracker_interval_secs),
    );
    tokio::spawn(tracker.clone().run());

    // Stream live prices into the tracker
    if config.enable_price_stream {
        let price_stream = BinanceWs::new(store.clone(), tracker.clone());
        tokio::spawn(async move {
            price_stream.connect().await;
        });
    }

    let binance = Arc::new(BinanceClient::new());

    // Create application state
    let state = AppState {
        config: config.clone(),
        store,
        tracker,
        datasets,
        binance,
        started_at: Instant::now(),
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Candor server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
