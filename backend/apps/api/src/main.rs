//! API Server Entry Point
//!
//! Demo server wiring the platform utilities together: environment
//! configuration, tracing, and the CORS layer in front of a health route.
//! Uses `anyhow` for startup errors only.

use std::env;
use std::net::SocketAddr;

use axum::{Json, Router, routing::get};
use platform::config::PlatformConfig;
use platform::cors;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "0.0.0.0:31113";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Rejects an out-of-range PASSWORD_BCRYPT_COST before serving
    let config = PlatformConfig::from_env()?;
    tracing::info!(bcrypt_cost = config.password.cost(), "Password hashing configured");

    let cors = cors::build_layer(config.cors);

    let app = Router::new()
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = env::var("API_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
