//! Minimal server wiring the gate in front of an axum router.
//!
//! Run with:
//!   AUTH_HS256_SECRET=dev-secret cargo run --example server
//!
//! Then:
//!   curl -H "Authorization: Bearer <token>" http://localhost:3000/whoami

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result};
use axum::{Json, Router, routing::get};
use serde_json::json;
use token_gate::{Algorithm, AuthGateLayer, DecodingKey, Identity, StaticKey};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

struct Config {
    addr: SocketAddr,
    hs256_secret: String,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let addr = SocketAddr::from_str(&format!("0.0.0.0:{port}"))?;

        let hs256_secret = std::env::var("AUTH_HS256_SECRET")
            .context("missing configuration: AUTH_HS256_SECRET")?;

        Ok(Self { addr, hs256_secret })
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn whoami(Identity(token): Identity) -> Json<serde_json::Value> {
    Json(json!({ "claims": token.claims }))
}

fn build_router(config: &Config) -> Router {
    let gate = AuthGateLayer::new(StaticKey(DecodingKey::from_secret(
        config.hs256_secret.as_bytes(),
    )))
    .signing_method(Algorithm::HS256);

    let protected = Router::new().route("/whoami", get(whoami)).layer(gate);

    // Permissive CORS for a local demo only.
    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let app = build_router(&config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
