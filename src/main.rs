//! Game telemetry aggregation service.
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for the HTTP API with rate limiting
//! - Tokio interval tasks for the batch jobs (ETL rollups, heatmaps)
//! - Tracing for structured logs

mod binner;
mod entity;
mod error;
mod handlers;
mod jobs;
mod metrics;
mod prelude;
mod state;
mod sv;

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::{
  Router,
  routing::{get, post},
};
use tower::ServiceBuilder;
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};
use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "analytics=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:analytics.db?mode=rwc".into());

  info!("Starting Game Analytics v{}", env!("CARGO_PKG_VERSION"));

  let app_state = Arc::new(AppState::with_config(&db_url, Config::from_env()).await);

  // Batch jobs: ETL rollups + heatmap recomputation on their own timers
  jobs::spawn(app_state.clone());

  // Rate limiting (100 requests per minute per IP)
  let governor_conf = Arc::new(
    GovernorConfigBuilder::default()
      .per_second(2)
      .burst_size(100)
      .finish()
      .context("Failed to build rate limiter config")?,
  );
  let limiter = governor_conf.limiter().clone();

  tokio::spawn(async move {
    loop {
      tokio::time::sleep(Duration::from_secs(60)).await;
      limiter.retain_recent();
    }
  });

  let app = Router::new()
    .route("/health", get(handlers::health))
    .route("/metrics", get(handlers::metrics))
    .route("/api/v1/users", post(handlers::create_user))
    .route("/api/v1/sessions/start", post(handlers::start_session))
    .route("/api/v1/sessions/end", post(handlers::end_session))
    .route("/api/v1/events", post(handlers::create_events))
    .route("/api/v1/scores/submit", post(handlers::submit_score))
    .route("/api/v1/leaderboard", get(handlers::get_leaderboard))
    .route("/api/v1/heatmap", get(handlers::get_heatmap))
    .route("/admin/run-jobs", post(handlers::run_jobs))
    .layer(
      ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(
          CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        ),
    )
    .with_state(app_state)
    .into_make_service_with_connect_info::<SocketAddr>();

  let port: u16 =
    env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  let listener =
    tokio::net::TcpListener::bind(addr).await.context("Failed to bind")?;
  info!("HTTP server listening on {addr}");

  axum::serve(listener, app).await.context("Axum server error")?;
  Ok(())
}
