//! HTTP server receiving telemetry from the two sensor nodes.
//!
//! This module provides an HTTP server that:
//! - Accepts readings from the leg node via POST /ingest/leg
//! - Accepts readings from the chest node via POST /ingest/chest, pairing
//!   each with the latest leg reading for detection
//! - Serves the fused live view and recent events to the dashboard
//!
//! # Architecture
//!
//! ```text
//! leg node ───→ POST /ingest/leg ───→ fusion engine ──→ store
//! chest node ─→ POST /ingest/chest ─→ fusion engine ──→ detector ──→ dispatcher ──→ push gateway
//! dashboard ──→ GET /live, GET /events/recent
//! ```

use crate::config::Config;
use crate::core::detector::EventKind;
use crate::engine::{EngineError, FusionEngine, LiveView};
use crate::notify::{PushChannel, PushConfig};
use crate::store::{EventRecord, InMemoryStore};
use crate::telemetry::{ChestPayload, LegPayload};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Default limit for GET /events/recent.
const DEFAULT_RECENT_LIMIT: usize = 50;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Push channel configuration for alert delivery
    pub push: PushConfig,
    /// Subscriber ids linked with notifications enabled at startup
    pub subscribers: Vec<String>,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16, push: PushConfig) -> Self {
        Self {
            port,
            push,
            subscribers: Vec::new(),
        }
    }

    /// Build a server configuration from the agent configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut push = PushConfig::new(config.push_base_url.clone(), config.push_token.clone());
        push.timeout_secs = config.push_timeout_secs;

        Self {
            port: config.listen_port,
            push,
            subscribers: config.subscribers.clone(),
        }
    }
}

/// Shared server state
pub struct ServerState {
    engine: FusionEngine<InMemoryStore, PushChannel>,
}

/// Response from the ingest endpoints
#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub status: String,
    pub message: String,
    /// Whether a counterpart reading was available for pairing
    pub paired: bool,
    /// Candidate events detected for this arrival
    pub events_detected: usize,
}

/// Response from GET /events/recent
#[derive(Debug, Clone, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventRecord>,
    pub count: usize,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Query parameters for GET /events/recent
#[derive(Debug, Deserialize)]
pub struct RecentEventsQuery {
    pub limit: Option<usize>,
    #[serde(rename = "type")]
    pub kind: Option<EventKind>,
}

fn engine_error(e: EngineError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        EngineError::Signal(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
                code: "NON_FINITE_INPUT".to_string(),
            }),
        ),
        EngineError::Store(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
                code: "STORE_ERROR".to_string(),
            }),
        ),
    }
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /ingest/leg
async fn ingest_leg(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<LegPayload>,
) -> Result<(StatusCode, Json<IngestResponse>), (StatusCode, Json<ErrorResponse>)> {
    let reading = payload.into_reading(Utc::now());
    let summary = state
        .engine
        .handle_reading(reading)
        .await
        .map_err(engine_error)?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "success".to_string(),
            message: "leg sensor data recorded".to_string(),
            paired: summary.paired,
            events_detected: summary.events_detected,
        }),
    ))
}

/// POST /ingest/chest
///
/// The write path: each chest arrival is paired with the latest leg reading
/// and run through the event detector.
async fn ingest_chest(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ChestPayload>,
) -> Result<(StatusCode, Json<IngestResponse>), (StatusCode, Json<ErrorResponse>)> {
    let reading = payload.into_reading(Utc::now());
    let summary = state
        .engine
        .handle_reading(reading)
        .await
        .map_err(engine_error)?;

    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            status: "success".to_string(),
            message: "chest sensor data recorded".to_string(),
            paired: summary.paired,
            events_detected: summary.events_detected,
        }),
    ))
}

/// GET /live
///
/// The read path: latest pair, activity label, recent events.
async fn live(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<LiveView>, (StatusCode, Json<ErrorResponse>)> {
    let view = state.engine.live_view().map_err(engine_error)?;
    Ok(Json(view))
}

/// GET /events/recent
async fn recent_events(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<RecentEventsQuery>,
) -> Result<Json<EventsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    let events = state
        .engine
        .recent_events(limit, query.kind)
        .map_err(engine_error)?;

    let count = events.len();
    Ok(Json(EventsResponse { events, count }))
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let store = Arc::new(InMemoryStore::new());
    for subscriber in &config.subscribers {
        store
            .link_subscriber(subscriber.clone())
            .map_err(|e| anyhow::anyhow!("failed to link subscriber {subscriber}: {e}"))?;
    }

    let channel = PushChannel::new(config.push.clone())?;
    tracing::info!(sender_id = channel.sender_id(), "push channel ready");

    let engine = FusionEngine::new(store, channel);
    let state = Arc::new(ServerState { engine });

    let app = Router::new()
        .route("/health", get(health))
        .route("/ingest/leg", post(ingest_leg))
        .route("/ingest/chest", post(ingest_chest))
        .route("/live", get(live))
        .route("/events/recent", get(recent_events))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("fusion agent listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
