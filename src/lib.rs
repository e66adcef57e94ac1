//! Ridewatch Fusion Agent - two-node rider telemetry fusion and alerting.
//!
//! This library fuses motion/location telemetry from two independently
//! sampled body-worn sensor nodes (a leg node and a chest node): it pairs
//! the two most recent readings, classifies the rider's current activity,
//! detects hazardous events (harsh braking, harsh acceleration, falls), and
//! raises alerts to linked subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Ridewatch Fusion Agent                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  leg node ──▶ POST /ingest/leg ──▶ ┌───────────┐            │
//! │                                    │   store   │ latest     │
//! │  chest node ▶ POST /ingest/chest ▶ └───────────┘ pair       │
//! │                     │                    │                  │
//! │                     ▼                    ▼                  │
//! │              ┌────────────┐       ┌────────────┐            │
//! │              │  detector  │       │ classifier │ GET /live  │
//! │              └────────────┘       └────────────┘            │
//! │                     │                                       │
//! │                     ▼                                       │
//! │              ┌────────────┐  push   ┌─────────────┐         │
//! │              │ dispatcher │ ──────▶ │ subscribers │         │
//! │              └────────────┘         └─────────────┘         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ridewatch_agent::{FusionEngine, InMemoryStore, PushChannel, PushConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let channel = PushChannel::new(PushConfig::new("http://127.0.0.1:8099", "token"))?;
//! let engine = FusionEngine::new(store, channel);
//!
//! // Readings arrive from the ingestion layer; each chest arrival is
//! // paired with the latest leg reading for detection.
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod engine;
pub mod notify;
pub mod server;
pub mod store;
pub mod telemetry;

// Re-export key types at crate root for convenience
pub use crate::core::{
    classify, detect, ActivityKind, EventKind, SafetyEvent, Severity, SignalError,
};
pub use config::Config;
pub use dispatch::{render_alert, AlertDispatcher, DispatchOutcome};
pub use engine::{ArrivalSummary, EngineError, FusionEngine, LiveView};
pub use notify::{AlertChannel, ChannelError, PushChannel, PushConfig};
pub use store::{EventRecord, InMemoryStore, StoreError, Subscriber, TelemetryStore};
pub use telemetry::{
    ChestPayload, GpsFix, LegPayload, ReadingPair, SensorReading, SensorSource, Vector3,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
