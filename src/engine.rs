//! Fusion orchestrator: the entry point for every reading arrival and for
//! the fused live view.
//!
//! Each arrival is an independent, stateless unit of work. The engine keeps
//! no session state between calls; the latest counterpart reading always
//! comes from the store. Concurrent arrivals may pair against a slightly
//! stale counterpart; that race window is accepted, not corrected.

use crate::core::classifier::{classify, ActivityKind};
use crate::core::detector::{detect, EventKind};
use crate::core::SignalError;
use crate::dispatch::AlertDispatcher;
use crate::notify::AlertChannel;
use crate::store::{EventRecord, StoreError, TelemetryStore};
use crate::telemetry::{SensorReading, SensorSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Events returned by the live view.
const LIVE_VIEW_EVENT_LIMIT: usize = 10;

/// Engine error types.
#[derive(Debug)]
pub enum EngineError {
    Store(StoreError),
    Signal(SignalError),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Store(e) => write!(f, "{e}"),
            EngineError::Signal(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e)
    }
}

impl From<SignalError> for EngineError {
    fn from(e: SignalError) -> Self {
        EngineError::Signal(e)
    }
}

/// Summary of one processed arrival.
#[derive(Debug, Clone, Serialize)]
pub struct ArrivalSummary {
    pub source: SensorSource,
    /// Whether a counterpart reading was available for pairing.
    pub paired: bool,
    /// Candidate events the detector produced for this arrival.
    pub events_detected: usize,
    /// Events that were persisted (an identifier was generated).
    pub events_persisted: usize,
}

impl ArrivalSummary {
    fn unpaired(source: SensorSource) -> Self {
        Self {
            source,
            paired: false,
            events_detected: 0,
            events_persisted: 0,
        }
    }
}

/// The current fused view for presentation. Pull-only; the engine has no
/// subscription or streaming surface of its own.
#[derive(Debug, Clone, Serialize)]
pub struct LiveView {
    pub generated_at: DateTime<Utc>,
    pub leg_sensor: Option<SensorReading>,
    pub chest_sensor: Option<SensorReading>,
    pub activity: ActivityKind,
    pub recent_events: Vec<EventRecord>,
}

/// Fusion engine over an injected store and notification channel.
pub struct FusionEngine<S, C> {
    store: Arc<S>,
    dispatcher: AlertDispatcher<S, C>,
}

impl<S: TelemetryStore, C: AlertChannel> FusionEngine<S, C> {
    pub fn new(store: Arc<S>, channel: C) -> Self {
        let dispatcher = AlertDispatcher::new(Arc::clone(&store), channel);
        Self { store, dispatcher }
    }

    /// Process one reading arrival.
    ///
    /// Leg arrivals are stored only. Detection is anchored to chest arrivals
    /// paired with the latest available leg reading, with no bound on the
    /// clock skew between the two.
    pub async fn handle_reading(
        &self,
        reading: SensorReading,
    ) -> Result<ArrivalSummary, EngineError> {
        self.store.insert_reading(&reading)?;

        let source = reading.source;
        tracing::debug!(%source, "reading stored");

        if source != SensorSource::Chest {
            return Ok(ArrivalSummary::unpaired(source));
        }

        let Some(leg) = self.store.latest_reading(SensorSource::Leg)? else {
            tracing::debug!("no leg reading stored yet, skipping detection");
            return Ok(ArrivalSummary::unpaired(source));
        };

        let events = detect(&leg, &reading)?;
        let events_detected = events.len();
        let mut events_persisted = 0usize;
        for event in events {
            let outcome = self.dispatcher.dispatch(event).await;
            if outcome.event_id.is_some() {
                events_persisted += 1;
            }
        }

        Ok(ArrivalSummary {
            source,
            paired: true,
            events_detected,
            events_persisted,
        })
    }

    /// The current fused view: latest pair, activity label, recent events.
    pub fn live_view(&self) -> Result<LiveView, EngineError> {
        let leg = self.store.latest_reading(SensorSource::Leg)?;
        let chest = self.store.latest_reading(SensorSource::Chest)?;
        let activity = classify(leg.as_ref(), chest.as_ref())?;
        let recent_events = self.store.recent_events(LIVE_VIEW_EVENT_LIMIT, None)?;

        Ok(LiveView {
            generated_at: Utc::now(),
            leg_sensor: leg,
            chest_sensor: chest,
            activity,
            recent_events,
        })
    }

    /// Recent events, newest first, optionally filtered by kind.
    pub fn recent_events(
        &self,
        limit: usize,
        kind: Option<EventKind>,
    ) -> Result<Vec<EventRecord>, EngineError> {
        Ok(self.store.recent_events(limit, kind)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detector::Severity;
    use crate::notify::ChannelError;
    use crate::store::InMemoryStore;
    use crate::telemetry::{ChestPayload, LegPayload};
    use std::sync::Mutex;

    struct RecordingChannel {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl AlertChannel for RecordingChannel {
        async fn send(&self, subscriber_id: &str, _message: &str) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(subscriber_id.to_string());
            Ok(())
        }
    }

    type TestEngine = FusionEngine<InMemoryStore, RecordingChannel>;

    fn engine() -> (Arc<InMemoryStore>, Arc<Mutex<Vec<String>>>, TestEngine) {
        let store = Arc::new(InMemoryStore::new());
        let sent = Arc::new(Mutex::new(Vec::new()));
        let channel = RecordingChannel {
            sent: Arc::clone(&sent),
        };
        let engine = FusionEngine::new(Arc::clone(&store), channel);
        (store, sent, engine)
    }

    fn leg_payload(accel_x: f64) -> LegPayload {
        LegPayload {
            accel_x: Some(accel_x),
            accel_y: Some(0.0),
            accel_z: Some(9.8),
            gyro_x: Some(0.0),
            gyro_y: Some(0.0),
            gyro_z: Some(0.0),
            ..Default::default()
        }
    }

    fn chest_payload(speed: f64) -> ChestPayload {
        ChestPayload {
            latitude: Some(12.9),
            longitude: Some(77.5),
            speed: Some(speed),
            accel_x: Some(2.0),
            accel_y: Some(1.0),
            accel_z: Some(9.8),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_leg_arrival_is_stored_without_detection() {
        let (store, _sent, engine) = engine();

        let summary = engine
            .handle_reading(leg_payload(-9.0).into_reading(Utc::now()))
            .await
            .unwrap();

        assert_eq!(summary.source, SensorSource::Leg);
        assert!(!summary.paired);
        assert_eq!(summary.events_detected, 0);
        assert!(store.latest_reading(SensorSource::Leg).unwrap().is_some());
        assert!(store.recent_events(10, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chest_arrival_without_leg_skips_detection() {
        let (store, _sent, engine) = engine();

        let summary = engine
            .handle_reading(chest_payload(25.0).into_reading(Utc::now()))
            .await
            .unwrap();

        assert!(!summary.paired);
        assert_eq!(summary.events_detected, 0);
        assert!(store.recent_events(10, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_harsh_brake_end_to_end() {
        let (store, sent, engine) = engine();
        store.link_subscriber("alpha").unwrap();

        engine
            .handle_reading(leg_payload(-9.0).into_reading(Utc::now()))
            .await
            .unwrap();
        let summary = engine
            .handle_reading(chest_payload(25.0).into_reading(Utc::now()))
            .await
            .unwrap();

        assert!(summary.paired);
        assert_eq!(summary.events_detected, 1);
        assert_eq!(summary.events_persisted, 1);

        let records = store.recent_events(10, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].severity, Severity::Medium);
        // Medium severity is persisted but never pushed.
        assert!(sent.lock().unwrap().is_empty());
        assert!(!records[0].notified);

        let view = engine.live_view().unwrap();
        assert_eq!(view.activity, ActivityKind::Motorcycle);
        assert_eq!(view.recent_events.len(), 1);
    }

    #[tokio::test]
    async fn test_fall_pushes_to_subscribers() {
        let (store, sent, engine) = engine();
        store.link_subscriber("alpha").unwrap();

        // A violent leg spike against a quiet chest: fall delta over 15.
        let leg = LegPayload {
            accel_x: Some(0.0),
            accel_y: Some(0.0),
            accel_z: Some(28.0),
            ..Default::default()
        };
        engine
            .handle_reading(leg.into_reading(Utc::now()))
            .await
            .unwrap();
        let summary = engine
            .handle_reading(chest_payload(25.0).into_reading(Utc::now()))
            .await
            .unwrap();

        assert_eq!(summary.events_detected, 1);
        let records = store.recent_events(10, None).unwrap();
        assert_eq!(records[0].severity, Severity::Critical);
        assert!(records[0].notified);
        assert_eq!(*sent.lock().unwrap(), vec!["alpha".to_string()]);
    }

    #[tokio::test]
    async fn test_pairing_uses_latest_leg() {
        let (_store, _sent, engine) = engine();

        engine
            .handle_reading(leg_payload(-9.0).into_reading(Utc::now()))
            .await
            .unwrap();
        engine
            .handle_reading(leg_payload(0.0).into_reading(Utc::now()))
            .await
            .unwrap();

        // The braking reading was superseded before any chest arrival.
        let summary = engine
            .handle_reading(chest_payload(25.0).into_reading(Utc::now()))
            .await
            .unwrap();
        assert!(summary.paired);
        assert_eq!(summary.events_detected, 0);
    }

    #[tokio::test]
    async fn test_live_view_without_readings_is_unknown() {
        let (_store, _sent, engine) = engine();
        let view = engine.live_view().unwrap();

        assert!(view.leg_sensor.is_none());
        assert!(view.chest_sensor.is_none());
        assert_eq!(view.activity, ActivityKind::Unknown);
        assert!(view.recent_events.is_empty());
    }

    #[tokio::test]
    async fn test_recent_events_filter() {
        let (_store, _sent, engine) = engine();

        engine
            .handle_reading(leg_payload(-9.0).into_reading(Utc::now()))
            .await
            .unwrap();
        engine
            .handle_reading(chest_payload(25.0).into_reading(Utc::now()))
            .await
            .unwrap();

        let brakes = engine
            .recent_events(50, Some(EventKind::HarshBrake))
            .unwrap();
        assert_eq!(brakes.len(), 1);
        let falls = engine
            .recent_events(50, Some(EventKind::FallDetected))
            .unwrap();
        assert!(falls.is_empty());
    }
}
