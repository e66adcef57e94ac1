//! Store collaborator: latest-reading lookup, event persistence, and
//! subscriber bookkeeping.
//!
//! The fusion core owns no shared state; every "latest reading" lookup is
//! delegated to this trait, which is the sole source of shared mutable
//! state. The in-memory implementation backs the agent binary and the test
//! suite; a deployment with a real database implements the same trait.

use crate::core::detector::{EventKind, SafetyEvent, Severity};
use crate::telemetry::{ReadingPair, SensorReading, SensorSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Most events retained by the in-memory store; the oldest are evicted
/// first.
const EVENT_RETENTION: usize = 256;

/// Store errors. All of them are recoverable from the engine's point of
/// view: a failed write means that single record is lost, never a crash.
#[derive(Debug, Clone)]
pub enum StoreError {
    Backend(String),
    UnknownEvent(Uuid),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
            StoreError::UnknownEvent(id) => write!(f, "no stored event with id {id}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A persisted safety event with its generated identifier and delivery
/// bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub kind: EventKind,
    pub severity: Severity,
    pub description: String,
    pub snapshot: ReadingPair,
    pub occurred_at: DateTime<Utc>,
    /// Set exactly once, after delivery was attempted for every subscriber.
    pub notified: bool,
    pub notified_at: Option<DateTime<Utc>>,
}

impl EventRecord {
    fn from_event(id: Uuid, event: &SafetyEvent) -> Self {
        Self {
            id,
            kind: event.kind,
            severity: event.severity(),
            description: event.description.clone(),
            snapshot: event.snapshot.clone(),
            occurred_at: event.occurred_at,
            notified: false,
            notified_at: None,
        }
    }
}

/// A notification subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct Subscriber {
    pub id: String,
    pub linked: bool,
    pub notifications_enabled: bool,
}

/// Operations the fusion engine needs from the record store.
pub trait TelemetryStore: Send + Sync {
    /// Persist a reading and make it the latest for its source.
    fn insert_reading(&self, reading: &SensorReading) -> Result<(), StoreError>;

    /// The most recently stored reading for a source, if any.
    fn latest_reading(&self, source: SensorSource) -> Result<Option<SensorReading>, StoreError>;

    /// Persist a safety event, returning its generated identifier.
    fn insert_event(&self, event: &SafetyEvent) -> Result<Uuid, StoreError>;

    /// Record that delivery was attempted for an event.
    fn mark_event_notified(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Ids of subscribers that are linked and have notifications enabled.
    fn linked_subscribers(&self) -> Result<Vec<String>, StoreError>;

    /// Recent events, newest first, optionally filtered by kind.
    fn recent_events(
        &self,
        limit: usize,
        kind: Option<EventKind>,
    ) -> Result<Vec<EventRecord>, StoreError>;
}

/// In-memory store keyed on source for readings, append-only for events.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    latest: HashMap<SensorSource, SensorReading>,
    events: Vec<EventRecord>,
    subscribers: Vec<Subscriber>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber as linked with notifications enabled. Re-linking
    /// an existing subscriber re-enables its notifications.
    pub fn link_subscriber(&self, id: impl Into<String>) -> Result<(), StoreError> {
        let id = id.into();
        let mut inner = self.write()?;
        if let Some(pos) = inner.subscribers.iter().position(|s| s.id == id) {
            inner.subscribers[pos].linked = true;
            inner.subscribers[pos].notifications_enabled = true;
        } else {
            inner.subscribers.push(Subscriber {
                id,
                linked: true,
                notifications_enabled: true,
            });
        }
        Ok(())
    }

    /// Toggle notifications for a subscriber without unlinking it.
    pub fn set_notifications_enabled(&self, id: &str, enabled: bool) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(subscriber) = inner.subscribers.iter_mut().find(|s| s.id == id) {
            subscriber.notifications_enabled = enabled;
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreInner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreInner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }
}

impl TelemetryStore for InMemoryStore {
    fn insert_reading(&self, reading: &SensorReading) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        inner.latest.insert(reading.source, reading.clone());
        Ok(())
    }

    fn latest_reading(&self, source: SensorSource) -> Result<Option<SensorReading>, StoreError> {
        Ok(self.read()?.latest.get(&source).cloned())
    }

    fn insert_event(&self, event: &SafetyEvent) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let mut inner = self.write()?;
        inner.events.push(EventRecord::from_event(id, event));
        if inner.events.len() > EVENT_RETENTION {
            let excess = inner.events.len() - EVENT_RETENTION;
            inner.events.drain(..excess);
        }
        Ok(id)
    }

    fn mark_event_notified(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let record = inner
            .events
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(StoreError::UnknownEvent(id))?;
        record.notified = true;
        record.notified_at = Some(at);
        Ok(())
    }

    fn linked_subscribers(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read()?
            .subscribers
            .iter()
            .filter(|s| s.linked && s.notifications_enabled)
            .map(|s| s.id.clone())
            .collect())
    }

    fn recent_events(
        &self,
        limit: usize,
        kind: Option<EventKind>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self
            .read()?
            .events
            .iter()
            .rev()
            .filter(|record| kind.map_or(true, |k| record.kind == k))
            .take(limit)
            .cloned()
            .collect())
    }
}
