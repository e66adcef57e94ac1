//! Alert dispatch: persist a detected event, push qualifying severities to
//! subscribers, and record the delivery attempt.
//!
//! The dispatcher receives each event as an immutable value; the generated
//! identifier flows through return values. There is no retry queue: by the
//! time a retry would land, the telemetry it describes is stale.

use crate::core::detector::SafetyEvent;
use crate::notify::AlertChannel;
use crate::store::TelemetryStore;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// What happened to a dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Generated identifier; absent when the persist failed and the event
    /// was dropped.
    pub event_id: Option<Uuid>,
    /// Subscribers a send was attempted for.
    pub sends_attempted: usize,
    /// Sends that reported success.
    pub sends_delivered: usize,
}

impl DispatchOutcome {
    fn dropped() -> Self {
        Self {
            event_id: None,
            sends_attempted: 0,
            sends_delivered: 0,
        }
    }

    fn persisted(id: Uuid) -> Self {
        Self {
            event_id: Some(id),
            sends_attempted: 0,
            sends_delivered: 0,
        }
    }
}

/// Persists events and pushes High/Critical ones to subscribers.
pub struct AlertDispatcher<S, C> {
    store: Arc<S>,
    channel: C,
}

impl<S: TelemetryStore, C: AlertChannel> AlertDispatcher<S, C> {
    pub fn new(store: Arc<S>, channel: C) -> Self {
        Self { store, channel }
    }

    /// Persist an event and, for severities that trigger a push, deliver it
    /// to every linked subscriber.
    ///
    /// Store and channel failures are logged and absorbed. The notified flag
    /// is recorded once all send attempts complete, regardless of
    /// per-subscriber outcomes.
    pub async fn dispatch(&self, event: SafetyEvent) -> DispatchOutcome {
        let severity = event.severity();

        let id = match self.store.insert_event(&event) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    kind = %event.kind,
                    error = %e,
                    "failed to persist event, dropping"
                );
                return DispatchOutcome::dropped();
            }
        };

        tracing::info!(%id, kind = %event.kind, %severity, "safety event persisted");

        if !severity.triggers_push() {
            return DispatchOutcome::persisted(id);
        }

        let subscribers = match self.store.linked_subscribers() {
            Ok(subscribers) => subscribers,
            Err(e) => {
                tracing::error!(%id, error = %e, "failed to list subscribers");
                Vec::new()
            }
        };

        let message = render_alert(&event);
        let mut delivered = 0usize;
        for subscriber in &subscribers {
            match self.channel.send(subscriber, &message).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(%id, %subscriber, error = %e, "alert delivery failed");
                }
            }
        }

        if let Err(e) = self.store.mark_event_notified(id, Utc::now()) {
            tracing::error!(%id, error = %e, "failed to record delivery attempt");
        }

        DispatchOutcome {
            event_id: Some(id),
            sends_attempted: subscribers.len(),
            sends_delivered: delivered,
        }
    }
}

/// Render the human-readable alert pushed to subscribers.
pub fn render_alert(event: &SafetyEvent) -> String {
    let mut message = format!(
        "{} alert\nseverity: {}\n",
        event.kind.as_str().replace('_', " "),
        event.severity()
    );

    if let Some(fix) = &event.snapshot.chest.location {
        if let (Some(lat), Some(lon)) = (fix.latitude, fix.longitude) {
            message.push_str(&format!(
                "location: https://maps.google.com/?q={lat:.6},{lon:.6}\n"
            ));
        }
        if let Some(speed) = fix.speed_kmh {
            message.push_str(&format!("speed: {speed:.1} km/h\n"));
        }
    }

    message.push_str(&event.description);
    message.push_str(&format!(
        "\ntime: {}",
        event.occurred_at.format("%H:%M:%S")
    ));
    message
}
