//! Safety event detection over a paired leg/chest reading.
//!
//! Three independent checks against fixed, empirically chosen physical
//! limits, exposed as named constants. Every check runs on every pair;
//! the emit order is brake, accel, fall.

use crate::core::geometry::magnitude;
use crate::core::{require_finite, SignalError};
use crate::telemetry::{ReadingPair, SensorReading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longitudinal acceleration (m/s², leg x-axis) below which braking is
/// considered harsh.
pub const HARSH_BRAKE_THRESHOLD: f64 = -8.0;

/// Longitudinal acceleration (m/s², leg x-axis) above which acceleration is
/// considered harsh.
pub const HARSH_ACCEL_THRESHOLD: f64 = 6.0;

/// Difference between leg and chest total acceleration magnitudes (m/s²)
/// above which a fall or accident is assumed.
pub const FALL_DELTA_THRESHOLD: f64 = 15.0;

/// Kind of safety event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    HarshBrake,
    HarshAccel,
    FallDetected,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::HarshBrake => "HARSH_BRAKE",
            EventKind::HarshAccel => "HARSH_ACCEL",
            EventKind::FallDetected => "FALL_DETECTED",
        }
    }

    /// Severity is a pure function of the kind.
    pub fn severity(self) -> Severity {
        match self {
            EventKind::HarshBrake => Severity::Medium,
            EventKind::HarshAccel => Severity::Low,
            EventKind::FallDetected => Severity::Critical,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal urgency attached to a safety event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Whether events at this severity are pushed to subscribers. Lower
    /// severities are persisted but never pushed.
    pub fn triggers_push(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate safety event produced by the detector.
///
/// Severity is derived from the kind and never stored independently, so a
/// mismatched kind/severity pair cannot be constructed or persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SafetyEvent {
    pub kind: EventKind,
    /// Rationale including the numeric trigger value.
    pub description: String,
    /// The reading pair that triggered the event, kept for audit and
    /// notification rendering.
    pub snapshot: ReadingPair,
    pub occurred_at: DateTime<Utc>,
}

impl SafetyEvent {
    /// The occurrence time is the chest reading's timestamp, since detection
    /// is always anchored to a chest arrival.
    pub fn new(kind: EventKind, description: String, snapshot: ReadingPair) -> Self {
        let occurred_at = snapshot.chest.timestamp;
        Self {
            kind,
            description,
            snapshot,
            occurred_at,
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

/// Evaluate every safety check against a paired reading.
///
/// Returns 0 to 3 events in brake, accel, fall order. The checks are
/// independent, not mutually exclusive, and there is no early exit.
pub fn detect(
    leg: &SensorReading,
    chest: &SensorReading,
) -> Result<Vec<SafetyEvent>, SignalError> {
    require_finite(leg.acceleration, "leg.acceleration")?;
    require_finite(chest.acceleration, "chest.acceleration")?;

    let snapshot = ReadingPair {
        leg: leg.clone(),
        chest: chest.clone(),
    };
    let mut events = Vec::new();

    let longitudinal = leg.acceleration.x;
    if longitudinal < HARSH_BRAKE_THRESHOLD {
        events.push(SafetyEvent::new(
            EventKind::HarshBrake,
            format!("harsh braking detected: {longitudinal:.2} m/s²"),
            snapshot.clone(),
        ));
    }

    if longitudinal > HARSH_ACCEL_THRESHOLD {
        events.push(SafetyEvent::new(
            EventKind::HarshAccel,
            format!("harsh acceleration detected: {longitudinal:.2} m/s²"),
            snapshot.clone(),
        ));
    }

    let delta = (magnitude(leg.acceleration) - magnitude(chest.acceleration)).abs();
    if delta > FALL_DELTA_THRESHOLD {
        events.push(SafetyEvent::new(
            EventKind::FallDetected,
            format!("potential fall or accident: sensor magnitude difference {delta:.2} m/s²"),
            snapshot,
        ));
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{SensorSource, Vector3};

    fn reading(source: SensorSource, accel: Vector3) -> SensorReading {
        SensorReading {
            source,
            timestamp: Utc::now(),
            acceleration: accel,
            angular_velocity: (source == SensorSource::Leg).then(Vector3::default),
            location: None,
        }
    }

    fn quiet_pair() -> (SensorReading, SensorReading) {
        (
            reading(SensorSource::Leg, Vector3::new(0.2, 0.1, 9.8)),
            reading(SensorSource::Chest, Vector3::new(0.3, 0.0, 9.7)),
        )
    }

    #[test]
    fn test_quiet_pair_yields_no_events() {
        let (leg, chest) = quiet_pair();
        assert!(detect(&leg, &chest).unwrap().is_empty());
    }

    #[test]
    fn test_harsh_brake() {
        let leg = reading(SensorSource::Leg, Vector3::new(-8.1, 0.0, 9.8));
        let chest = reading(SensorSource::Chest, Vector3::new(0.0, 0.0, 9.8));

        let events = detect(&leg, &chest).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::HarshBrake);
        assert_eq!(events[0].severity(), Severity::Medium);
        assert!(events[0].description.contains("-8.10"));
    }

    #[test]
    fn test_brake_threshold_is_strict() {
        let leg = reading(SensorSource::Leg, Vector3::new(-8.0, 0.0, 9.8));
        let chest = reading(SensorSource::Chest, Vector3::new(0.0, 0.0, 9.8));
        assert!(detect(&leg, &chest).unwrap().is_empty());
    }

    #[test]
    fn test_harsh_acceleration() {
        let leg = reading(SensorSource::Leg, Vector3::new(6.5, 0.0, 9.8));
        let chest = reading(SensorSource::Chest, Vector3::new(0.0, 0.0, 9.8));

        let events = detect(&leg, &chest).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::HarshAccel);
        assert_eq!(events[0].severity(), Severity::Low);
        assert!(events[0].description.contains("6.50"));
    }

    #[test]
    fn test_fall_detection_cites_delta() {
        // Leg magnitude 20, chest magnitude 3: delta 17 over the threshold.
        let leg = reading(SensorSource::Leg, Vector3::new(0.0, 0.0, 20.0));
        let chest = reading(SensorSource::Chest, Vector3::new(0.0, 0.0, 3.0));

        let events = detect(&leg, &chest).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::FallDetected);
        assert_eq!(events[0].severity(), Severity::Critical);
        assert!(events[0].description.contains("17.00"));
    }

    #[test]
    fn test_checks_are_independent_and_ordered() {
        // x = -22 trips both the brake check and, with a quiet chest, the
        // fall delta check.
        let leg = reading(SensorSource::Leg, Vector3::new(-22.0, 0.0, 0.0));
        let chest = reading(SensorSource::Chest, Vector3::new(0.0, 0.0, 3.0));

        let events = detect(&leg, &chest).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::HarshBrake);
        assert_eq!(events[1].kind, EventKind::FallDetected);
    }

    #[test]
    fn test_severity_is_pure_function_of_kind() {
        assert_eq!(EventKind::HarshBrake.severity(), Severity::Medium);
        assert_eq!(EventKind::HarshAccel.severity(), Severity::Low);
        assert_eq!(EventKind::FallDetected.severity(), Severity::Critical);
    }

    #[test]
    fn test_push_gate() {
        assert!(!Severity::Low.triggers_push());
        assert!(!Severity::Medium.triggers_push());
        assert!(Severity::High.triggers_push());
        assert!(Severity::Critical.triggers_push());
    }

    #[test]
    fn test_non_finite_input_is_an_error() {
        let leg = reading(SensorSource::Leg, Vector3::new(f64::NAN, 0.0, 9.8));
        let chest = reading(SensorSource::Chest, Vector3::new(0.0, 0.0, 9.8));
        assert_eq!(
            detect(&leg, &chest),
            Err(SignalError::NonFinite {
                field: "leg.acceleration"
            })
        );
    }

    #[test]
    fn test_event_time_anchors_to_chest_arrival() {
        let leg = reading(SensorSource::Leg, Vector3::new(-9.0, 0.0, 9.8));
        let chest = reading(SensorSource::Chest, Vector3::new(0.0, 0.0, 9.8));

        let events = detect(&leg, &chest).unwrap();
        assert_eq!(events[0].occurred_at, chest.timestamp);
    }
}
