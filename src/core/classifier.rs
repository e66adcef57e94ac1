//! Activity classification from a paired leg/chest reading.
//!
//! Speed is the dominant signal (pedestrian vs vehicle); the posture angle
//! between the two acceleration vectors disambiguates the two vehicle
//! classes once speed indicates a vehicle.

use crate::core::geometry::{angle_between, magnitude};
use crate::core::{require_finite, SignalError};
use crate::telemetry::SensorReading;
use serde::{Deserialize, Serialize};

/// Below this speed (km/h) the rider is considered stationary.
pub const STATIONARY_SPEED_MAX_KMH: f64 = 1.0;

/// Upper bound (km/h) of the walking speed range.
pub const WALKING_SPEED_MAX_KMH: f64 = 15.0;

/// Posture angle (degrees) separating upright scooter posture from
/// forward-lean motorcycle posture. The boundary itself classifies as
/// motorcycle.
pub const LEAN_ANGLE_DEG: f64 = 20.0;

/// Leg gyro magnitude suggesting a stepping pattern. Diagnostic only; the
/// walking speed range maps to walking with or without it.
pub const STEPPING_GYRO_MAGNITUDE: f64 = 0.2;

/// Rider activity inferred from one leg/chest reading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Stationary,
    Walking,
    Scooter,
    Motorcycle,
    Unknown,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Stationary => "STATIONARY",
            ActivityKind::Walking => "WALKING",
            ActivityKind::Scooter => "SCOOTER",
            ActivityKind::Motorcycle => "MOTORCYCLE",
            ActivityKind::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the rider's current activity.
///
/// `Unknown` is returned only when either reading is absent. Non-finite
/// numeric input is surfaced as an error, never coerced to a label, so
/// callers can tell "ambiguous by design" from "malformed input". A missing
/// chest speed is treated as 0.
pub fn classify(
    leg: Option<&SensorReading>,
    chest: Option<&SensorReading>,
) -> Result<ActivityKind, SignalError> {
    let (leg, chest) = match (leg, chest) {
        (Some(leg), Some(chest)) => (leg, chest),
        _ => return Ok(ActivityKind::Unknown),
    };

    require_finite(leg.acceleration, "leg.acceleration")?;
    require_finite(chest.acceleration, "chest.acceleration")?;
    let gyro = leg.angular_velocity.unwrap_or_default();
    require_finite(gyro, "leg.angular_velocity")?;
    let speed = chest.speed_kmh();
    if !speed.is_finite() {
        return Err(SignalError::NonFinite {
            field: "chest.location.speed_kmh",
        });
    }

    let gyro_magnitude = magnitude(gyro);
    let posture_angle = angle_between(leg.acceleration, chest.acceleration);

    tracing::debug!(
        speed_kmh = speed,
        gyro_magnitude,
        posture_angle_deg = posture_angle,
        stepping = gyro_magnitude > STEPPING_GYRO_MAGNITUDE,
        "activity signals"
    );

    let kind = if speed < STATIONARY_SPEED_MAX_KMH {
        ActivityKind::Stationary
    } else if speed <= WALKING_SPEED_MAX_KMH {
        // Stepping or not, this speed range is walking; the gyro signal
        // stays a diagnostic.
        ActivityKind::Walking
    } else {
        vehicle_kind(posture_angle)
    };

    Ok(kind)
}

/// Split the vehicle classes on posture angle, inclusive on the
/// motorcycle side.
fn vehicle_kind(posture_angle_deg: f64) -> ActivityKind {
    if posture_angle_deg < LEAN_ANGLE_DEG {
        ActivityKind::Scooter
    } else {
        ActivityKind::Motorcycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{GpsFix, SensorReading, SensorSource, Vector3};
    use chrono::Utc;

    fn leg_reading(accel: Vector3, gyro: Vector3) -> SensorReading {
        SensorReading {
            source: SensorSource::Leg,
            timestamp: Utc::now(),
            acceleration: accel,
            angular_velocity: Some(gyro),
            location: None,
        }
    }

    fn chest_reading(accel: Vector3, speed_kmh: Option<f64>) -> SensorReading {
        SensorReading {
            source: SensorSource::Chest,
            timestamp: Utc::now(),
            acceleration: accel,
            angular_velocity: None,
            location: speed_kmh.map(|speed| GpsFix {
                speed_kmh: Some(speed),
                ..Default::default()
            }),
        }
    }

    fn upright() -> Vector3 {
        Vector3::new(0.0, 0.0, 9.8)
    }

    /// Roughly 54 degrees away from upright.
    fn leaned() -> Vector3 {
        Vector3::new(8.0, 0.0, 5.8)
    }

    #[test]
    fn test_stationary_regardless_of_posture_and_gyro() {
        let leg = leg_reading(leaned(), Vector3::new(1.0, 1.0, 1.0));
        let chest = chest_reading(upright(), Some(0.4));
        assert_eq!(
            classify(Some(&leg), Some(&chest)),
            Ok(ActivityKind::Stationary)
        );
    }

    #[test]
    fn test_missing_speed_is_stationary() {
        let leg = leg_reading(upright(), Vector3::default());
        let chest = chest_reading(upright(), None);
        assert_eq!(
            classify(Some(&leg), Some(&chest)),
            Ok(ActivityKind::Stationary)
        );
    }

    #[test]
    fn test_walking_with_and_without_stepping_gyro() {
        let chest = chest_reading(upright(), Some(5.0));

        let stepping = leg_reading(upright(), Vector3::new(0.3, 0.2, 0.1));
        assert_eq!(
            classify(Some(&stepping), Some(&chest)),
            Ok(ActivityKind::Walking)
        );

        let still = leg_reading(upright(), Vector3::new(0.01, 0.0, 0.0));
        assert_eq!(
            classify(Some(&still), Some(&chest)),
            Ok(ActivityKind::Walking)
        );
    }

    #[test]
    fn test_walking_range_boundaries() {
        let leg = leg_reading(upright(), Vector3::default());
        assert_eq!(
            classify(Some(&leg), Some(&chest_reading(upright(), Some(1.0)))),
            Ok(ActivityKind::Walking)
        );
        assert_eq!(
            classify(Some(&leg), Some(&chest_reading(upright(), Some(15.0)))),
            Ok(ActivityKind::Walking)
        );
    }

    #[test]
    fn test_fast_upright_is_scooter() {
        let leg = leg_reading(upright(), Vector3::default());
        let chest = chest_reading(Vector3::new(0.5, 0.3, 9.7), Some(30.0));
        assert_eq!(
            classify(Some(&leg), Some(&chest)),
            Ok(ActivityKind::Scooter)
        );
    }

    #[test]
    fn test_fast_leaned_is_motorcycle() {
        let leg = leg_reading(leaned(), Vector3::default());
        let chest = chest_reading(upright(), Some(45.0));
        assert_eq!(
            classify(Some(&leg), Some(&chest)),
            Ok(ActivityKind::Motorcycle)
        );
    }

    #[test]
    fn test_lean_boundary_is_motorcycle() {
        assert_eq!(vehicle_kind(LEAN_ANGLE_DEG), ActivityKind::Motorcycle);
        assert_eq!(vehicle_kind(19.999), ActivityKind::Scooter);
        assert_eq!(vehicle_kind(20.001), ActivityKind::Motorcycle);
    }

    #[test]
    fn test_absent_reading_is_unknown() {
        let leg = leg_reading(upright(), Vector3::default());
        let chest = chest_reading(upright(), Some(10.0));

        assert_eq!(classify(None, Some(&chest)), Ok(ActivityKind::Unknown));
        assert_eq!(classify(Some(&leg), None), Ok(ActivityKind::Unknown));
        assert_eq!(classify(None, None), Ok(ActivityKind::Unknown));
    }

    #[test]
    fn test_non_finite_input_is_an_error() {
        let leg = leg_reading(Vector3::new(f64::NAN, 0.0, 9.8), Vector3::default());
        let chest = chest_reading(upright(), Some(10.0));
        assert_eq!(
            classify(Some(&leg), Some(&chest)),
            Err(SignalError::NonFinite {
                field: "leg.acceleration"
            })
        );

        let leg = leg_reading(upright(), Vector3::default());
        let chest = chest_reading(upright(), Some(f64::INFINITY));
        assert_eq!(
            classify(Some(&leg), Some(&chest)),
            Err(SignalError::NonFinite {
                field: "chest.location.speed_kmh"
            })
        );
    }

    #[test]
    fn test_wire_labels() {
        assert_eq!(
            serde_json::to_string(&ActivityKind::Motorcycle).unwrap(),
            "\"MOTORCYCLE\""
        );
        assert_eq!(ActivityKind::Stationary.as_str(), "STATIONARY");
    }
}
