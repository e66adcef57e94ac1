//! Sensor reading types shared by both node streams.
//!
//! A reading is an immutable snapshot from one body-worn node. Wire payloads
//! arrive with every field optional; the documented defaults are applied
//! exactly once here, at the ingestion boundary, so the fusion core always
//! sees concrete values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Standard gravity in m/s², the fallback for a missing vertical
/// acceleration component.
pub const STANDARD_GRAVITY: f64 = 9.8;

/// Which physical node produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorSource {
    Leg,
    Chest,
}

impl SensorSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorSource::Leg => "LEG",
            SensorSource::Chest => "CHEST",
        }
    }
}

impl std::fmt::Display for SensorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 3-axis vector: acceleration in m/s², angular velocity in device units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// GPS fix from the chest node.
///
/// Absent fields are unknown, not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Altitude above sea level in meters.
    pub altitude: Option<f64>,
    /// Ground speed in km/h.
    pub speed_kmh: Option<f64>,
    /// Heading in degrees.
    pub heading: Option<f64>,
    /// Horizontal accuracy estimate in meters.
    pub accuracy: Option<f64>,
    /// Number of satellites in the fix.
    pub satellites: Option<u32>,
}

impl GpsFix {
    /// True when the fix carries a usable position.
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    fn is_empty(&self) -> bool {
        self.latitude.is_none()
            && self.longitude.is_none()
            && self.altitude.is_none()
            && self.speed_kmh.is_none()
            && self.heading.is_none()
            && self.accuracy.is_none()
            && self.satellites.is_none()
    }
}

/// One immutable sample from a sensor node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub source: SensorSource,
    /// Used only for most-recent selection, never for interval math across
    /// nodes (node clocks are not synchronized).
    pub timestamp: DateTime<Utc>,
    /// Acceleration in m/s². Missing wire components were defaulted at
    /// ingestion (0 for x/y, standard gravity for z).
    pub acceleration: Vector3,
    /// Angular velocity; populated for leg readings only.
    pub angular_velocity: Option<Vector3>,
    /// GPS fix; populated for chest readings only.
    pub location: Option<GpsFix>,
}

impl SensorReading {
    /// Ground speed in km/h, 0 when there is no fix or no speed field.
    pub fn speed_kmh(&self) -> f64 {
        self.location
            .as_ref()
            .and_then(|fix| fix.speed_kmh)
            .unwrap_or(0.0)
    }
}

/// The leg/chest pair a classification or detection ran against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPair {
    pub leg: SensorReading,
    pub chest: SensorReading,
}

/// Wire payload from the leg node (IMU only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegPayload {
    pub accel_x: Option<f64>,
    pub accel_y: Option<f64>,
    pub accel_z: Option<f64>,
    pub gyro_x: Option<f64>,
    pub gyro_y: Option<f64>,
    pub gyro_z: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl LegPayload {
    /// Convert to a concrete reading, applying the documented defaults.
    pub fn into_reading(self, received_at: DateTime<Utc>) -> SensorReading {
        SensorReading {
            source: SensorSource::Leg,
            timestamp: self.timestamp.unwrap_or(received_at),
            acceleration: accel_from_wire(self.accel_x, self.accel_y, self.accel_z),
            angular_velocity: Some(Vector3::new(
                self.gyro_x.unwrap_or(0.0),
                self.gyro_y.unwrap_or(0.0),
                self.gyro_z.unwrap_or(0.0),
            )),
            location: None,
        }
    }
}

/// Wire payload from the chest node (GPS + IMU).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChestPayload {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub satellites: Option<u32>,
    pub accel_x: Option<f64>,
    pub accel_y: Option<f64>,
    pub accel_z: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChestPayload {
    /// Convert to a concrete reading, applying the documented defaults.
    ///
    /// The fix is dropped entirely when the payload carries no GPS field at
    /// all, so "no fix" stays distinguishable from "fix with unknown fields".
    pub fn into_reading(self, received_at: DateTime<Utc>) -> SensorReading {
        let fix = GpsFix {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
            speed_kmh: self.speed,
            heading: self.heading,
            accuracy: self.accuracy,
            satellites: self.satellites,
        };

        SensorReading {
            source: SensorSource::Chest,
            timestamp: self.timestamp.unwrap_or(received_at),
            acceleration: accel_from_wire(self.accel_x, self.accel_y, self.accel_z),
            angular_velocity: None,
            location: if fix.is_empty() { None } else { Some(fix) },
        }
    }
}

fn accel_from_wire(x: Option<f64>, y: Option<f64>, z: Option<f64>) -> Vector3 {
    Vector3::new(
        x.unwrap_or(0.0),
        y.unwrap_or(0.0),
        z.unwrap_or(STANDARD_GRAVITY),
    )
}
