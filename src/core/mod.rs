//! Fusion core for the Ridewatch agent.
//!
//! This module contains:
//! - Vector geometry for posture and impact analysis
//! - Activity classification from a paired leg/chest reading
//! - Safety event detection against fixed physical thresholds

pub mod classifier;
pub mod detector;
pub mod geometry;

// Re-export commonly used types
pub use classifier::{classify, ActivityKind};
pub use detector::{detect, EventKind, SafetyEvent, Severity};
pub use geometry::{angle_between, magnitude};

use crate::telemetry::Vector3;

/// Error for non-finite numeric input reaching the decision logic.
///
/// Upstream parsing is expected to reject malformed payloads; a NaN or
/// infinity that still gets through is surfaced explicitly instead of being
/// folded into a classification label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalError {
    NonFinite { field: &'static str },
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::NonFinite { field } => {
                write!(f, "non-finite value in {field}")
            }
        }
    }
}

impl std::error::Error for SignalError {}

pub(crate) fn require_finite(v: Vector3, field: &'static str) -> Result<(), SignalError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(SignalError::NonFinite { field })
    }
}
