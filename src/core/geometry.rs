//! Vector geometry for posture and impact analysis.

use crate::telemetry::Vector3;

/// Magnitudes at or below this are treated as degenerate when computing
/// angles, to avoid dividing by a near-zero norm.
pub const NEAR_ZERO_MAGNITUDE: f64 = 0.1;

/// Euclidean norm of a vector.
///
/// Non-finite components propagate as NaN; callers guard against non-finite
/// input before it reaches the decision logic.
pub fn magnitude(v: Vector3) -> f64 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

/// Angle between two vectors in degrees.
///
/// Returns 0 when either magnitude is at or below [`NEAR_ZERO_MAGNITUDE`].
/// The cosine is clamped to [-1, 1] before inversion to absorb
/// floating-point overshoot at the boundaries.
pub fn angle_between(a: Vector3, b: Vector3) -> f64 {
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a <= NEAR_ZERO_MAGNITUDE || mag_b <= NEAR_ZERO_MAGNITUDE {
        return 0.0;
    }

    let dot = a.x * b.x + a.y * b.y + a.z * b.z;
    let cos = (dot / (mag_a * mag_b)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}
