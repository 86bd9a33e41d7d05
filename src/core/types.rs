//! Core data types for the campus positioning system

use crate::validation::error::UsageError;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Planar position in meters, east (x) and north (y) of the reference point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl PlanarPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    /// Euclidean distance to another planar point (meters)
    pub fn distance_to(&self, other: &PlanarPoint) -> f64 {
        (self.to_vector() - other.to_vector()).norm()
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

impl From<Vector2<f64>> for PlanarPoint {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v.x, y: v.y }
    }
}

/// Fixed reference landmark with a known planar position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: String,
    pub position: PlanarPoint,
}

/// Committed (landmark, distance, confidence) triple used as solver input.
///
/// Construction goes through [`Measurement::new`], which rejects negative or
/// non-finite distances and confidences outside `[0, 1]`. The serde form
/// is `{landmark_id, distance_m, confidence}`; the older reading shape
/// `{block, distance, confidence?}` is accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMeasurement")]
pub struct Measurement {
    landmark_id: String,
    distance_m: f64,
    confidence: f64,
}

impl Measurement {
    pub fn new(landmark_id: impl Into<String>, distance_m: f64, confidence: f64) -> Result<Self, UsageError> {
        let landmark_id = landmark_id.into();
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(UsageError::InvalidMeasurement {
                reason: format!("distance to {} must be finite and non-negative, got {}", landmark_id, distance_m),
            });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(UsageError::InvalidMeasurement {
                reason: format!("confidence for {} must lie in [0, 1], got {}", landmark_id, confidence),
            });
        }

        Ok(Self { landmark_id, distance_m, confidence })
    }

    pub fn landmark_id(&self) -> &str {
        &self.landmark_id
    }

    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }
}

#[derive(Deserialize)]
struct RawMeasurement {
    #[serde(alias = "block")]
    landmark_id: String,
    #[serde(alias = "distance")]
    distance_m: f64,
    #[serde(default = "full_confidence")]
    confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl TryFrom<RawMeasurement> for Measurement {
    type Error = UsageError;

    fn try_from(raw: RawMeasurement) -> Result<Self, Self::Error> {
        Measurement::new(raw.landmark_id, raw.distance_m, raw.confidence)
    }
}

/// Result of one multilateration solve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionEstimate {
    pub position: PlanarPoint,
    /// Mean absolute range residual (meters)
    pub error_m: f64,
    pub used_landmarks: usize,
}
