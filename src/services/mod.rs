//! External detection and ranging collaborators
//!
//! Image classification and pixel-based ranging run outside this crate. The
//! traits below are the seams the session API calls through; transports
//! (HTTP, IPC, in-process) implement them and own their own timeouts.

pub mod error;
pub mod mock;
pub mod wire;

use crate::session::run::ImageHandle;
use serde::{Deserialize, Serialize};

pub use error::{ServiceError, ServiceResult};
pub use mock::{FixedGeometryEstimator, ScriptedDetector, ScriptedDistanceEstimator};
pub use wire::{DetectionReply, DistanceReply};

/// Landmark classification of a single image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub landmark_id: String,
    /// Advisory only; never used as a solver weight
    pub confidence: f64,
}

/// Range to the detected landmark from an image pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceReading {
    pub distance_m: f64,
    /// Feature matches behind the estimate; reported, not consumed
    pub match_count: u32,
}

/// Classifies which landmark an image shows
pub trait LandmarkDetector {
    fn detect(&self, image: &ImageHandle) -> ServiceResult<Detection>;
}

/// Estimates the distance to a landmark visible in both images of a pair
pub trait DistanceEstimator {
    fn estimate_distance(
        &self,
        left: &ImageHandle,
        right: &ImageHandle,
        landmark_id: &str,
    ) -> ServiceResult<DistanceReading>;
}

impl<T: LandmarkDetector + ?Sized> LandmarkDetector for &T {
    fn detect(&self, image: &ImageHandle) -> ServiceResult<Detection> {
        (**self).detect(image)
    }
}

impl<T: DistanceEstimator + ?Sized> DistanceEstimator for &T {
    fn estimate_distance(
        &self,
        left: &ImageHandle,
        right: &ImageHandle,
        landmark_id: &str,
    ) -> ServiceResult<DistanceReading> {
        (**self).estimate_distance(left, right, landmark_id)
    }
}
