//! Scripted collaborators for testing and development

use crate::core::registry::LandmarkRegistry;
use crate::core::types::PlanarPoint;
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::{Detection, DistanceEstimator, DistanceReading, LandmarkDetector};
use crate::session::run::ImageHandle;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Detector replaying a queue of prepared replies
#[derive(Debug)]
pub struct ScriptedDetector {
    replies: Mutex<VecDeque<ServiceResult<Detection>>>,
    calls: Mutex<Vec<String>>,
    connected: AtomicBool,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Queue a successful detection
    pub fn push_detection(&self, landmark_id: &str, confidence: f64) {
        lock(&self.replies).push_back(Ok(Detection {
            landmark_id: landmark_id.to_string(),
            confidence,
        }));
    }

    /// Queue a failed call
    pub fn push_error(&self, error: ServiceError) {
        lock(&self.replies).push_back(Err(error));
    }

    /// Simulate connection loss
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Labels of every image the detector was asked about
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn queued_reply_count(&self) -> usize {
        lock(&self.replies).len()
    }
}

impl Default for ScriptedDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkDetector for ScriptedDetector {
    fn detect(&self, image: &ImageHandle) -> ServiceResult<Detection> {
        lock(&self.calls).push(image.label().to_string());
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ServiceError::Detection {
                message: "detection service unreachable".to_string(),
            });
        }

        lock(&self.replies).pop_front().unwrap_or_else(|| {
            Err(ServiceError::Detection {
                message: "no scripted detection reply left".to_string(),
            })
        })
    }
}

/// Distance estimator replaying a queue of prepared replies
#[derive(Debug, Default)]
pub struct ScriptedDistanceEstimator {
    replies: Mutex<VecDeque<ServiceResult<DistanceReading>>>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl ScriptedDistanceEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_distance(&self, distance_m: f64, match_count: u32) {
        lock(&self.replies).push_back(Ok(DistanceReading { distance_m, match_count }));
    }

    pub fn push_error(&self, error: ServiceError) {
        lock(&self.replies).push_back(Err(error));
    }

    /// `(left label, right label, landmark)` of every call
    pub fn calls(&self) -> Vec<(String, String, String)> {
        lock(&self.calls).clone()
    }
}

impl DistanceEstimator for ScriptedDistanceEstimator {
    fn estimate_distance(
        &self,
        left: &ImageHandle,
        right: &ImageHandle,
        landmark_id: &str,
    ) -> ServiceResult<DistanceReading> {
        lock(&self.calls).push((
            left.label().to_string(),
            right.label().to_string(),
            landmark_id.to_string(),
        ));
        lock(&self.replies).pop_front().unwrap_or_else(|| {
            Err(ServiceError::Distance {
                message: "no scripted distance reply left".to_string(),
            })
        })
    }
}

/// Answers distance calls with exact ranges from a known true position
#[derive(Debug, Clone)]
pub struct FixedGeometryEstimator {
    registry: Arc<LandmarkRegistry>,
    truth: PlanarPoint,
    match_count: u32,
}

impl FixedGeometryEstimator {
    pub fn new(registry: Arc<LandmarkRegistry>, truth: PlanarPoint) -> Self {
        Self {
            registry,
            truth,
            match_count: 100,
        }
    }

    pub fn truth(&self) -> PlanarPoint {
        self.truth
    }
}

impl DistanceEstimator for FixedGeometryEstimator {
    fn estimate_distance(
        &self,
        _left: &ImageHandle,
        _right: &ImageHandle,
        landmark_id: &str,
    ) -> ServiceResult<DistanceReading> {
        let landmark = self.registry.lookup(landmark_id).ok_or_else(|| ServiceError::Distance {
            message: format!("landmark {} not visible in simulation", landmark_id),
        })?;
        Ok(DistanceReading {
            distance_m: self.truth.distance_to(&landmark),
            match_count: self.match_count,
        })
    }
}
