//! End-to-end session flow with in-process collaborators

use approx::assert_abs_diff_eq;
use campus_locator::algorithms::coordinates::to_geo;
use campus_locator::api::{BlockingLocatorApi, LocateResponse};
use campus_locator::core::{PlanarPoint, CAMPUS_REFERENCE};
use campus_locator::services::{
    Detection, FixedGeometryEstimator, LandmarkDetector, ScriptedDetector, ServiceError, ServiceResult,
};
use campus_locator::session::{ImageHandle, RunStep};
use campus_locator::utils::ConfigurationManager;
use campus_locator::validation::{ErrorKind, LocatorError, UsageError};
use campus_locator::LandmarkRegistry;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

fn pair(n: usize) -> Vec<ImageHandle> {
    vec![
        ImageHandle::new(format!("run{}-left.jpg", n), vec![0xFF, 0xD8, n as u8]),
        ImageHandle::new(format!("run{}-right.jpg", n), vec![0xFF, 0xD8, n as u8]),
    ]
}

fn simulated_api(
    config: &ConfigurationManager,
    truth: PlanarPoint,
) -> BlockingLocatorApi<ScriptedDetector, FixedGeometryEstimator> {
    let registry = Arc::new(config.build_registry().unwrap());
    BlockingLocatorApi::from_config(
        ScriptedDetector::new(),
        FixedGeometryEstimator::new(registry, truth),
        config,
    )
    .unwrap()
}

#[test]
fn three_runs_locate_the_user() {
    let config = ConfigurationManager::new();
    let truth = PlanarPoint::new(-10.0, -50.0);
    let api = simulated_api(&config, truth);

    for (n, block) in ["Block A", "Block C", "Block F"].into_iter().enumerate() {
        api.detector().push_detection(block, 0.9);
        let measurement = api.perform_run(pair(n)).unwrap();
        assert_eq!(measurement.landmark_id(), block);
    }

    let status = api.status();
    assert!(status.session.ready_to_solve);
    assert_eq!(status.session.committed, 3);
    assert_eq!(status.runs_committed, 3);

    let located = api.locate().unwrap();
    assert_abs_diff_eq!(located.planar.x, truth.x, epsilon = 1e-6);
    assert_abs_diff_eq!(located.planar.y, truth.y, epsilon = 1e-6);
    assert_abs_diff_eq!(located.error_m, 0.0, epsilon = 1e-6);
    assert_eq!(located.used_landmarks, 3);

    let expected = to_geo(&truth, &CAMPUS_REFERENCE);
    assert_abs_diff_eq!(located.geo.latitude, expected.latitude, epsilon = 1e-9);
    assert_abs_diff_eq!(located.geo.longitude, expected.longitude, epsilon = 1e-9);
    assert!(located.geometry.quality.is_acceptable());

    let response = LocateResponse::from(&located);
    assert_eq!(response.used_landmarks, 3);
    assert_eq!(api.status().solves, 1);
}

#[test]
fn full_session_rejects_further_commits_until_reset() {
    let config = ConfigurationManager::new();
    let api = simulated_api(&config, PlanarPoint::new(0.0, -40.0));

    for (n, block) in ["Block A", "Block B", "Block E"].into_iter().enumerate() {
        api.detector().push_detection(block, 0.9);
        api.perform_run(pair(n)).unwrap();
    }

    api.detector().push_detection("Block D", 0.9);
    let err = api.perform_run(pair(3)).unwrap_err();
    assert_eq!(err, LocatorError::from(UsageError::SessionFull { capacity: 3 }));
    assert_eq!(api.status().session.committed, 3);

    api.reset().unwrap();
    api.detector().push_detection("Block D", 0.9);
    assert!(api.perform_run(pair(4)).is_ok());
    assert_eq!(api.status().session.committed, 1);
}

#[test]
fn unknown_landmark_stays_in_history_but_not_in_solve() {
    let mut config = ConfigurationManager::new();
    config.update_session_capacity(4).unwrap();
    let truth = PlanarPoint::new(-30.0, -80.0);
    let registry = Arc::new(config.build_registry().unwrap());

    // A landmark the detector knows but the survey table does not
    let mut wider = vec![("Library", PlanarPoint::new(100.0, 100.0))];
    wider.extend(registry.iter().map(|l| (l.id.as_str(), l.position)));
    let wider = Arc::new(LandmarkRegistry::from_planar(CAMPUS_REFERENCE, wider).unwrap());

    let api = BlockingLocatorApi::from_config(
        ScriptedDetector::new(),
        FixedGeometryEstimator::new(wider, truth),
        &config,
    )
    .unwrap();

    for (n, block) in ["Block B", "Library", "Block D", "Block E"].into_iter().enumerate() {
        api.detector().push_detection(block, 0.9);
        api.perform_run(pair(n)).unwrap();
    }

    let status = api.status();
    assert_eq!(status.session.committed, 4);
    assert_eq!(status.session.resolvable, 3);

    let located = api.locate().unwrap();
    assert_eq!(located.used_landmarks, 3);
    assert_abs_diff_eq!(located.planar.x, truth.x, epsilon = 1e-6);
    assert_abs_diff_eq!(located.planar.y, truth.y, epsilon = 1e-6);
}

#[test]
fn collaborator_failure_leaves_run_retryable() {
    let config = ConfigurationManager::new();
    let api = simulated_api(&config, PlanarPoint::new(-10.0, -50.0));

    api.capture(pair(0)).unwrap();
    api.detector().disconnect();
    let err = api.detect().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalService);
    assert_eq!(api.status().session.step, RunStep::InputsReady);

    api.detector().reconnect();
    api.detector().push_detection("Block A", 0.9);
    api.detect().unwrap();
    api.measure_distance().unwrap();
    api.commit().unwrap();

    let status = api.status();
    assert_eq!(status.session.step, RunStep::AwaitingInputs);
    assert_eq!(status.failures, 1);
}

#[test]
fn wrong_image_count_is_a_usage_error() {
    let config = ConfigurationManager::new();
    let api = simulated_api(&config, PlanarPoint::origin());

    let mut three = pair(0);
    three.push(ImageHandle::new("extra.jpg", vec![1u8]));
    let err = api.capture(three).unwrap_err();
    assert_eq!(
        err,
        LocatorError::from(UsageError::WrongImageCount { supplied: 3, required: 2 })
    );
    assert_eq!(api.status().session.step, RunStep::AwaitingInputs);
}

/// Detector that blocks inside `detect` until released
struct GatedDetector {
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl LandmarkDetector for GatedDetector {
    fn detect(&self, _image: &ImageHandle) -> ServiceResult<Detection> {
        self.entered.lock().unwrap().send(()).map_err(|_| ServiceError::Detection {
            message: "gate closed".to_string(),
        })?;
        self.release.lock().unwrap().recv().map_err(|_| ServiceError::Detection {
            message: "gate closed".to_string(),
        })?;
        Ok(Detection {
            landmark_id: "Block A".to_string(),
            confidence: 0.95,
        })
    }
}

#[test]
fn concurrent_step_is_rejected_while_service_call_in_flight() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let registry = Arc::new(LandmarkRegistry::campus());
    let api = BlockingLocatorApi::new(
        GatedDetector {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        },
        FixedGeometryEstimator::new(registry.clone(), PlanarPoint::new(-10.0, -50.0)),
        registry,
    );
    api.capture(pair(0)).unwrap();

    thread::scope(|scope| {
        let in_flight = scope.spawn(|| api.detect());
        entered_rx.recv().unwrap();

        let err = api.measure_distance().unwrap_err();
        assert_eq!(err, LocatorError::from(UsageError::SessionBusy));
        let err = api.discard_run().unwrap_err();
        assert_eq!(err, LocatorError::from(UsageError::SessionBusy));

        release_tx.send(()).unwrap();
        let detection = in_flight.join().unwrap().unwrap();
        assert_eq!(detection.landmark_id, "Block A");
    });

    // The rejected calls changed nothing
    assert_eq!(api.status().session.step, RunStep::LandmarkDetected);
    api.measure_distance().unwrap();
    api.commit().unwrap();
    assert_eq!(api.status().failures, 2);
}
