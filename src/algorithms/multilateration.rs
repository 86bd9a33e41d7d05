//! Least-squares multilateration
//!
//! Linearizes the range circles against the first resolvable measurement and
//! solves the resulting over-determined system through its 2x2 normal
//! equations. The unknowns are always the planar `(X, Y)` pair, so the
//! closed-form inverse holds for any number of measurements `n >= 3`.
//!
//! Measurement confidence is carried along but does not weight the solve.

use crate::core::constants::{DETERMINANT_TOLERANCE, MIN_MEASUREMENTS};
use crate::core::registry::LandmarkRegistry;
use crate::core::types::{Measurement, PlanarPoint, PositionEstimate};
use crate::validation::error::{LocatorError, LocatorResult};
use nalgebra::{Matrix2, RowVector2, Vector2};
use tracing::{debug, warn};

/// Measurement paired with the planar position of its landmark
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMeasurement<'a> {
    pub measurement: &'a Measurement,
    pub position: PlanarPoint,
}

impl ResolvedMeasurement<'_> {
    pub fn range_m(&self) -> f64 {
        self.measurement.distance_m()
    }
}

/// Keep measurements whose landmark is registered, in input order
pub fn resolve<'a>(measurements: &'a [Measurement], registry: &LandmarkRegistry) -> Vec<ResolvedMeasurement<'a>> {
    measurements
        .iter()
        .filter_map(|measurement| {
            registry
                .lookup(measurement.landmark_id())
                .map(|position| ResolvedMeasurement { measurement, position })
        })
        .collect()
}

/// Stateless multilateration solver; safe to share between sessions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MultilaterationEngine {
    /// Relative determinant threshold for the normal matrix
    pub determinant_tolerance: f64,
}

impl Default for MultilaterationEngine {
    fn default() -> Self {
        Self {
            determinant_tolerance: DETERMINANT_TOLERANCE,
        }
    }
}

impl MultilaterationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(determinant_tolerance: f64) -> Self {
        Self { determinant_tolerance }
    }

    /// Estimate a planar position from range measurements.
    ///
    /// Unknown landmark ids are skipped. Fails with `InsufficientData` when
    /// fewer than three measurements resolve, and with `DegenerateGeometry`
    /// when the landmarks are collinear or coincident.
    pub fn solve(&self, measurements: &[Measurement], registry: &LandmarkRegistry) -> LocatorResult<PositionEstimate> {
        let resolved = resolve(measurements, registry);
        if resolved.len() < MIN_MEASUREMENTS {
            debug!(
                total = measurements.len(),
                resolvable = resolved.len(),
                "not enough resolvable measurements"
            );
            return Err(LocatorError::InsufficientData {
                resolvable: resolved.len(),
                required: MIN_MEASUREMENTS,
            });
        }

        self.solve_resolved(&resolved)
    }

    /// Solve an already resolved measurement set
    pub fn solve_resolved(&self, resolved: &[ResolvedMeasurement<'_>]) -> LocatorResult<PositionEstimate> {
        let n = resolved.len();
        if n < MIN_MEASUREMENTS {
            return Err(LocatorError::InsufficientData {
                resolvable: n,
                required: MIN_MEASUREMENTS,
            });
        }

        let reference = &resolved[0];
        let (x0, y0, r0) = (reference.position.x, reference.position.y, reference.range_m());
        let k0 = x0 * x0 + y0 * y0 - r0 * r0;

        // Accumulate A^T A and A^T b row by row
        let mut ata = Matrix2::<f64>::zeros();
        let mut atb = Vector2::<f64>::zeros();
        for point in &resolved[1..] {
            let (xi, yi, ri) = (point.position.x, point.position.y, point.range_m());
            let row = RowVector2::new(2.0 * (xi - x0), 2.0 * (yi - y0));
            let rhs = (xi * xi + yi * yi - ri * ri) - k0;

            ata += row.transpose() * row;
            atb += row.transpose() * rhs;
        }

        let (a, b1, c, d) = (ata[(0, 0)], ata[(0, 1)], ata[(1, 0)], ata[(1, 1)]);
        let (e, f) = (atb[0], atb[1]);
        let det = a * d - b1 * c;

        if self.is_singular(&ata, det) {
            warn!(determinant = det, measurements = n, "degenerate landmark geometry");
            return Err(LocatorError::DegenerateGeometry {
                determinant: det,
                measurements: resolved.iter().map(|r| r.measurement.clone()).collect(),
            });
        }

        let position = PlanarPoint::new((d * e - b1 * f) / det, (a * f - c * e) / det);
        let error_m = mean_absolute_residual(&position, resolved);

        debug!(x = position.x, y = position.y, error_m, used = n, "multilateration solved");
        Ok(PositionEstimate {
            position,
            error_m,
            used_landmarks: n,
        })
    }

    /// Closed-form fix from the first three resolvable circles.
    ///
    /// Works in the frame spanned by the first two landmarks (`ex` along
    /// landmark 0 to 1, `ey` toward landmark 2). For exact ranges it agrees
    /// with [`solve`](Self::solve), which makes it a cross-check of the
    /// least squares answer for three-measurement sessions.
    pub fn solve_exact_three(&self, measurements: &[Measurement], registry: &LandmarkRegistry) -> LocatorResult<PositionEstimate> {
        let mut resolved = resolve(measurements, registry);
        if resolved.len() < MIN_MEASUREMENTS {
            return Err(LocatorError::InsufficientData {
                resolvable: resolved.len(),
                required: MIN_MEASUREMENTS,
            });
        }
        resolved.truncate(MIN_MEASUREMENTS);

        let p1 = resolved[0].position.to_vector();
        let p2 = resolved[1].position.to_vector();
        let p3 = resolved[2].position.to_vector();
        let (r1, r2, r3) = (resolved[0].range_m(), resolved[1].range_m(), resolved[2].range_m());

        let baseline = (p2 - p1).norm();
        let degenerate = |determinant: f64| LocatorError::DegenerateGeometry {
            determinant,
            measurements: resolved.iter().map(|r| r.measurement.clone()).collect(),
        };
        if baseline <= f64::EPSILON {
            return Err(degenerate(0.0));
        }

        let ex = (p2 - p1) / baseline;
        let i = ex.dot(&(p3 - p1));
        let offset = p3 - p1 - ex * i;
        let j = offset.norm();
        // Twice the triangle area: zero when the third landmark is on the baseline
        if j * baseline < self.determinant_tolerance * baseline.max(1.0).powi(2) {
            return Err(degenerate(j * baseline));
        }
        let ey = offset / j;

        let x = (r1 * r1 - r2 * r2 + baseline * baseline) / (2.0 * baseline);
        let y = (r1 * r1 - r3 * r3 + i * i + j * j) / (2.0 * j) - (i / j) * x;
        let position = PlanarPoint::from(p1 + ex * x + ey * y);

        Ok(PositionEstimate {
            position,
            error_m: mean_absolute_residual(&position, &resolved),
            used_landmarks: MIN_MEASUREMENTS,
        })
    }

    /// Scale-aware singularity check.
    ///
    /// The determinant carries units of m^4, so it is compared against the
    /// tolerance times the squared magnitude of the normal matrix. Below a
    /// magnitude of one the absolute tolerance applies.
    fn is_singular(&self, ata: &Matrix2<f64>, det: f64) -> bool {
        if !det.is_finite() {
            return true;
        }
        let scale = ata.amax().max(1.0);
        det.abs() < self.determinant_tolerance * scale * scale
    }
}

/// Mean of `|distance(position, landmark_i) - r_i|` over every measurement
fn mean_absolute_residual(position: &PlanarPoint, resolved: &[ResolvedMeasurement<'_>]) -> f64 {
    let total: f64 = resolved
        .iter()
        .map(|point| (position.distance_to(&point.position) - point.range_m()).abs())
        .sum();
    total / resolved.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::GeoPoint;
    use approx::assert_abs_diff_eq;

    fn triangle_registry() -> LandmarkRegistry {
        LandmarkRegistry::from_planar(
            GeoPoint::new(31.481991, 74.3036737),
            vec![
                ("A", PlanarPoint::new(0.0, 0.0)),
                ("B", PlanarPoint::new(30.0, 0.0)),
                ("C", PlanarPoint::new(0.0, 40.0)),
                ("D", PlanarPoint::new(30.0, 40.0)),
                ("L1", PlanarPoint::new(10.0, 0.0)),
                ("L2", PlanarPoint::new(20.0, 0.0)),
            ],
        )
        .unwrap()
    }

    fn m(id: &str, distance: f64) -> Measurement {
        Measurement::new(id, distance, 0.9).unwrap()
    }

    #[test]
    fn test_worked_example() {
        let registry = triangle_registry();
        let measurements = vec![
            m("A", 200.0_f64.sqrt()),
            m("B", 500.0_f64.sqrt()),
            m("C", 1300.0_f64.sqrt()),
        ];

        let estimate = MultilaterationEngine::new().solve(&measurements, &registry).unwrap();
        assert_abs_diff_eq!(estimate.position.x, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate.position.y, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate.error_m, 0.0, epsilon = 1e-9);
        assert_eq!(estimate.used_landmarks, 3);
    }

    #[test]
    fn test_four_landmarks_overdetermined() {
        let registry = triangle_registry();
        let truth = PlanarPoint::new(12.5, 27.0);
        let measurements: Vec<_> = ["A", "B", "C", "D"]
            .iter()
            .map(|id| m(id, truth.distance_to(&registry.lookup(id).unwrap())))
            .collect();

        let estimate = MultilaterationEngine::new().solve(&measurements, &registry).unwrap();
        assert_abs_diff_eq!(estimate.position.x, truth.x, epsilon = 1e-8);
        assert_abs_diff_eq!(estimate.position.y, truth.y, epsilon = 1e-8);
        assert_eq!(estimate.used_landmarks, 4);
    }

    #[test]
    fn test_unknown_landmarks_are_skipped() {
        let registry = triangle_registry();
        let measurements = vec![
            m("Nowhere", 5.0),
            m("A", 200.0_f64.sqrt()),
            m("B", 500.0_f64.sqrt()),
            m("Elsewhere", 7.0),
            m("C", 1300.0_f64.sqrt()),
        ];

        let estimate = MultilaterationEngine::new().solve(&measurements, &registry).unwrap();
        assert_eq!(estimate.used_landmarks, 3);
        assert_abs_diff_eq!(estimate.position.x, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_insufficient_resolvable_measurements() {
        let registry = triangle_registry();
        let measurements = vec![m("A", 1.0), m("B", 2.0), m("X", 3.0), m("Y", 4.0), m("Z", 5.0)];

        let err = MultilaterationEngine::new().solve(&measurements, &registry).unwrap_err();
        assert_eq!(err, LocatorError::InsufficientData { resolvable: 2, required: 3 });

        let err = MultilaterationEngine::new().solve(&[], &registry).unwrap_err();
        assert_eq!(err, LocatorError::InsufficientData { resolvable: 0, required: 3 });
    }

    #[test]
    fn test_collinear_landmarks_are_degenerate() {
        let registry = triangle_registry();
        let measurements = vec![m("A", 10.0), m("L1", 5.0), m("L2", 12.0)];

        match MultilaterationEngine::new().solve(&measurements, &registry) {
            Err(LocatorError::DegenerateGeometry { measurements: reported, .. }) => {
                assert_eq!(reported, measurements);
            }
            other => panic!("expected degenerate geometry, got {:?}", other),
        }
    }

    #[test]
    fn test_coincident_landmarks_are_degenerate() {
        let registry = triangle_registry();
        let measurements = vec![m("A", 10.0), m("A", 11.0), m("A", 12.0)];
        let err = MultilaterationEngine::new().solve(&measurements, &registry).unwrap_err();
        assert!(matches!(err, LocatorError::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_first_resolvable_measurement_is_reference() {
        // Same set in two orders gives the same fix for exact ranges
        let registry = triangle_registry();
        let truth = PlanarPoint::new(5.0, 8.0);
        let range = |id: &str| m(id, truth.distance_to(&registry.lookup(id).unwrap()));

        let forward = vec![range("A"), range("B"), range("C")];
        let backward = vec![range("C"), range("B"), range("A")];
        let engine = MultilaterationEngine::new();
        let f = engine.solve(&forward, &registry).unwrap();
        let b = engine.solve(&backward, &registry).unwrap();
        assert_abs_diff_eq!(f.position.x, b.position.x, epsilon = 1e-9);
        assert_abs_diff_eq!(f.position.y, b.position.y, epsilon = 1e-9);
    }

    #[test]
    fn test_noisy_ranges_report_residual() {
        let registry = triangle_registry();
        let measurements = vec![m("A", 15.0), m("B", 22.0), m("C", 36.0), m("D", 33.0)];

        let estimate = MultilaterationEngine::new().solve(&measurements, &registry).unwrap();
        assert!(estimate.error_m > 0.0);
        assert!(estimate.error_m < 5.0);
    }

    #[test]
    fn test_confidence_does_not_weight_solve() {
        let registry = triangle_registry();
        let confident = vec![
            Measurement::new("A", 15.0, 1.0).unwrap(),
            Measurement::new("B", 22.0, 1.0).unwrap(),
            Measurement::new("C", 36.0, 1.0).unwrap(),
        ];
        let doubtful = vec![
            Measurement::new("A", 15.0, 0.1).unwrap(),
            Measurement::new("B", 22.0, 0.9).unwrap(),
            Measurement::new("C", 36.0, 0.3).unwrap(),
        ];

        let engine = MultilaterationEngine::new();
        assert_eq!(
            engine.solve(&confident, &registry).unwrap(),
            engine.solve(&doubtful, &registry).unwrap()
        );
    }

    #[test]
    fn test_exact_three_agrees_with_least_squares() {
        let registry = triangle_registry();
        let measurements = vec![
            m("B", 500.0_f64.sqrt()),
            m("C", 1300.0_f64.sqrt()),
            m("A", 200.0_f64.sqrt()),
        ];

        let engine = MultilaterationEngine::new();
        let exact = engine.solve_exact_three(&measurements, &registry).unwrap();
        let lsq = engine.solve(&measurements, &registry).unwrap();
        assert_abs_diff_eq!(exact.position.x, lsq.position.x, epsilon = 1e-9);
        assert_abs_diff_eq!(exact.position.y, lsq.position.y, epsilon = 1e-9);
        assert_abs_diff_eq!(exact.position.x, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_exact_three_rejects_collinear() {
        let registry = triangle_registry();
        let measurements = vec![m("A", 10.0), m("L1", 5.0), m("L2", 12.0)];
        let err = MultilaterationEngine::new()
            .solve_exact_three(&measurements, &registry)
            .unwrap_err();
        assert!(matches!(err, LocatorError::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_campus_blocks_recover_position() {
        let registry = LandmarkRegistry::campus();
        let truth = PlanarPoint::new(-30.0, -60.0);
        let measurements: Vec<_> = ["Block A", "Block C", "Block F"]
            .iter()
            .map(|id| m(id, truth.distance_to(&registry.lookup(id).unwrap())))
            .collect();

        let estimate = MultilaterationEngine::new().solve(&measurements, &registry).unwrap();
        assert_abs_diff_eq!(estimate.position.x, truth.x, epsilon = 1e-6);
        assert_abs_diff_eq!(estimate.position.y, truth.y, epsilon = 1e-6);
    }
}
