//! Landmark geometry assessment
//!
//! Horizontal dilution of precision (HDOP) of a landmark set as seen from a
//! position. Purely diagnostic: it is reported next to an estimate and never
//! feeds back into the solve.

use crate::core::types::PlanarPoint;
use nalgebra::{Matrix2, RowVector2};
use serde::{Deserialize, Serialize};

/// Geometry quality assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryQuality {
    /// HDOP < 2.0
    Excellent,
    /// HDOP < 5.0
    Good,
    /// HDOP < 10.0
    Acceptable,
    /// HDOP >= 10.0
    Poor,
    /// Singular geometry, no finite HDOP
    Degenerate,
}

impl GeometryQuality {
    pub fn from_dop(dop: f64) -> Self {
        if dop < 2.0 {
            GeometryQuality::Excellent
        } else if dop < 5.0 {
            GeometryQuality::Good
        } else if dop < 10.0 {
            GeometryQuality::Acceptable
        } else if dop.is_finite() {
            GeometryQuality::Poor
        } else {
            GeometryQuality::Degenerate
        }
    }

    pub fn is_acceptable(&self) -> bool {
        matches!(
            self,
            GeometryQuality::Excellent | GeometryQuality::Good | GeometryQuality::Acceptable
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryAssessment {
    /// `f64::INFINITY` when the geometry is singular
    pub hdop: f64,
    pub quality: GeometryQuality,
}

impl GeometryAssessment {
    fn degenerate() -> Self {
        Self {
            hdop: f64::INFINITY,
            quality: GeometryQuality::Degenerate,
        }
    }
}

pub struct GeometryAssessor;

impl GeometryAssessor {
    /// Landmarks closer than this to the position carry no bearing
    const MIN_RANGE_M: f64 = 1e-6;

    pub fn assess<'a, I>(position: &PlanarPoint, landmarks: I) -> GeometryAssessment
    where
        I: IntoIterator<Item = &'a PlanarPoint>,
    {
        let mut hth = Matrix2::<f64>::zeros();
        let mut rows = 0usize;

        for landmark in landmarks {
            let delta = position.to_vector() - landmark.to_vector();
            let range = delta.norm();
            if range < Self::MIN_RANGE_M {
                continue;
            }
            let row = RowVector2::new(delta.x / range, delta.y / range);
            hth += row.transpose() * row;
            rows += 1;
        }

        if rows < 2 {
            return GeometryAssessment::degenerate();
        }

        match hth.try_inverse() {
            Some(covariance) => {
                let trace = covariance.trace();
                if !trace.is_finite() || trace <= 0.0 {
                    return GeometryAssessment::degenerate();
                }
                let hdop = trace.sqrt();
                GeometryAssessment {
                    hdop,
                    quality: GeometryQuality::from_dop(hdop),
                }
            }
            None => GeometryAssessment::degenerate(),
        }
    }
}
