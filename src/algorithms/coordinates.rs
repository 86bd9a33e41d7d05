//! Geographic to planar coordinate conversion
//!
//! Equirectangular approximation around a fixed reference point, accurate
//! for the sub-kilometer extent of a campus. Both directions are pure
//! functions of the input and the reference; the [`CoordinateFrame`] wrapper
//! only pins the reference so callers don't have to thread it around.

use crate::core::constants::METERS_PER_DEGREE_LAT;
use crate::core::types::{GeoPoint, PlanarPoint};
use crate::validation::error::UsageError;

/// Extent beyond which the flat-earth approximation drifts noticeably (meters)
pub const MAX_PLANAR_EXTENT_M: f64 = 1_000.0;

/// Meters per degree of longitude at the reference latitude
fn meters_per_degree_lng(reference: &GeoPoint) -> f64 {
    METERS_PER_DEGREE_LAT * reference.latitude.to_radians().cos()
}

/// Convert a geographic point to meters east/north of `reference`
pub fn to_planar(geo: &GeoPoint, reference: &GeoPoint) -> PlanarPoint {
    PlanarPoint {
        x: (geo.longitude - reference.longitude) * meters_per_degree_lng(reference),
        y: (geo.latitude - reference.latitude) * METERS_PER_DEGREE_LAT,
    }
}

/// Inverse of [`to_planar`]
pub fn to_geo(planar: &PlanarPoint, reference: &GeoPoint) -> GeoPoint {
    GeoPoint {
        latitude: reference.latitude + planar.y / METERS_PER_DEGREE_LAT,
        longitude: reference.longitude + planar.x / meters_per_degree_lng(reference),
    }
}

/// Planar frame anchored at a fixed reference point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateFrame {
    reference: GeoPoint,
}

impl CoordinateFrame {
    /// Create a frame; the reference must be a valid point off the poles
    pub fn new(reference: GeoPoint) -> Result<Self, UsageError> {
        CoordinateValidator::validate_reference(&reference)?;
        Ok(Self { reference })
    }

    /// Frame around a compile-time survey reference known to be valid
    pub(crate) const fn surveyed(reference: GeoPoint) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> &GeoPoint {
        &self.reference
    }

    pub fn to_planar(&self, geo: &GeoPoint) -> PlanarPoint {
        to_planar(geo, &self.reference)
    }

    pub fn to_geo(&self, planar: &PlanarPoint) -> GeoPoint {
        to_geo(planar, &self.reference)
    }
}

/// Coordinate validation utilities
pub struct CoordinateValidator;

impl CoordinateValidator {
    /// Validate WGS84 latitude/longitude ranges
    pub fn validate_geo(point: &GeoPoint) -> Result<(), UsageError> {
        if !point.latitude.is_finite() || !point.longitude.is_finite() {
            return Err(UsageError::InvalidCoordinate {
                reason: format!("non-finite coordinate ({}, {})", point.latitude, point.longitude),
            });
        }
        if point.latitude.abs() > 90.0 {
            return Err(UsageError::InvalidCoordinate {
                reason: format!("latitude {} out of range [-90, 90]", point.latitude),
            });
        }
        if point.longitude.abs() > 180.0 {
            return Err(UsageError::InvalidCoordinate {
                reason: format!("longitude {} out of range [-180, 180]", point.longitude),
            });
        }
        Ok(())
    }

    /// A reference must also keep cos(latitude) away from zero
    pub fn validate_reference(reference: &GeoPoint) -> Result<(), UsageError> {
        Self::validate_geo(reference)?;
        if reference.latitude.abs() >= 90.0 {
            return Err(UsageError::InvalidCoordinate {
                reason: format!("reference latitude {} is a pole", reference.latitude),
            });
        }
        Ok(())
    }

    /// Whether a planar point stays inside the approximation's valid extent
    pub fn within_extent(planar: &PlanarPoint) -> bool {
        planar.x.hypot(planar.y) <= MAX_PLANAR_EXTENT_M
    }
}
