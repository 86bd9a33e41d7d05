//! Deployment constants for the campus positioning system

use crate::core::types::GeoPoint;

/// Meters per degree of latitude (equirectangular approximation)
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Minimum number of resolvable measurements for a 2D fix
pub const MIN_MEASUREMENTS: usize = 3;

/// Number of committed measurements per session in the reference deployment
pub const DEFAULT_SESSION_CAPACITY: usize = 3;

/// Images supplied together for one run (stereo pair)
pub const IMAGES_PER_RUN: usize = 2;

/// Normal-equation determinant below which the geometry is singular
pub const DETERMINANT_TOLERANCE: f64 = 1e-10;

/// Detections below this confidence keep the run waiting for a retry
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.5;

/// Block A centroid, origin of the campus planar frame
pub const CAMPUS_REFERENCE: GeoPoint = GeoPoint {
    latitude: 31.481991,
    longitude: 74.3036737,
};

/// Surveyed block centroids
pub const CAMPUS_LANDMARKS: [(&str, GeoPoint); 6] = [
    ("Block A", GeoPoint { latitude: 31.481991, longitude: 74.3036737 }),
    ("Block B", GeoPoint { latitude: 31.4815, longitude: 74.3030 }),
    ("Block C", GeoPoint { latitude: 31.4811762, longitude: 74.3028048 }),
    ("Block D", GeoPoint { latitude: 31.481064, longitude: 74.3033213 }),
    ("Block E", GeoPoint { latitude: 31.4815328, longitude: 74.3038079 }),
    ("Block F", GeoPoint { latitude: 31.4805619, longitude: 74.3041524 }),
];
