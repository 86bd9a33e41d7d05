//! Landmark registry
//!
//! Fixed table of landmark id to planar position, built once from surveyed
//! geographic coordinates through a single shared [`CoordinateFrame`].
//! Read-only after construction, so it can be shared across threads behind
//! an `Arc` without locking.

use crate::algorithms::coordinates::{CoordinateFrame, CoordinateValidator};
use crate::core::constants::{CAMPUS_LANDMARKS, CAMPUS_REFERENCE};
use crate::core::types::{GeoPoint, Landmark, PlanarPoint};
use crate::validation::error::UsageError;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct LandmarkRegistry {
    frame: CoordinateFrame,
    /// Survey order is kept for iteration
    landmarks: Vec<Landmark>,
    index: HashMap<String, usize>,
}

impl LandmarkRegistry {
    /// Build a registry from `(id, survey point)` pairs
    pub fn from_geo_table<I, S>(reference: GeoPoint, table: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = (S, GeoPoint)>,
        S: Into<String>,
    {
        let frame = CoordinateFrame::new(reference)?;
        let mut landmarks = Vec::new();
        let mut index = HashMap::new();

        for (id, geo) in table {
            let id = id.into();
            CoordinateValidator::validate_geo(&geo)?;
            if index.contains_key(&id) {
                return Err(UsageError::DuplicateLandmark { id });
            }

            let position = frame.to_planar(&geo);
            debug!(landmark = %id, x = position.x, y = position.y, "registered landmark");
            index.insert(id.clone(), landmarks.len());
            landmarks.push(Landmark { id, position });
        }

        Ok(Self { frame, landmarks, index })
    }

    /// Build a registry from positions already expressed in the planar frame
    pub fn from_planar<I, S>(reference: GeoPoint, table: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = (S, PlanarPoint)>,
        S: Into<String>,
    {
        let frame = CoordinateFrame::new(reference)?;
        let mut landmarks = Vec::new();
        let mut index = HashMap::new();

        for (id, position) in table {
            let id = id.into();
            if !position.x.is_finite() || !position.y.is_finite() {
                return Err(UsageError::InvalidCoordinate {
                    reason: format!("non-finite planar position for {}", id),
                });
            }
            if index.contains_key(&id) {
                return Err(UsageError::DuplicateLandmark { id });
            }
            index.insert(id.clone(), landmarks.len());
            landmarks.push(Landmark { id, position });
        }

        Ok(Self { frame, landmarks, index })
    }

    /// The surveyed campus blocks around the Block A centroid
    pub fn campus() -> Self {
        let frame = CoordinateFrame::surveyed(CAMPUS_REFERENCE);
        let mut landmarks = Vec::with_capacity(CAMPUS_LANDMARKS.len());
        let mut index = HashMap::with_capacity(CAMPUS_LANDMARKS.len());
        for (id, geo) in CAMPUS_LANDMARKS.iter() {
            index.insert(id.to_string(), landmarks.len());
            landmarks.push(Landmark {
                id: id.to_string(),
                position: frame.to_planar(geo),
            });
        }

        Self { frame, landmarks, index }
    }

    /// Planar position of a landmark, if known
    pub fn lookup(&self, id: &str) -> Option<PlanarPoint> {
        self.get(id).map(|landmark| landmark.position)
    }

    pub fn get(&self, id: &str) -> Option<&Landmark> {
        self.index.get(id).map(|&i| &self.landmarks[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Geographic position of a landmark, recovered through the shared frame
    pub fn geo_of(&self, id: &str) -> Option<GeoPoint> {
        self.lookup(id).map(|planar| self.frame.to_geo(&planar))
    }

    pub fn reference(&self) -> &GeoPoint {
        self.frame.reference()
    }

    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.landmarks.iter().map(|landmark| landmark.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter()
    }
}

impl Default for LandmarkRegistry {
    fn default() -> Self {
        Self::campus()
    }
}
