use crate::core::constants::MIN_MEASUREMENTS;
use crate::core::registry::LandmarkRegistry;
use crate::core::types::Measurement;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Thresholds for advisory measurement checks
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    /// Detections below this confidence are flagged
    pub low_confidence: f64,
    /// Ranges longer than this are flagged (meters)
    pub max_range_m: f64,
    /// Two landmarks closer than this add little information (meters)
    pub min_landmark_separation_m: f64,
}

impl Default for DataValidationConfig {
    fn default() -> Self {
        Self {
            low_confidence: 0.6,
            max_range_m: 500.0,    // well beyond the campus extent
            min_landmark_separation_m: 5.0,
        }
    }
}

/// Findings about a measurement set. None of them block a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
pub enum DataIssue {
    #[error("landmark {landmark_id} is not registered; measurement ignored")]
    UnknownLandmark { landmark_id: String },

    #[error("landmark {landmark_id} measured {count} times")]
    RepeatedLandmark { landmark_id: String, count: usize },

    #[error("low detection confidence for {landmark_id}: {confidence:.2}")]
    LowConfidence { landmark_id: String, confidence: f64 },

    #[error("range to {landmark_id} is {distance_m:.1} m, longer than {limit_m:.0} m")]
    RangeTooLong {
        landmark_id: String,
        distance_m: f64,
        limit_m: f64,
    },

    #[error("ranges to {first} and {second} cannot both hold ({separation_m:.1} m apart)")]
    InconsistentRanges {
        first: String,
        second: String,
        separation_m: f64,
    },

    #[error("landmarks {first} and {second} are only {separation_m:.1} m apart")]
    LandmarksTooClose {
        first: String,
        second: String,
        separation_m: f64,
    },

    #[error("only {resolvable} resolvable measurements, {required} required")]
    TooFewResolvable { resolvable: usize, required: usize },
}

/// Outcome of [`DataValidator::check`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataReport {
    pub resolvable: usize,
    pub issues: Vec<DataIssue>,
}

impl DataReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn ready_to_solve(&self) -> bool {
        self.resolvable >= MIN_MEASUREMENTS
    }
}

/// Advisory consistency checks on measurements before a solve
#[derive(Debug, Clone, Default)]
pub struct DataValidator {
    config: DataValidationConfig,
}

impl DataValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DataValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataValidationConfig {
        &self.config
    }

    pub fn check(&self, measurements: &[Measurement], registry: &LandmarkRegistry) -> DataReport {
        let mut issues = Vec::new();

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for m in measurements {
            *counts.entry(m.landmark_id()).or_default() += 1;
        }
        let mut repeated: Vec<(&str, usize)> = counts.into_iter().filter(|(_, count)| *count > 1).collect();
        repeated.sort();
        for (id, count) in repeated {
            issues.push(DataIssue::RepeatedLandmark {
                landmark_id: id.to_string(),
                count,
            });
        }

        let mut resolved = Vec::with_capacity(measurements.len());
        for m in measurements {
            let Some(position) = registry.lookup(m.landmark_id()) else {
                issues.push(DataIssue::UnknownLandmark {
                    landmark_id: m.landmark_id().to_string(),
                });
                continue;
            };
            if m.confidence() < self.config.low_confidence {
                issues.push(DataIssue::LowConfidence {
                    landmark_id: m.landmark_id().to_string(),
                    confidence: m.confidence(),
                });
            }
            if m.distance_m() > self.config.max_range_m {
                issues.push(DataIssue::RangeTooLong {
                    landmark_id: m.landmark_id().to_string(),
                    distance_m: m.distance_m(),
                    limit_m: self.config.max_range_m,
                });
            }
            resolved.push((m, position));
        }

        // Pairwise: two circles must intersect, and coincident landmarks are flagged
        for (i, (a, pa)) in resolved.iter().enumerate() {
            for (b, pb) in &resolved[i + 1..] {
                if a.landmark_id() == b.landmark_id() {
                    continue;
                }
                let separation_m = pa.distance_to(pb);
                if separation_m < self.config.min_landmark_separation_m {
                    issues.push(DataIssue::LandmarksTooClose {
                        first: a.landmark_id().to_string(),
                        second: b.landmark_id().to_string(),
                        separation_m,
                    });
                }
                let (ra, rb) = (a.distance_m(), b.distance_m());
                if separation_m > ra + rb || separation_m < (ra - rb).abs() {
                    issues.push(DataIssue::InconsistentRanges {
                        first: a.landmark_id().to_string(),
                        second: b.landmark_id().to_string(),
                        separation_m,
                    });
                }
            }
        }

        if resolved.len() < MIN_MEASUREMENTS {
            issues.push(DataIssue::TooFewResolvable {
                resolvable: resolved.len(),
                required: MIN_MEASUREMENTS,
            });
        }

        debug!(resolvable = resolved.len(), issues = issues.len(), "measurement set checked");
        DataReport {
            resolvable: resolved.len(),
            issues,
        }
    }
}
