use crate::algorithms::coordinates::{to_planar, CoordinateValidator};
use crate::algorithms::multilateration::MultilaterationEngine;
use crate::api::formatting::OutputFormat;
use crate::core::constants::{
    CAMPUS_LANDMARKS, CAMPUS_REFERENCE, DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_SESSION_CAPACITY,
    DETERMINANT_TOLERANCE, MIN_MEASUREMENTS,
};
use crate::core::registry::LandmarkRegistry;
use crate::core::types::GeoPoint;
use crate::utils::logging::LogConfig;
use crate::validation::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Seed landmarks farther than this from the reference trigger a warning (meters)
const LANDMARK_EXTENT_WARNING_M: f64 = 1_000.0;

/// Largest number of decimals the formatters accept
const MAX_OUTPUT_PRECISION: u8 = 12;

/// System-wide configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Origin of the planar frame
    pub reference: GeoPoint,
    pub session: SessionConfig,
    pub solver: SolverConfig,
    /// Survey table loaded into the landmark registry
    pub landmarks: Vec<LandmarkSeed>,
    pub output: OutputConfig,
    pub logging: LogConfig,
}

/// Measurement session parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Committed measurements collected before solving
    pub capacity: usize,
    /// Detections below this confidence are rejected (0.0 to 1.0)
    pub min_detection_confidence: f64,
}

/// Multilateration solver parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Relative threshold on the normal-equation determinant
    pub determinant_tolerance: f64,
}

/// One surveyed landmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSeed {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl LandmarkSeed {
    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Presentation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Decimal places for planar values; geographic values get more
    pub precision: u8,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            reference: CAMPUS_REFERENCE,
            session: SessionConfig::default(),
            solver: SolverConfig::default(),
            landmarks: CAMPUS_LANDMARKS
                .iter()
                .map(|(id, geo)| LandmarkSeed {
                    id: id.to_string(),
                    latitude: geo.latitude,
                    longitude: geo.longitude,
                })
                .collect(),
            output: OutputConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SESSION_CAPACITY,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            determinant_tolerance: DETERMINANT_TOLERANCE,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            precision: 2,
        }
    }
}

/// Configuration validation result
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Whether configuration is valid
    pub is_valid: bool,
    /// Validation errors
    pub errors: Vec<ConfigError>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn from_findings(errors: Vec<ConfigError>, warnings: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// First error, if the configuration is invalid
    pub fn into_result(self) -> Result<Vec<String>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(self.warnings),
        }
    }
}

fn invalid(parameter: &str, value: impl ToString, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Main configuration manager
#[derive(Debug, Default)]
pub struct ConfigurationManager {
    /// Current system configuration
    config: SystemConfig,
    /// Configuration file path
    config_file_path: Option<PathBuf>,
    /// Whether configuration has been modified
    is_modified: bool,
}

impl ConfigurationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager from a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SystemConfig = serde_json::from_str(json)?;
        Self::validate_config(&config).into_result()?;
        Ok(Self {
            config,
            config_file_path: None,
            is_modified: false,
        })
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.config)?)
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.config.session
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.config_file_path.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Load configuration from a JSON file; nothing changes if it is invalid
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            message: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let config: SystemConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Serialization {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
        })?;

        let warnings = Self::validate_config(&config).into_result()?;
        for warning in &warnings {
            tracing::warn!(path = %path.display(), "{}", warning);
        }

        info!(path = %path.display(), landmarks = config.landmarks.len(), "configuration loaded");
        self.config = config;
        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|e| ConfigError::Io {
            message: format!("failed to write config file '{}': {}", path.display(), e),
        })?;

        debug!(path = %path.display(), "configuration saved");
        self.config_file_path = Some(path.to_path_buf());
        self.is_modified = false;
        Ok(())
    }

    /// Save to the file the configuration was last loaded from or saved to
    pub fn save(&mut self) -> Result<(), ConfigError> {
        match self.config_file_path.clone() {
            Some(path) => self.save_to_file(path),
            None => Err(ConfigError::Io {
                message: "no configuration file path set".to_string(),
            }),
        }
    }

    /// Replace the whole configuration after validating it
    pub fn update_config(&mut self, config: SystemConfig) -> Result<Vec<String>, ConfigError> {
        let warnings = Self::validate_config(&config).into_result()?;
        self.config = config;
        self.is_modified = true;
        Ok(warnings)
    }

    pub fn update_session_capacity(&mut self, capacity: usize) -> Result<usize, ConfigError> {
        if capacity < MIN_MEASUREMENTS {
            return Err(invalid("session.capacity", capacity, format!("must be at least {}", MIN_MEASUREMENTS)));
        }
        let old = self.config.session.capacity;
        self.config.session.capacity = capacity;
        self.is_modified = true;
        Ok(old)
    }

    pub fn update_min_detection_confidence(&mut self, threshold: f64) -> Result<f64, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid("session.min_detection_confidence", threshold, "must be within [0, 1]"));
        }
        let old = self.config.session.min_detection_confidence;
        self.config.session.min_detection_confidence = threshold;
        self.is_modified = true;
        Ok(old)
    }

    pub fn update_output_format(&mut self, format: OutputFormat) -> OutputFormat {
        let old = self.config.output.format;
        self.config.output.format = format;
        self.is_modified = true;
        old
    }

    pub fn validate(&self) -> ValidationResult {
        Self::validate_config(&self.config)
    }

    /// Check every section of a configuration
    pub fn validate_config(config: &SystemConfig) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if let Err(e) = CoordinateValidator::validate_reference(&config.reference) {
            errors.push(invalid(
                "reference",
                format!("({}, {})", config.reference.latitude, config.reference.longitude),
                e.to_string(),
            ));
        }

        if config.session.capacity < MIN_MEASUREMENTS {
            errors.push(invalid(
                "session.capacity",
                config.session.capacity,
                format!("must be at least {}", MIN_MEASUREMENTS),
            ));
        }
        if !(0.0..=1.0).contains(&config.session.min_detection_confidence) {
            errors.push(invalid(
                "session.min_detection_confidence",
                config.session.min_detection_confidence,
                "must be within [0, 1]",
            ));
        }

        let tolerance = config.solver.determinant_tolerance;
        if !tolerance.is_finite() || tolerance <= 0.0 {
            errors.push(invalid("solver.determinant_tolerance", tolerance, "must be finite and positive"));
        }

        if config.output.precision > MAX_OUTPUT_PRECISION {
            errors.push(invalid(
                "output.precision",
                config.output.precision,
                format!("must be at most {}", MAX_OUTPUT_PRECISION),
            ));
        }

        if let Some(directives) = &config.logging.filter {
            if let Err(e) = EnvFilter::try_new(directives) {
                errors.push(invalid("logging.filter", directives, e.to_string()));
            }
        }

        if config.landmarks.len() < MIN_MEASUREMENTS {
            errors.push(invalid(
                "landmarks",
                config.landmarks.len(),
                format!("at least {} landmarks are needed for a fix", MIN_MEASUREMENTS),
            ));
        }

        let mut seen = HashSet::new();
        for seed in &config.landmarks {
            if !seen.insert(seed.id.as_str()) {
                errors.push(invalid("landmarks.id", &seed.id, "duplicate landmark id"));
                continue;
            }
            if let Err(e) = CoordinateValidator::validate_geo(&seed.geo()) {
                errors.push(invalid("landmarks.position", &seed.id, e.to_string()));
                continue;
            }

            let planar = to_planar(&seed.geo(), &config.reference);
            if planar.x.hypot(planar.y) > LANDMARK_EXTENT_WARNING_M {
                warnings.push(format!(
                    "landmark {} is {:.0} m from the reference; planar approximation may drift",
                    seed.id,
                    planar.x.hypot(planar.y)
                ));
            }
        }

        ValidationResult::from_findings(errors, warnings)
    }

    /// Build the landmark registry described by the configuration
    pub fn build_registry(&self) -> Result<LandmarkRegistry, ConfigError> {
        LandmarkRegistry::from_geo_table(
            self.config.reference,
            self.config.landmarks.iter().map(|seed| (seed.id.clone(), seed.geo())),
        )
        .map_err(|e| invalid("landmarks", self.config.landmarks.len(), e.to_string()))
    }

    pub fn engine(&self) -> MultilaterationEngine {
        MultilaterationEngine::with_tolerance(self.config.solver.determinant_tolerance)
    }
}
