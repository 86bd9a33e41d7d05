//! Position presentation and output formatting
//!
//! [`PositionPresenter`] turns a planar [`PositionEstimate`] into a
//! [`LocatedPosition`] carrying geographic coordinates and a geometry
//! assessment. The formatters render a located position as text, JSON or CSV.

use crate::algorithms::coordinates::to_geo;
use crate::algorithms::geometry::{GeometryAssessment, GeometryAssessor, GeometryQuality};
use crate::core::types::{GeoPoint, PlanarPoint, PositionEstimate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

/// Extra decimals for degrees; 1e-7 degree is about a centimeter
const GEO_EXTRA_DECIMALS: u8 = 5;
const MAX_DECIMALS: u8 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown output format '{}' (expected text, json or csv)", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        })
    }
}

/// A position estimate placed back on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocatedPosition {
    pub geo: GeoPoint,
    pub planar: PlanarPoint,
    pub error_m: f64,
    pub used_landmarks: usize,
    pub geometry: GeometryAssessment,
}

/// Reply shape of the map screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocateResponse {
    pub latitude: f64,
    pub longitude: f64,
    pub error_m: f64,
    pub used_landmarks: usize,
}

impl From<&LocatedPosition> for LocateResponse {
    fn from(located: &LocatedPosition) -> Self {
        Self {
            latitude: located.geo.latitude,
            longitude: located.geo.longitude,
            error_m: located.error_m,
            used_landmarks: located.used_landmarks,
        }
    }
}

/// Converts planar estimates into geographic positions for display
#[derive(Debug, Clone, PartialEq)]
pub struct PositionPresenter {
    reference: GeoPoint,
    /// Decimal places for meter values
    precision: u8,
}

impl PositionPresenter {
    pub fn new(reference: GeoPoint) -> Self {
        Self {
            reference,
            precision: 2,
        }
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision.min(MAX_DECIMALS);
        self
    }

    pub fn reference(&self) -> &GeoPoint {
        &self.reference
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Place `estimate` on the map, assessing it against the landmarks it used
    pub fn present<'a, I>(&self, estimate: &PositionEstimate, landmarks: I) -> LocatedPosition
    where
        I: IntoIterator<Item = &'a PlanarPoint>,
    {
        LocatedPosition {
            geo: to_geo(&estimate.position, &self.reference),
            planar: estimate.position,
            error_m: estimate.error_m,
            used_landmarks: estimate.used_landmarks,
            geometry: GeometryAssessor::assess(&estimate.position, landmarks),
        }
    }

    pub fn render(&self, located: &LocatedPosition, format: OutputFormat) -> String {
        match format {
            OutputFormat::Text => TextFormatter::new(self.precision).format(located),
            OutputFormat::Json => JsonFormatter::new(self.precision).format(located),
            OutputFormat::Csv => {
                let csv = CsvFormatter::new(self.precision);
                format!("{}\n{}", csv.header(), csv.format(located))
            }
        }
    }
}

fn round_to(value: f64, decimals: u8) -> f64 {
    let multiplier = 10_f64.powi(decimals as i32);
    (value * multiplier).round() / multiplier
}

fn geo_decimals(precision: u8) -> usize {
    precision.saturating_add(GEO_EXTRA_DECIMALS).min(MAX_DECIMALS) as usize
}

fn quality_label(quality: GeometryQuality) -> &'static str {
    match quality {
        GeometryQuality::Excellent => "excellent",
        GeometryQuality::Good => "good",
        GeometryQuality::Acceptable => "acceptable",
        GeometryQuality::Poor => "poor",
        GeometryQuality::Degenerate => "degenerate",
    }
}

/// Human-readable text formatter
#[derive(Debug, Clone)]
pub struct TextFormatter {
    pub precision: u8,
    /// Single line with coordinates and error only
    pub compact: bool,
}

impl TextFormatter {
    pub fn new(precision: u8) -> Self {
        Self {
            precision,
            compact: false,
        }
    }

    pub fn compact(precision: u8) -> Self {
        Self {
            precision,
            compact: true,
        }
    }

    pub fn format(&self, located: &LocatedPosition) -> String {
        let p = self.precision as usize;
        let g = geo_decimals(self.precision);

        if self.compact {
            return format!(
                "{:.g$},{:.g$} ±{:.p$}m",
                located.geo.latitude, located.geo.longitude, located.error_m
            );
        }

        let hdop = if located.geometry.hdop.is_finite() {
            format!("{:.2}", located.geometry.hdop)
        } else {
            "n/a".to_string()
        };
        format!(
            "Position: {:.g$}, {:.g$}\n\
             Planar:   x={:.p$} m, y={:.p$} m\n\
             Error:    ±{:.p$} m over {} landmarks\n\
             Geometry: {} (HDOP {})",
            located.geo.latitude,
            located.geo.longitude,
            located.planar.x,
            located.planar.y,
            located.error_m,
            located.used_landmarks,
            quality_label(located.geometry.quality),
            hdop,
        )
    }
}

/// JSON formatter
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pub precision: u8,
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(precision: u8) -> Self {
        Self { precision, pretty: false }
    }

    pub fn pretty(precision: u8) -> Self {
        Self { precision, pretty: true }
    }

    /// Non-finite HDOP is written as `null`
    pub fn format(&self, located: &LocatedPosition) -> String {
        let g = geo_decimals(self.precision) as u8;
        let value = json!({
            "latitude": round_to(located.geo.latitude, g),
            "longitude": round_to(located.geo.longitude, g),
            "x_m": round_to(located.planar.x, self.precision),
            "y_m": round_to(located.planar.y, self.precision),
            "error_m": round_to(located.error_m, self.precision),
            "used_landmarks": located.used_landmarks,
            "hdop": round_to(located.geometry.hdop, 2),
            "geometry": quality_label(located.geometry.quality),
        });
        if self.pretty {
            format!("{:#}", value)
        } else {
            value.to_string()
        }
    }
}

/// CSV formatter, one row per position
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    pub precision: u8,
}

impl CsvFormatter {
    pub fn new(precision: u8) -> Self {
        Self { precision }
    }

    pub fn header(&self) -> &'static str {
        "latitude,longitude,x_m,y_m,error_m,used_landmarks,hdop,geometry"
    }

    pub fn format(&self, located: &LocatedPosition) -> String {
        let p = self.precision as usize;
        let g = geo_decimals(self.precision);
        let hdop = if located.geometry.hdop.is_finite() {
            format!("{:.2}", located.geometry.hdop)
        } else {
            String::new()
        };
        format!(
            "{:.g$},{:.g$},{:.p$},{:.p$},{:.p$},{},{},{}",
            located.geo.latitude,
            located.geo.longitude,
            located.planar.x,
            located.planar.y,
            located.error_m,
            located.used_landmarks,
            hdop,
            quality_label(located.geometry.quality),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const REFERENCE: GeoPoint = GeoPoint {
        latitude: 31.481991,
        longitude: 74.3036737,
    };

    fn landmarks() -> Vec<PlanarPoint> {
        vec![
            PlanarPoint::new(0.0, 0.0),
            PlanarPoint::new(30.0, 0.0),
            PlanarPoint::new(0.0, 40.0),
        ]
    }

    fn located() -> LocatedPosition {
        let estimate = PositionEstimate {
            position: PlanarPoint::new(10.0, 10.0),
            error_m: 0.126,
            used_landmarks: 3,
        };
        PositionPresenter::new(REFERENCE).present(&estimate, &landmarks())
    }

    #[test]
    fn test_present_converts_to_geo() {
        let located = located();
        assert_abs_diff_eq!(located.geo.latitude, 31.481991 + 10.0 / 111_320.0, epsilon = 1e-12);
        assert!(located.geo.longitude > REFERENCE.longitude);
        assert_eq!(located.used_landmarks, 3);
        assert!(located.geometry.hdop.is_finite());
    }

    #[test]
    fn test_origin_estimate_is_reference() {
        let estimate = PositionEstimate {
            position: PlanarPoint::origin(),
            error_m: 0.0,
            used_landmarks: 3,
        };
        let located = PositionPresenter::new(REFERENCE).present(&estimate, &landmarks());
        assert_eq!(located.geo, REFERENCE);
    }

    #[test]
    fn test_locate_response_shape() {
        let response = LocateResponse::from(&located());
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["used_landmarks"], 3);
        assert_eq!(value["error_m"], 0.126);
        assert!(value.get("latitude").is_some());
    }

    #[test]
    fn test_text_formats() {
        let text = TextFormatter::new(2).format(&located());
        assert!(text.contains("x=10.00 m, y=10.00 m"));
        assert!(text.contains("over 3 landmarks"));

        let compact = TextFormatter::compact(2).format(&located());
        assert!(compact.starts_with("31.4820808,74.30"));
        assert!(compact.ends_with("±0.13m"));
    }

    #[test]
    fn test_json_format_rounds() {
        let json = JsonFormatter::new(1).format(&located());
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["x_m"], 10.0);
        assert_eq!(value["error_m"], 0.1);
        assert_eq!(value["used_landmarks"], 3);

        let pretty = JsonFormatter::pretty(1).format(&located());
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn test_degenerate_geometry_rendering() {
        let mut located = located();
        located.geometry = GeometryAssessor::assess(&located.planar, &[PlanarPoint::new(1.0, 1.0)]);
        let value: serde_json::Value = serde_json::from_str(&JsonFormatter::new(2).format(&located)).unwrap();
        assert!(value["hdop"].is_null());
        assert_eq!(value["geometry"], "degenerate");

        let row = CsvFormatter::new(2).format(&located);
        assert!(row.ends_with(",3,,degenerate"));
    }

    #[test]
    fn test_csv_format() {
        let csv = CsvFormatter::new(2);
        assert_eq!(csv.header().split(',').count(), csv.format(&located()).split(',').count());
        assert!(csv.format(&located()).contains(",10.00,10.00,0.13,3,"));
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Text.to_string(), "text");
    }

    #[test]
    fn test_render_dispatches() {
        let presenter = PositionPresenter::new(REFERENCE).with_precision(3);
        let csv = presenter.render(&located(), OutputFormat::Csv);
        assert_eq!(csv.lines().count(), 2);
        assert!(presenter.render(&located(), OutputFormat::Json).starts_with('{'));
    }
}
