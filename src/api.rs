//! Wire format for readings.
//!
//! Field names and rounding follow what the dashboard client expects:
//! EDA to 2 decimals, temperature and score to 1 decimal.

use crate::core::Reading;
use crate::error::StressError;
use serde::{Deserialize, Serialize};

/// A reading as served on `/reading`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingResponse {
    pub hr: i32,
    pub hrv: i32,
    pub eda: f64,
    pub temp: f64,
    pub score: f64,
    pub timestamp: i64,
    pub source: String,
}

impl ReadingResponse {
    /// Render a reading, refusing values JSON cannot carry.
    pub fn render(reading: &Reading) -> Result<Self, StressError> {
        let finite = [
            ("eda", reading.eda()),
            ("temp", reading.skin_temp()),
            ("score", reading.score()),
        ];
        if let Some((field, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(StressError::InvalidReading { field: *field });
        }

        Ok(Self {
            hr: reading.heart_rate(),
            hrv: reading.heart_rate_variability(),
            eda: round_to(reading.eda(), 2),
            temp: round_to(reading.skin_temp(), 1),
            score: round_to(reading.score(), 1),
            timestamp: reading.timestamp_millis(),
            source: reading.source().to_string(),
        })
    }

    /// The safe default reading served alongside an error.
    pub fn fallback(timestamp: i64) -> Self {
        let reading = Reading::error_fallback(timestamp);
        Self {
            hr: reading.heart_rate(),
            hrv: reading.heart_rate_variability(),
            eda: reading.eda(),
            temp: reading.skin_temp(),
            score: reading.score(),
            timestamp,
            source: reading.source().to_string(),
        }
    }
}

/// Error body for `/reading`: the message plus a safe default reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingErrorResponse {
    pub error: String,
    #[serde(flatten)]
    pub reading: ReadingResponse,
}

/// Response from `/simulate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulateResponse {
    pub success: bool,
    pub data: ReadingResponse,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Values too large to scale already have no fractional digits to round.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if scaled.is_finite() {
        scaled.round() / factor
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BiometricSample, ReadingSource};

    #[test]
    fn test_render_rounds_fields() {
        let sample = BiometricSample::new(0.4567, 81.9, 39.2, 35.06);
        let reading = Reading::from_sample(&sample, 6.349, 1_234, ReadingSource::Model);
        let response = ReadingResponse::render(&reading).unwrap();

        assert_eq!(response.hr, 81);
        assert_eq!(response.hrv, 39);
        assert_eq!(response.eda, 0.46);
        assert_eq!(response.temp, 35.1);
        assert_eq!(response.score, 6.3);
        assert_eq!(response.timestamp, 1_234);
        assert_eq!(response.source, "model");
    }

    #[test]
    fn test_render_rejects_non_finite() {
        let sample = BiometricSample::new(f64::NAN, 80.0, 40.0, 35.0);
        let reading = Reading::from_sample(&sample, 5.0, 0, ReadingSource::Heuristic);
        assert!(matches!(
            ReadingResponse::render(&reading),
            Err(StressError::InvalidReading { field: "eda" })
        ));
    }

    #[test]
    fn test_render_keeps_huge_finite_values() {
        let sample = BiometricSample::new(1e307, 80.0, 40.0, 1e307);
        let reading = Reading::from_sample(&sample, 5.0, 0, ReadingSource::Heuristic);
        let response = ReadingResponse::render(&reading).unwrap();

        assert_eq!(response.eda, 1e307);
        assert_eq!(response.temp, 1e307);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["eda"].as_f64(), Some(1e307));
        assert_eq!(json["temp"].as_f64(), Some(1e307));
    }

    #[test]
    fn test_error_body_is_flat() {
        let body = ReadingErrorResponse {
            error: "boom".to_string(),
            reading: ReadingResponse::fallback(99),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["hr"], 75);
        assert_eq!(json["hrv"], 45);
        assert_eq!(json["eda"], 0.3);
        assert_eq!(json["temp"], 34.5);
        assert_eq!(json["score"], 5.0);
        assert_eq!(json["source"], "error_fallback");
    }
}
