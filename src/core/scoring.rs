//! Stress score strategies.
//!
//! The heuristic is the permanent fallback: it is used whenever no model is
//! loaded, and for any single call where the model fails.

use crate::core::model::StressModel;
use crate::core::reading::{clamp_score, BiometricSample, ReadingSource, SCORE_MAX, SCORE_MIN};
use std::sync::Arc;

/// Heart rate at which heart-rate stress starts.
const HR_BASELINE: f64 = 60.0;
/// Heart-rate span mapped onto the full 0-10 range.
const HR_SPAN: f64 = 60.0;
/// HRV at or above which HRV stress is zero.
const HRV_BASELINE: f64 = 60.0;
/// HRV span mapped onto the full 0-10 range.
const HRV_SPAN: f64 = 40.0;
/// Maps EDA 0-1.5 μS onto 0-10.
const EDA_GAIN: f64 = 6.67;

const HR_WEIGHT: f64 = 0.4;
const HRV_WEIGHT: f64 = 0.4;
const EDA_WEIGHT: f64 = 0.2;

/// Weighted heuristic stress score.
pub fn heuristic_score(sample: &BiometricSample) -> f64 {
    let hr_stress = sub_score((sample.heart_rate - HR_BASELINE) / HR_SPAN * 10.0);
    let hrv_stress = sub_score((HRV_BASELINE - sample.heart_rate_variability) / HRV_SPAN * 10.0);
    let eda_stress = sub_score(sample.eda * EDA_GAIN);

    clamp_score(HR_WEIGHT * hr_stress + HRV_WEIGHT * hrv_stress + EDA_WEIGHT * eda_stress)
}

fn sub_score(value: f64) -> f64 {
    value.clamp(SCORE_MIN, SCORE_MAX)
}

/// Outcome of scoring one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    /// Score in `[0, 10]`
    pub score: f64,
    /// Strategy that produced the score
    pub source: ReadingSource,
    /// The model was tried and failed for this call
    pub model_failed: bool,
}

/// Chooses between the model and heuristic strategies.
///
/// Strategy selection happens once, at construction; fallback from a failing
/// model happens per call.
#[derive(Clone, Default)]
pub struct ScoreCalculator {
    model: Option<Arc<dyn StressModel>>,
}

impl ScoreCalculator {
    /// A calculator that always uses the heuristic.
    pub fn heuristic() -> Self {
        Self { model: None }
    }

    pub fn with_model(model: Arc<dyn StressModel>) -> Self {
        Self { model: Some(model) }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn score(&self, sample: &BiometricSample) -> Scored {
        let Some(model) = &self.model else {
            return Scored {
                score: heuristic_score(sample),
                source: ReadingSource::Heuristic,
                model_failed: false,
            };
        };

        match model.predict(&sample.features()) {
            Ok(raw) => Scored {
                score: clamp_score(raw),
                source: ReadingSource::Model,
                model_failed: false,
            },
            Err(e) => {
                tracing::warn!("Model prediction failed, using heuristic: {}", e);
                Scored {
                    score: heuristic_score(sample),
                    source: ReadingSource::Heuristic,
                    model_failed: true,
                }
            }
        }
    }
}

impl std::fmt::Debug for ScoreCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCalculator")
            .field("model", &self.model.is_some())
            .finish()
    }
}
