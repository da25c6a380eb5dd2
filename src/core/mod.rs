//! Core scoring functionality for the stress agent.
//!
//! This module contains:
//! - The immutable `Reading` snapshot and raw `BiometricSample`
//! - Score strategies (trained model, heuristic)
//! - Model artifact loading
//! - Synthetic data generation

pub mod model;
pub mod reading;
pub mod scoring;
pub mod synthetic;

// Re-export commonly used types
pub use model::{DenseModel, FeatureScaler, ModelArtifact, ModelProbe, StressModel};
pub use reading::{BiometricSample, Reading, ReadingSource};
pub use scoring::{heuristic_score, ScoreCalculator, Scored};
pub use synthetic::{synthetic_reading, synthetic_sample};
