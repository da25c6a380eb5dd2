//! Trained-model artifacts.
//!
//! A model is a small dense regression network stored as JSON, paired with a
//! standard feature scaler. Both are produced offline by the training
//! pipeline; this module only loads and evaluates them.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of input features: `[eda, hr, hrv, temp]`.
pub const FEATURE_COUNT: usize = 4;

/// Anything that can turn a raw feature vector into a raw stress score.
pub trait StressModel: Send + Sync {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError>;
}

/// Standard scaler: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl FeatureScaler {
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        if self.mean.len() != features.len() || self.scale.len() != features.len() {
            return Err(ModelError::Shape(format!(
                "scaler expects {} features (scale {}), got {}",
                self.mean.len(),
                self.scale.len(),
                features.len()
            )));
        }

        let scaled: Vec<f64> = features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // Constant features were fitted with zero variance
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect();

        if scaled.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFinite("scaler"));
        }
        Ok(scaled)
    }
}

/// Activation applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    #[default]
    Linear,
}

impl Activation {
    fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Linear => x,
        }
    }
}

/// One fully connected layer; `weights` is `[outputs][inputs]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn forward(&self, input: &[f64]) -> Result<Vec<f64>, ModelError> {
        if self.weights.len() != self.bias.len() {
            return Err(ModelError::Shape(format!(
                "layer has {} weight rows but {} biases",
                self.weights.len(),
                self.bias.len()
            )));
        }

        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                if row.len() != input.len() {
                    return Err(ModelError::Shape(format!(
                        "weight row has {} inputs, layer received {}",
                        row.len(),
                        input.len()
                    )));
                }
                let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum();
                Ok(self.activation.apply(sum + bias))
            })
            .collect()
    }
}

/// Dense regression network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseModel {
    pub layers: Vec<DenseLayer>,
}

impl DenseModel {
    fn evaluate(&self, input: &[f64]) -> Result<f64, ModelError> {
        if self.layers.is_empty() {
            return Err(ModelError::Shape("model has no layers".to_string()));
        }

        let mut activations = input.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations)?;
        }

        match activations.as_slice() {
            [output] if output.is_finite() => Ok(*output),
            [_] => Err(ModelError::NonFinite("model output")),
            other => Err(ModelError::Shape(format!(
                "model produced {} outputs, expected 1",
                other.len()
            ))),
        }
    }
}

/// A loaded model together with its feature scaler.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    scaler: FeatureScaler,
    model: DenseModel,
}

impl ModelArtifact {
    pub fn new(scaler: FeatureScaler, model: DenseModel) -> Self {
        Self { scaler, model }
    }

    /// Load the model and scaler artifacts from disk.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self, ModelError> {
        let model: DenseModel = read_json(model_path)?;
        let scaler: FeatureScaler = read_json(scaler_path)?;
        Ok(Self::new(scaler, model))
    }
}

impl StressModel for ModelArtifact {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, ModelError> {
        let scaled = self.scaler.transform(features)?;
        self.model.evaluate(&scaled)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Result of probing for model artifacts at startup.
#[derive(Debug, Clone)]
pub struct ModelProbe {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    /// Both artifact files are present
    pub available: bool,
}

impl ModelProbe {
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>) -> Self {
        let model_path = model_path.into();
        let scaler_path = scaler_path.into();
        let available = model_path.exists() && scaler_path.exists();
        Self {
            model_path,
            scaler_path,
            available,
        }
    }

    /// Load the artifacts if they are present. Failures are logged, never fatal.
    pub fn load(&self) -> Option<ModelArtifact> {
        if !self.available {
            tracing::info!(
                model = ?self.model_path,
                scaler = ?self.scaler_path,
                "Model artifacts not found, using heuristic scoring"
            );
            return None;
        }

        match ModelArtifact::load(&self.model_path, &self.scaler_path) {
            Ok(artifact) => {
                tracing::info!(model = ?self.model_path, "Model and scaler loaded");
                Some(artifact)
            }
            Err(e) => {
                tracing::error!("Failed to load model artifacts: {}", e);
                None
            }
        }
    }
}
