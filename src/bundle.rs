use crate::error::PredictError;
use crate::forest::RandomForest;
use crate::scaler::StandardScaler;
use crate::FEATURE_COUNT;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// One prediction: hard label plus positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: u8,
    pub probability: f64,
}

/// The scaler/classifier pair the service runs on.
///
/// Constructed once (by the trainer, or by loading the two artifact files at
/// startup) and shared read-only across requests. There is no reload path;
/// a service that cannot load its bundle must not start.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    scaler: StandardScaler,
    forest: RandomForest,
}

impl ModelBundle {
    pub fn new(scaler: StandardScaler, forest: RandomForest) -> Result<Self> {
        if scaler.n_features() != forest.n_features() {
            bail!(
                "scaler has {} features but forest has {}",
                scaler.n_features(),
                forest.n_features()
            );
        }
        if forest.n_features() != FEATURE_COUNT {
            bail!(
                "bundle expects {} features, artifacts have {}",
                FEATURE_COUNT,
                forest.n_features()
            );
        }
        Ok(Self { scaler, forest })
    }

    /// Deserialize both artifacts. Any failure here is fatal to the caller:
    /// serving without a model is never acceptable.
    pub fn load(model_path: &Path, scaler_path: &Path) -> Result<Self> {
        let scaler_bytes = fs::read(scaler_path)
            .with_context(|| format!("failed to read scaler artifact at {}", scaler_path.display()))?;
        let scaler: StandardScaler = bincode::deserialize(&scaler_bytes)
            .with_context(|| format!("corrupt scaler artifact at {}", scaler_path.display()))?;

        let model_bytes = fs::read(model_path)
            .with_context(|| format!("failed to read model artifact at {}", model_path.display()))?;
        let forest: RandomForest = bincode::deserialize(&model_bytes)
            .with_context(|| format!("corrupt model artifact at {}", model_path.display()))?;

        Self::new(scaler, forest)
    }

    /// Serialize scaler and model to their two separate artifact files.
    pub fn save(&self, model_path: &Path, scaler_path: &Path) -> Result<()> {
        let scaler_bytes = bincode::serialize(&self.scaler).context("failed to encode scaler")?;
        fs::write(scaler_path, scaler_bytes)
            .with_context(|| format!("failed to write scaler artifact at {}", scaler_path.display()))?;

        let model_bytes = bincode::serialize(&self.forest).context("failed to encode model")?;
        fs::write(model_path, model_bytes)
            .with_context(|| format!("failed to write model artifact at {}", model_path.display()))?;
        Ok(())
    }

    /// Scale the validated feature vector and run the classifier.
    ///
    /// The label is derived from the probability, so `label == 1` exactly
    /// when `probability >= 0.5`.
    pub fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<Prediction, PredictError> {
        let scaled = self
            .scaler
            .transform_row(features)
            .map_err(|e| PredictError::Internal(e.to_string()))?;
        let probability = self
            .forest
            .predict_proba(&scaled)
            .map_err(|e| PredictError::Internal(e.to_string()))?
            .clamp(0.0, 1.0);
        let label = u8::from(probability >= 0.5);
        Ok(Prediction { label, probability })
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }
}
