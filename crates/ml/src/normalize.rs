use std::path::Path;

use anyhow::{bail, ensure, Context};

use crate::features::FeatureSchema;

/// Standardization statistics fitted on the training set.
///
/// Loaded from a JSON file produced alongside the classifier. Inference
/// must apply the exact transform used during training.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StandardScaler {
    /// Column names seen at fit time, if the training frame had them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Load scaler statistics from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scaler {}", path.display()))?;
        let scaler: StandardScaler = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse scaler {}", path.display()))?;
        ensure!(
            scaler.mean.len() == scaler.scale.len(),
            "scaler mean has {} elements but scale has {}",
            scaler.mean.len(),
            scaler.scale.len()
        );
        Ok(scaler)
    }

    /// Save scaler statistics to a JSON file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Check that the scaler was fit on exactly the schema's columns, in
    /// the schema's order.
    pub fn check_schema(&self, schema: &FeatureSchema) -> anyhow::Result<()> {
        ensure!(
            self.n_features() == schema.len(),
            "scaler expects {} features, feature list has {}",
            self.n_features(),
            schema.len()
        );
        if let Some(names) = &self.feature_names {
            if names.as_slice() != schema.canonical_names() {
                bail!(
                    "scaler was fit on columns {:?}, feature list is {:?}",
                    names,
                    schema.canonical_names()
                );
            }
        }
        Ok(())
    }

    /// Standardize one row: `(x - mean) / scale`.
    ///
    /// A zero scale marks a constant training column and is treated as 1.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ShapeError> {
        if row.len() != self.n_features() {
            return Err(ShapeError {
                expected: self.n_features(),
                got: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                let scale = if *scale == 0.0 { 1.0 } else { *scale };
                (x - mean) / scale
            })
            .collect())
    }
}

/// Row width does not match the fitted width.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("X has {got} features, but the scaler is expecting {expected} features as input")]
pub struct ShapeError {
    pub expected: usize,
    pub got: usize,
}
