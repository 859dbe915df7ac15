//! Request-facing inference: feature schema + scaler + classifier.
//!
//! [`BankruptcyPredictor`] is built once at startup from the three trained
//! artifacts and is read-only afterwards, so a single instance can be
//! shared between concurrent requests behind an `Arc`.
//!
//! Each prediction:
//! 1. maps every sanitized request field to its column in the schema,
//! 2. lays the values out in training column order,
//! 3. standardizes the row with the fitted scaler,
//! 4. asks the classifier for the class and P(class 1).

use std::path::Path;

use anyhow::{ensure, Context, Result};
use candle_core::Device;

use crate::features::{FeatureSchema, InputRecord};
use crate::model::LogisticModel;
use crate::normalize::{ShapeError, StandardScaler};

/// Classifier output for one record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class: 0 = not bankrupt, 1 = bankrupt.
    pub class: u8,
    /// Probability of class 1, in [0, 1].
    pub probability: f64,
}

/// Failure inside the prediction pipeline. None of these are caused by the
/// caller once the request has passed validation.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// A request field has no column in the feature schema.
    #[error("field {0:?} is not part of the feature schema")]
    UnknownField(String),
    /// A schema column received no value.
    #[error("no value for feature {0:?}")]
    MissingFeature(String),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// Scaling or the classifier produced an infinite or NaN value.
    #[error("Input contains infinity or a value too large: non-finite {0}")]
    NonFinite(&'static str),
    /// The classifier failed to evaluate the scaled row.
    #[error("classifier failed: {0}")]
    Model(String),
}

impl From<candle_core::Error> for PredictError {
    fn from(e: candle_core::Error) -> Self {
        PredictError::Model(e.to_string())
    }
}

/// Immutable inference state shared by all requests.
pub struct BankruptcyPredictor {
    schema: FeatureSchema,
    scaler: StandardScaler,
    model: LogisticModel,
}

impl BankruptcyPredictor {
    /// Assemble a predictor, checking that all three parts agree on the
    /// number and order of features.
    pub fn new(schema: FeatureSchema, scaler: StandardScaler, model: LogisticModel) -> Result<Self> {
        scaler.check_schema(&schema)?;
        ensure!(
            model.n_features() == schema.len(),
            "classifier expects {} features, feature list has {}",
            model.n_features(),
            schema.len()
        );
        Ok(Self {
            schema,
            scaler,
            model,
        })
    }

    /// Load all artifacts from disk. Any missing or malformed file is fatal.
    pub fn load(features: &Path, scaler: &Path, classifier: &Path) -> Result<Self> {
        let schema = FeatureSchema::load_csv(features)?;
        tracing::info!(path = ?features, n_features = schema.len(), "loaded feature list");

        let scaler_stats = StandardScaler::load(scaler)?;
        tracing::info!(path = ?scaler, "loaded scaler");

        let model = LogisticModel::load(classifier, schema.len(), &Device::Cpu)
            .with_context(|| format!("failed to load classifier {}", classifier.display()))?;
        tracing::info!(path = ?classifier, "loaded classifier");

        Self::new(schema, scaler_stats, model)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Lay out a record's values in schema column order.
    ///
    /// The order of keys in `record` is irrelevant; each value lands at its
    /// field's schema position.
    pub fn ordered_row(&self, record: &InputRecord) -> Result<Vec<f64>, PredictError> {
        let mut row: Vec<Option<f64>> = vec![None; self.schema.len()];
        for (field, value) in record {
            let idx = self
                .schema
                .position(field)
                .ok_or_else(|| PredictError::UnknownField(field.clone()))?;
            row[idx] = Some(*value);
        }
        row.into_iter()
            .enumerate()
            .map(|(idx, v)| {
                v.ok_or_else(|| {
                    PredictError::MissingFeature(self.schema.canonical_names()[idx].clone())
                })
            })
            .collect()
    }

    /// Classify one validated record.
    pub fn predict(&self, record: &InputRecord) -> Result<Prediction, PredictError> {
        tracing::debug!(?record, "received input values");

        let raw = self.ordered_row(record)?;
        tracing::debug!(?raw, "features before scaling");

        let scaled = self.scaler.transform(&raw)?;
        tracing::debug!(?scaled, "scaled features");
        if !scaled.iter().all(|v| v.is_finite()) {
            return Err(PredictError::NonFinite("scaled feature"));
        }

        let x = self.model.row(&scaled)?;
        let logit = first(self.model.decision_function(&x)?)?;
        if !logit.is_finite() {
            return Err(PredictError::NonFinite("logit"));
        }
        let class = first(self.model.predict(&x)?)?;
        let [_, probability] = first(self.model.predict_proba(&x)?)?;
        tracing::debug!(class, probability, "prediction");

        Ok(Prediction { class, probability })
    }
}

fn first<T>(values: Vec<T>) -> Result<T, PredictError> {
    values
        .into_iter()
        .next()
        .ok_or_else(|| PredictError::Model("classifier returned no rows".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predictor() -> BankruptcyPredictor {
        let schema = FeatureSchema::new(["Debt ratio %", "Cash/Total Assets", "Equity to Liability"])
            .unwrap();
        let scaler = StandardScaler {
            feature_names: None,
            mean: vec![0.0, 1.0, 2.0],
            scale: vec![1.0, 2.0, 4.0],
        };
        // Only the third column carries weight, so column placement is observable.
        let model = LogisticModel::from_coefficients(&[0.0, 0.0, 1.0], 0.0).unwrap();
        BankruptcyPredictor::new(schema, scaler, model).unwrap()
    }

    fn record(pairs: &[(&str, f64)]) -> InputRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_ordered_row_follows_schema() {
        let p = predictor();
        let r = record(&[
            ("Equity_to_Liability", 3.0),
            ("Cash_Total_Assets", 2.0),
            ("Debt_ratio_pct", 1.0),
        ]);
        assert_eq!(p.ordered_row(&r).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_predict_uses_scaled_column() {
        let p = predictor();
        // Equity: (6 - 2) / 4 = 1 → σ(1)
        let r = record(&[
            ("Debt_ratio_pct", 0.0),
            ("Cash_Total_Assets", 0.0),
            ("Equity_to_Liability", 6.0),
        ]);
        let out = p.predict(&r).unwrap();
        assert_eq!(out.class, 1);
        assert!((out.probability - 1.0 / (1.0 + (-1.0f64).exp())).abs() < 1e-12);

        // Equity below its mean → negative logit → class 0
        let r = record(&[
            ("Debt_ratio_pct", 0.0),
            ("Cash_Total_Assets", 0.0),
            ("Equity_to_Liability", 0.0),
        ]);
        let out = p.predict(&r).unwrap();
        assert_eq!(out.class, 0);
        assert!(out.probability < 0.5);
    }

    #[test]
    fn test_unknown_field_is_error() {
        let p = predictor();
        let r = record(&[
            ("Debt_ratio_pct", 0.0),
            ("Cash_Total_Assets", 0.0),
            ("Equity to Liability", 1.0),
        ]);
        assert!(matches!(p.predict(&r), Err(PredictError::UnknownField(f)) if f == "Equity to Liability"));
    }

    #[test]
    fn test_missing_feature_is_error() {
        let p = predictor();
        let r = record(&[("Debt_ratio_pct", 0.0), ("Cash_Total_Assets", 0.0)]);
        assert!(matches!(p.predict(&r), Err(PredictError::MissingFeature(f)) if f == "Equity to Liability"));
    }

    #[test]
    fn test_overflowing_scaled_value_is_error() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let scaler = StandardScaler {
            feature_names: None,
            mean: vec![0.0, 0.0],
            scale: vec![0.5, 1.0],
        };
        let model = LogisticModel::from_coefficients(&[1.0, 1.0], 0.0).unwrap();
        let p = BankruptcyPredictor::new(schema, scaler, model).unwrap();
        // 1e308 / 0.5 overflows to +inf.
        let r = record(&[("a", 1e308), ("b", 0.0)]);
        assert!(matches!(p.predict(&r), Err(PredictError::NonFinite("scaled feature"))));
    }

    #[test]
    fn test_opposite_infinities_in_logit_is_error() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let scaler = StandardScaler {
            feature_names: None,
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        };
        // 1e308 * 10 overflows to +inf, 1e308 * -10 to -inf; their sum is NaN.
        let model = LogisticModel::from_coefficients(&[10.0, -10.0], 0.0).unwrap();
        let p = BankruptcyPredictor::new(schema, scaler, model).unwrap();
        let r = record(&[("a", 1e308), ("b", 1e308)]);
        assert!(matches!(p.predict(&r), Err(PredictError::NonFinite("logit"))));
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let schema = FeatureSchema::new(["a", "b"]).unwrap();
        let scaler = StandardScaler {
            feature_names: None,
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        };
        let model = LogisticModel::from_coefficients(&[1.0, 1.0, 1.0], 0.0).unwrap();
        assert!(BankruptcyPredictor::new(schema, scaler, model).is_err());
    }
}
