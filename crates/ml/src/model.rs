//! Binary logistic regression classifier backed by a candle linear layer.
//!
//! Architecture: n_features → 1 linear layer, sigmoid on the logit.
//! Weights are stored in safetensors as `linear.weight` `(1, n)` and
//! `linear.bias` `(1)`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Fitted binary classifier: P(bankrupt) = σ(w·x + b).
pub struct LogisticModel {
    linear: Linear,
    n_features: usize,
    device: Device,
}

impl LogisticModel {
    /// Build a model with weights taken from `vb` under the `linear` prefix.
    pub fn new(vb: VarBuilder<'_>, n_features: usize) -> Result<Self> {
        let device = vb.device().clone();
        let linear = linear(n_features, 1, vb.pp("linear"))?;
        Ok(Self {
            linear,
            n_features,
            device,
        })
    }

    /// Build a model from explicit coefficients (one per feature) and intercept.
    pub fn from_coefficients(coef: &[f64], intercept: f64) -> Result<Self> {
        let device = Device::Cpu;
        let weight = Tensor::from_slice(coef, (1, coef.len()), &device)?;
        let bias = Tensor::new(&[intercept], &device)?;
        Ok(Self {
            linear: Linear::new(weight, Some(bias)),
            n_features: coef.len(),
            device,
        })
    }

    /// Load a fitted model from a safetensors file.
    ///
    /// Fails if the stored weight shape is not `(1, n_features)`.
    pub fn load(path: &Path, n_features: usize, device: &Device) -> Result<Self> {
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[path], DType::F64, device)? };
        Self::new(vb, n_features)
            .with_context(|| format!("classifier {} does not match {n_features} features", path.display()))
    }

    /// Save weights to a safetensors file readable by [`load`](Self::load).
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut tensors = HashMap::new();
        tensors.insert("linear.weight".to_string(), self.linear.weight().clone());
        if let Some(bias) = self.linear.bias() {
            tensors.insert("linear.bias".to_string(), bias.clone());
        }
        candle_core::safetensors::save(&tensors, path)?;
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Wrap one feature row as a `(1, n_features)` tensor on the model's device.
    pub fn row(&self, values: &[f64]) -> candle_core::Result<Tensor> {
        Tensor::from_slice(values, (1, values.len()), &self.device)
    }

    /// Raw logits `w·x + b`, one per input row.
    pub fn decision_function(&self, x: &Tensor) -> candle_core::Result<Vec<f64>> {
        let x = x.to_dtype(DType::F64)?;
        let logits = self.linear.forward(&x)?;
        logits.flatten_all()?.to_vec1::<f64>()
    }

    /// Class probabilities `[P(0), P(1)]` per input row.
    pub fn predict_proba(&self, x: &Tensor) -> candle_core::Result<Vec<[f64; 2]>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|z| {
                let p = sigmoid(z);
                [1.0 - p, p]
            })
            .collect())
    }

    /// Predicted class per input row; a logit of exactly zero maps to class 0.
    pub fn predict(&self, x: &Tensor) -> candle_core::Result<Vec<u8>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|z| u8::from(z > 0.0))
            .collect())
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    #[test]
    fn test_sigmoid_extremes() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn test_known_coefficients() {
        let model = LogisticModel::from_coefficients(&[2.0, -1.0], 0.5).unwrap();
        let x = model.row(&[1.0, 1.0]).unwrap();
        // z = 2 - 1 + 0.5 = 1.5
        let z = model.decision_function(&x).unwrap();
        assert!((z[0] - 1.5).abs() < 1e-12);

        let proba = model.predict_proba(&x).unwrap();
        let expected = 1.0 / (1.0 + (-1.5f64).exp());
        assert!((proba[0][1] - expected).abs() < 1e-12);
        assert!((proba[0][0] + proba[0][1] - 1.0).abs() < 1e-12);
        assert_eq!(model.predict(&x).unwrap(), vec![1]);
    }

    #[test]
    fn test_zero_logit_is_class_zero() {
        let model = LogisticModel::from_coefficients(&[1.0], 0.0).unwrap();
        let x = model.row(&[0.0]).unwrap();
        assert_eq!(model.predict(&x).unwrap(), vec![0]);
        assert_eq!(model.predict_proba(&x).unwrap()[0], [0.5, 0.5]);
    }

    #[test]
    fn test_batch_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, &device);
        let model = LogisticModel::new(vb, 4).unwrap();

        let batch = Tensor::zeros((16, 4), DType::F64, &device).unwrap();
        assert_eq!(model.predict_proba(&batch).unwrap().len(), 16);
        assert_eq!(model.predict(&batch).unwrap().len(), 16);
    }

    #[test]
    fn test_output_range() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F64, &device);
        let model = LogisticModel::new(vb, 3).unwrap();

        for val in [-100.0, -1.0, 0.0, 1.0, 100.0] {
            let x = model.row(&[val; 3]).unwrap();
            let p = model.predict_proba(&x).unwrap()[0][1];
            assert!((0.0..=1.0).contains(&p), "val={val}, prob={p} out of range");
        }
    }

    #[test]
    fn test_save_and_load() {
        let model = LogisticModel::from_coefficients(&[0.3, -0.7, 1.1], -0.2).unwrap();
        let x = model.row(&[0.1, 0.2, 0.3]).unwrap();
        let before = model.predict_proba(&x).unwrap();

        let tmp = tempfile::Builder::new()
            .suffix(".safetensors")
            .tempfile()
            .unwrap();
        model.save(tmp.path()).unwrap();

        let loaded = LogisticModel::load(tmp.path(), 3, &Device::Cpu).unwrap();
        let after = loaded.predict_proba(&x).unwrap();
        assert!((before[0][1] - after[0][1]).abs() < 1e-12);
    }

    #[test]
    fn test_load_wrong_width() {
        let model = LogisticModel::from_coefficients(&[0.3, -0.7, 1.1], -0.2).unwrap();
        let tmp = tempfile::Builder::new()
            .suffix(".safetensors")
            .tempfile()
            .unwrap();
        model.save(tmp.path()).unwrap();

        assert!(LogisticModel::load(tmp.path(), 15, &Device::Cpu).is_err());
    }
}
