//! # bp-ml
//!
//! Inference side of the bankruptcy model: the training-time feature
//! schema, the fitted standard scaler, the logistic regression classifier
//! and [`predictor::BankruptcyPredictor`], which chains them for a single
//! request record.

pub mod features;
pub mod model;
pub mod normalize;
pub mod predictor;
