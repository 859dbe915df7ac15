//! Converts a JSON dump of a fitted binary logistic regression into the
//! safetensors classifier artifact loaded by the API server.
//!
//! Input format (as exported from the training notebook):
//!
//! ```json
//! { "coef": [[0.12, -0.4, ...]], "intercept": [-1.7], "classes": [0, 1] }
//! ```
//!
//! When `--features` is given, the coefficient count is checked against the
//! feature list so a stale export cannot be paired with a newer schema.

use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use serde::Deserialize;

use bp_ml::features::FeatureSchema;
use bp_ml::model::LogisticModel;

#[derive(Parser, Debug)]
#[command(name = "bp-convert", about = "Convert a logistic regression export to safetensors")]
struct Args {
    /// JSON file with `coef`, `intercept` and optional `classes`.
    #[arg(short, long)]
    input: PathBuf,

    /// Destination safetensors file.
    #[arg(short, long)]
    output: PathBuf,

    /// Feature list CSV to check the coefficient count against.
    #[arg(short, long)]
    features: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct LogisticExport {
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
    #[serde(default)]
    classes: Option<Vec<i64>>,
}

impl LogisticExport {
    fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let export: LogisticExport = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        export.validate()?;
        Ok(export)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.coef.len() == 1 && self.intercept.len() == 1,
            "expected a binary model (1 coefficient row, 1 intercept), got {} rows and {} intercepts",
            self.coef.len(),
            self.intercept.len()
        );
        ensure!(!self.coef[0].is_empty(), "coefficient row is empty");
        if let Some(classes) = &self.classes {
            ensure!(
                classes.as_slice() == [0, 1],
                "expected classes [0, 1], got {classes:?}"
            );
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    bp_core::logging::init_tracing(false);
    let args = Args::parse();

    let export = LogisticExport::load(&args.input)?;
    let coef = &export.coef[0];

    if let Some(features) = &args.features {
        let schema = FeatureSchema::load_csv(features)?;
        ensure!(
            coef.len() == schema.len(),
            "export has {} coefficients, feature list has {}",
            coef.len(),
            schema.len()
        );
    }

    let model = LogisticModel::from_coefficients(coef, export.intercept[0])?;
    model.save(&args.output)?;

    tracing::info!(
        input = ?args.input,
        output = ?args.output,
        n_features = coef.len(),
        "wrote classifier"
    );
    Ok(())
}
