//! Feature schema: canonical feature names and their request-field aliases.
//!
//! The canonical names come from the feature-selection step of training and
//! may contain spaces and punctuation (`"Debt ratio %"`). The HTTP API
//! addresses each feature by a sanitized, identifier-safe alias
//! (`"Debt_ratio_pct"`). Both forms are fixed when the schema is built and
//! never change afterwards.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// A validated request record keyed by sanitized feature name.
pub type InputRecord = BTreeMap<String, f64>;

/// Substitutions applied in order by [`sanitize`]. An empty replacement
/// strips the pattern.
///
/// The yen sign is listed twice: once as it appears in a UTF-8 file and
/// once as the `Â¥` mojibake produced when that file is decoded as Latin-1.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    (" ", "_"),
    ("%", "pct"),
    ("/", "_"),
    ("(", ""),
    (")", ""),
    ("\u{c2}\u{a5}", ""),
    ("\u{a5}", ""),
    ("-", "_"),
];

/// Turn a canonical feature name into its API field name.
pub fn sanitize(canonical: &str) -> String {
    SUBSTITUTIONS
        .iter()
        .fold(canonical.to_string(), |name, (from, to)| name.replace(from, to))
}

/// Ordered canonical feature names plus the sanitized → canonical mapping.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    canonical: Vec<String>,
    sanitized: Vec<String>,
    by_sanitized: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct FeatureRow {
    #[serde(rename = "Feature")]
    feature: String,
}

impl FeatureSchema {
    /// Build a schema from canonical names in training order.
    ///
    /// Fails if the list is empty, contains a blank name, or if two names
    /// sanitize to the same field name.
    pub fn new<I, S>(canonical: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical: Vec<String> = canonical.into_iter().map(Into::into).collect();
        if canonical.is_empty() {
            bail!("feature list is empty");
        }

        let mut sanitized = Vec::with_capacity(canonical.len());
        let mut by_sanitized = HashMap::with_capacity(canonical.len());
        for (idx, name) in canonical.iter().enumerate() {
            if name.trim().is_empty() {
                bail!("feature #{idx} has a blank name");
            }
            let field = sanitize(name);
            if let Some(prev) = by_sanitized.insert(field.clone(), idx) {
                bail!(
                    "features {:?} and {:?} both sanitize to {field:?}",
                    canonical[prev],
                    name
                );
            }
            sanitized.push(field);
        }

        Ok(Self {
            canonical,
            sanitized,
            by_sanitized,
        })
    }

    /// Load canonical names from the `Feature` column of a CSV file.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open feature list {}", path.display()))?;
        let names = reader
            .deserialize::<FeatureRow>()
            .map(|row| row.map(|r| r.feature))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to parse feature list {}", path.display()))?;
        Self::new(names)
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Canonical names in training order.
    pub fn canonical_names(&self) -> &[String] {
        &self.canonical
    }

    /// Sanitized names, index-aligned with [`canonical_names`](Self::canonical_names).
    pub fn sanitized_names(&self) -> &[String] {
        &self.sanitized
    }

    /// Column index of a sanitized field name.
    pub fn position(&self, sanitized: &str) -> Option<usize> {
        self.by_sanitized.get(sanitized).copied()
    }

    /// Canonical name for a sanitized field name.
    pub fn canonical(&self, sanitized: &str) -> Option<&str> {
        self.position(sanitized).map(|i| self.canonical[i].as_str())
    }
}
