//! Request validation for `POST /predict`.
//!
//! The accepted record is fixed: fifteen named financial ratios, every one
//! required, no extra keys. Values may be JSON numbers or numeric strings.
//! Each field carries optional inclusive bounds; `Debt_ratio_pct` is pinned
//! to exactly zero (`ge = 0`, `le = 0`).
//!
//! Validation reports every failing field at once rather than stopping at
//! the first.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use bp_ml::features::{FeatureSchema, InputRecord};

/// Accepted request field with its inclusive bounds.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub ge: Option<f64>,
    pub le: Option<f64>,
    pub description: &'static str,
}

const fn non_negative(name: &'static str, description: &'static str) -> FieldRule {
    FieldRule {
        name,
        ge: Some(0.0),
        le: None,
        description,
    }
}

const fn unbounded(name: &'static str, description: &'static str) -> FieldRule {
    FieldRule {
        name,
        ge: None,
        le: None,
        description,
    }
}

/// Every field of the request body, in documentation order.
pub const FIELDS: [FieldRule; 15] = [
    non_negative("Equity_to_Liability", "Ratio of equity to liability"),
    FieldRule {
        name: "Debt_ratio_pct",
        ge: Some(0.0),
        le: Some(0.0),
        description: "Debt ratio as a percentage",
    },
    unbounded(
        "Per_Share_Net_profit_before_tax_Yuan_",
        "Per share net profit before tax in Yuan",
    ),
    non_negative("Accounts_Receivable_Turnover", "Turnover ratio of accounts receivable"),
    non_negative("Total_debt_Total_net_worth", "Total debt to total net worth ratio"),
    non_negative("Cash_Flow_to_Liability", "Cash flow to liability ratio"),
    non_negative("Operating_Profit_Rate", "Operating profit rate"),
    non_negative("Net_Income_to_Total_Assets", "Net income to total assets ratio"),
    non_negative("Cash_Total_Assets", "Cash to total assets ratio"),
    non_negative(
        "Inventory_and_accounts_receivable_Net_value",
        "Ratio of inventory and accounts receivable to net value",
    ),
    non_negative("Contingent_liabilities_Net_worth", "Contingent liabilities to net worth ratio"),
    non_negative("Operating_profit_Paid_in_capital", "Operating profit to paid-in capital ratio"),
    unbounded(
        "Non_industry_income_and_expenditure_revenue",
        "Non-industry income and expenditure as a ratio of revenue",
    ),
    non_negative(
        "Current_Liability_to_Liability",
        "Current liability to total liability ratio",
    ),
    non_negative("Current_Liability_to_Equity", "Current liability to equity ratio"),
];

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    /// Location of the offending value, e.g. `["body", "Debt_ratio_pct"]`.
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl FieldIssue {
    fn new(field: &str, kind: &'static str, msg: impl Into<String>) -> Self {
        Self {
            loc: vec!["body".to_string(), field.to_string()],
            msg: msg.into(),
            kind,
        }
    }

    pub fn field(&self) -> &str {
        self.loc.last().map(String::as_str).unwrap_or_default()
    }
}

/// All issues found in a rejected request body.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors {
    pub issues: Vec<FieldIssue>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {}: {}", issue.field(), issue.msg)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a decoded JSON object into an [`InputRecord`].
pub fn validate(body: &Map<String, Value>) -> Result<InputRecord, ValidationErrors> {
    let mut record = InputRecord::new();
    let mut issues = Vec::new();

    for rule in &FIELDS {
        let Some(raw) = body.get(rule.name) else {
            issues.push(FieldIssue::new(rule.name, "missing", "Field required"));
            continue;
        };
        match check_field(rule, raw) {
            Ok(v) => {
                record.insert(rule.name.to_string(), v);
            }
            Err(issue) => issues.push(issue),
        }
    }

    for key in body.keys() {
        if !FIELDS.iter().any(|rule| rule.name == key) {
            issues.push(FieldIssue::new(
                key,
                "extra_forbidden",
                "Extra inputs are not permitted",
            ));
        }
    }

    if issues.is_empty() {
        Ok(record)
    } else {
        Err(ValidationErrors { issues })
    }
}

fn check_field(rule: &FieldRule, raw: &Value) -> Result<f64, FieldIssue> {
    let value = parse_float(raw).ok_or_else(|| {
        FieldIssue::new(
            rule.name,
            "float_parsing",
            "Input should be a valid number",
        )
    })?;
    if !value.is_finite() {
        return Err(FieldIssue::new(
            rule.name,
            "finite_number",
            "Input should be a finite number",
        ));
    }
    if let Some(ge) = rule.ge {
        if value < ge {
            return Err(FieldIssue::new(
                rule.name,
                "greater_than_equal",
                format!("Input should be greater than or equal to {ge}"),
            ));
        }
    }
    if let Some(le) = rule.le {
        if value > le {
            return Err(FieldIssue::new(
                rule.name,
                "less_than_equal",
                format!("Input should be less than or equal to {le}"),
            ));
        }
    }
    Ok(value)
}

fn parse_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Differences between the accepted request fields and the loaded schema.
///
/// An empty result means every request field maps onto exactly one schema
/// column and vice versa.
pub fn schema_drift(schema: &FeatureSchema) -> Vec<String> {
    let mut drift = Vec::new();
    for rule in &FIELDS {
        if schema.position(rule.name).is_none() {
            drift.push(format!("request field {:?} has no feature column", rule.name));
        }
    }
    for (sanitized, canonical) in schema.sanitized_names().iter().zip(schema.canonical_names()) {
        if !FIELDS.iter().any(|rule| rule.name == sanitized) {
            drift.push(format!(
                "feature {canonical:?} ({sanitized}) is not accepted by the request validator"
            ));
        }
    }
    drift
}
