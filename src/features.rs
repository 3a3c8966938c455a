//! Inbound feature schema for water samples.
//!
//! A prediction request must carry all nine measurements as finite numbers.
//! Validation happens before anything touches the predictor, with
//! field-level detail in every rejection. Fields are checked in declaration
//! order, so the first violation reported is deterministic. Unknown extra
//! fields are ignored.

use crate::error::{GatewayError, Result};
use serde_json::Value;

/// The nine required measurement fields, in canonical order.
///
/// Predictor weights are aligned with this order.
pub const FEATURE_FIELDS: [&str; 9] = [
    "ph",
    "Hardness",
    "Solids",
    "Chloramines",
    "Sulfate",
    "Conductivity",
    "Organic_carbon",
    "Trihalomethanes",
    "Turbidity",
];

/// A validated water sample: one finite value per feature field.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FEATURE_FIELDS.len()],
}

impl FeatureRecord {
    /// Validate a raw JSON body into a feature record.
    ///
    /// Rejects non-object bodies, missing fields, non-numeric values, and
    /// non-finite numbers, naming the offending field.
    pub fn from_json(raw: &Value) -> Result<Self> {
        let object = raw.as_object().ok_or_else(|| GatewayError::Validation {
            field: "body".to_string(),
            reason: "Expected a JSON object".to_string(),
        })?;

        let mut values = [0.0; FEATURE_FIELDS.len()];
        for (i, field) in FEATURE_FIELDS.iter().enumerate() {
            let value = object.get(*field).ok_or_else(|| GatewayError::Validation {
                field: field.to_string(),
                reason: "Missing required field".to_string(),
            })?;

            let number = value.as_f64().ok_or_else(|| GatewayError::Validation {
                field: field.to_string(),
                reason: format!("Expected a number, got {}", json_type_name(value)),
            })?;

            if !number.is_finite() {
                return Err(GatewayError::Validation {
                    field: field.to_string(),
                    reason: "Value must be a finite number".to_string(),
                });
            }

            values[i] = number;
        }

        Ok(Self { values })
    }

    /// Construct directly from values in [`FEATURE_FIELDS`] order.
    pub fn from_values(values: [f64; FEATURE_FIELDS.len()]) -> Self {
        Self { values }
    }

    /// Values in [`FEATURE_FIELDS`] order.
    pub fn values(&self) -> &[f64; FEATURE_FIELDS.len()] {
        &self.values
    }

    /// Look up a single field by name.
    pub fn get(&self, field: &str) -> Option<f64> {
        FEATURE_FIELDS
            .iter()
            .position(|f| *f == field)
            .map(|i| self.values[i])
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
