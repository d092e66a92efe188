//! Raw calculator inputs and their normalization into validated values.
//!
//! Calculators are driven by flat form records. A missing, unparseable,
//! negative or non-finite numeric field never fails a calculation: it is
//! read as zero and the substitution is recorded as an [`AuditWarning`].

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::calculation_result::AuditWarning;
use super::money::{Money, Rate};

/// Warning code recorded when a field falls back to its default.
pub const INPUT_DEFAULTED: &str = "INPUT_DEFAULTED";

/// Largest amount a form field may hold: one quadrillion.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

/// Largest whole-number count a form field may hold.
pub const MAX_COUNT: u32 = 1_000_000;

/// A single raw form value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    /// A boolean toggle.
    Flag(bool),
    /// A JSON number, kept in its textual form until normalized.
    Number(serde_json::Number),
    /// Free text, which may itself hold a number such as `"75,000"`.
    Text(String),
    /// An explicit `null`.
    Empty(()),
}

impl From<bool> for InputValue {
    fn from(value: bool) -> Self {
        InputValue::Flag(value)
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::Text(value.to_string())
    }
}

impl From<i64> for InputValue {
    fn from(value: i64) -> Self {
        InputValue::Number(value.into())
    }
}

impl From<i32> for InputValue {
    fn from(value: i32) -> Self {
        InputValue::Number(value.into())
    }
}

impl From<u32> for InputValue {
    fn from(value: u32) -> Self {
        InputValue::Number(value.into())
    }
}

impl From<Decimal> for InputValue {
    fn from(value: Decimal) -> Self {
        InputValue::Text(value.to_string())
    }
}

/// The flat record of named fields submitted to a calculator.
///
/// # Example
///
/// ```
/// use finance_calc_engine::models::CalculatorInputs;
///
/// let inputs = CalculatorInputs::new()
///     .with("annual_salary", 75000)
///     .with("state", "CA")
///     .with("smoker", false);
/// assert_eq!(inputs.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculatorInputs(BTreeMap<String, InputValue>);

impl CalculatorInputs {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record with `field` set to `value`.
    pub fn with(mut self, field: &str, value: impl Into<InputValue>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// Sets `field` to `value`.
    pub fn insert(&mut self, field: &str, value: impl Into<InputValue>) {
        self.0.insert(field.to_string(), value.into());
    }

    /// Returns the raw value of a field.
    pub fn get(&self, field: &str) -> Option<&InputValue> {
        self.0.get(field)
    }

    /// Number of fields in the record.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of parsing one raw field as a number.
enum Parsed {
    Missing,
    Invalid,
    Value(Decimal),
}

fn parse_number_text(text: &str) -> Parsed {
    let cleaned: String = text
        .trim()
        .trim_start_matches('$')
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',' && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return Parsed::Missing;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_or(Parsed::Invalid, Parsed::Value)
}

fn parse_number(value: Option<&InputValue>) -> Parsed {
    match value {
        None | Some(InputValue::Empty(())) => Parsed::Missing,
        Some(InputValue::Number(n)) => parse_number_text(&n.to_string()),
        Some(InputValue::Text(text)) => parse_number_text(text),
        Some(InputValue::Flag(_)) => Parsed::Invalid,
    }
}

/// Reads raw fields into validated values, collecting a warning for every
/// substitution it makes.
#[derive(Debug)]
pub struct InputReader<'a> {
    inputs: &'a CalculatorInputs,
    warnings: Vec<AuditWarning>,
}

impl<'a> InputReader<'a> {
    /// Creates a reader over a raw record.
    pub fn new(inputs: &'a CalculatorInputs) -> Self {
        Self {
            inputs,
            warnings: Vec::new(),
        }
    }

    fn defaulted(&mut self, field: &str, reason: &str) {
        debug!(field, reason, "input defaulted to zero");
        self.warnings.push(AuditWarning {
            code: INPUT_DEFAULTED.to_string(),
            message: format!("Field '{}' {}; using 0", field, reason),
            severity: "low".to_string(),
        });
    }

    /// Returns true when the field is present and not empty.
    pub fn is_present(&self, field: &str) -> bool {
        match self.inputs.get(field) {
            None | Some(InputValue::Empty(())) => false,
            Some(InputValue::Text(text)) => !text.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// Reads a non-negative amount no larger than [`MAX_AMOUNT`]. Missing
    /// fields are silently zero.
    pub fn money(&mut self, field: &str) -> Money {
        match parse_number(self.inputs.get(field)) {
            Parsed::Missing => Decimal::ZERO,
            Parsed::Invalid => {
                self.defaulted(field, "is not a number");
                Decimal::ZERO
            }
            Parsed::Value(value) if value.is_sign_negative() && !value.is_zero() => {
                self.defaulted(field, "is negative");
                Decimal::ZERO
            }
            Parsed::Value(value) if value > MAX_AMOUNT => {
                self.defaulted(field, "exceeds the largest accepted amount");
                Decimal::ZERO
            }
            Parsed::Value(value) => value,
        }
    }

    /// Reads a non-negative percentage and returns it as a fraction.
    pub fn percent(&mut self, field: &str) -> Rate {
        self.money(field) / Decimal::ONE_HUNDRED
    }

    /// Reads a non-negative whole number no larger than [`MAX_COUNT`],
    /// truncating any fraction.
    pub fn count(&mut self, field: &str) -> u32 {
        let value = self.money(field).trunc();
        match value.to_u32().filter(|count| *count <= MAX_COUNT) {
            Some(count) => count,
            None => {
                self.defaulted(field, "is out of range");
                0
            }
        }
    }

    /// Reads a boolean toggle. Accepts booleans, non-zero numbers and the
    /// usual form spellings (`"yes"`, `"on"`, `"true"`, `"1"`).
    pub fn flag(&mut self, field: &str) -> bool {
        match self.inputs.get(field) {
            Some(InputValue::Flag(value)) => *value,
            Some(InputValue::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(InputValue::Text(text)) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "yes" | "on" | "1" | "y"
            ),
            None | Some(InputValue::Empty(())) => false,
        }
    }

    /// Reads a text choice, trimmed and lower-cased. Empty text is `None`.
    pub fn choice(&mut self, field: &str) -> Option<String> {
        match self.inputs.get(field) {
            Some(InputValue::Text(text)) if !text.trim().is_empty() => {
                Some(text.trim().to_ascii_lowercase())
            }
            Some(InputValue::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Records a warning that did not come from a numeric substitution.
    pub fn warn(&mut self, code: &str, message: impl Into<String>) {
        self.warnings.push(AuditWarning {
            code: code.to_string(),
            message: message.into(),
            severity: "medium".to_string(),
        });
    }

    /// Consumes the reader, returning the collected warnings.
    pub fn into_warnings(self) -> Vec<AuditWarning> {
        self.warnings
    }
}
