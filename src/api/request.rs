//! Request types for the calculation API.

use serde::{Deserialize, Serialize};

use crate::models::CalculatorInputs;

/// Request body for `POST /calculate/{calculator}`.
///
/// A flat JSON object of form fields. The optional `tax_year` selects the
/// rate tables; every other field is passed to the calculator unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Tax year whose rate tables apply. Defaults to the most recent year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_year: Option<i32>,
    /// The calculator's form fields.
    #[serde(flatten)]
    pub inputs: CalculatorInputs,
}
