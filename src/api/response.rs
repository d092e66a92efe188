//! Response types for the calculation API.
//!
//! This module defines the error body, the mapping from [`EngineError`] to
//! HTTP status codes, and the calculator catalog response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::calculators::CalculatorKind;
use crate::error::EngineError;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }

    /// Creates an unknown calculator error response.
    pub fn unknown_calculator(name: &str) -> Self {
        Self::with_details(
            "UNKNOWN_CALCULATOR",
            format!("Unknown calculator: {}", name),
            format!(
                "Supported calculators: {}",
                CalculatorKind::ALL.map(|kind| kind.as_str()).join(", ")
            ),
        )
    }

    /// Creates a result not found error response.
    pub fn result_not_found(id: &str) -> Self {
        Self::with_details(
            "RESULT_NOT_FOUND",
            format!("Result not found: {}", id),
            "No calculation with this id has been stored",
        )
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Pairs an error body with a status code.
    pub fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::ConfigNotFound { path } => ApiErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration error",
                    format!("Configuration file not found: {}", path),
                ),
            ),
            EngineError::ConfigParseError { path, message } => ApiErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration parse error",
                    format!("Failed to parse {}: {}", path, message),
                ),
            ),
            EngineError::InvalidTable { table, message } => ApiErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details(
                    "CONFIG_ERROR",
                    "Invalid rate table",
                    format!("{}: {}", table, message),
                ),
            ),
            EngineError::TaxYearNotFound { year } => ApiErrorResponse::new(
                StatusCode::BAD_REQUEST,
                ApiError::with_details(
                    "TAX_YEAR_NOT_FOUND",
                    format!("No rate tables in effect for tax year {}", year),
                    "Request a tax year covered by the loaded rate tables, or omit tax_year",
                ),
            ),
            EngineError::UnknownCalculator { name } => {
                ApiErrorResponse::new(StatusCode::NOT_FOUND, ApiError::unknown_calculator(&name))
            }
            EngineError::DuplicateResult { id } => ApiErrorResponse::new(
                StatusCode::CONFLICT,
                ApiError::new("DUPLICATE_RESULT", format!("Result '{}' has already been stored", id)),
            ),
            EngineError::CalculationError { message } => ApiErrorResponse::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CALCULATION_ERROR", "Calculation failed", message),
            ),
        }
    }
}

/// Response body for `GET /calculators`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorCatalog {
    /// Jurisdiction code of the loaded rate tables.
    pub jurisdiction: String,
    /// Tax years with rate tables, ascending.
    pub tax_years: Vec<i32>,
    /// Supported calculators.
    pub calculators: Vec<CalculatorKind>,
}
