//! Error types for the financial calculation engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate.
//! Errors are raised for configuration problems (missing or malformed rate
//! tables) and for lookups the caller asked for explicitly. Invalid numeric
//! input to a calculation is never an error: the primitives return `None`
//! and the calculators report the result as not computable.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for the calculation engine.
///
/// # Example
///
/// ```
/// use finance_calc_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/jurisdiction.yaml".to_string(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "Configuration file not found: /missing/jurisdiction.yaml"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A rate table was structurally invalid (unordered brackets, missing
    /// unbounded bracket, rate out of range and so on).
    #[error("Invalid rate table '{table}': {message}")]
    InvalidTable {
        /// The name of the offending table.
        table: String,
        /// What made the table invalid.
        message: String,
    },

    /// No table set is in effect for the requested tax year.
    #[error("No rate tables in effect for tax year {year}")]
    TaxYearNotFound {
        /// The requested tax year.
        year: i32,
    },

    /// The calculator name did not match any supported calculator.
    #[error("Unknown calculator: {name}")]
    UnknownCalculator {
        /// The name that was requested.
        name: String,
    },

    /// A result with the same identifier has already been stored.
    #[error("Result '{id}' has already been stored")]
    DuplicateResult {
        /// The identifier of the stored result.
        id: Uuid,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    pub(crate) fn invalid_table(table: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidTable {
            table: table.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_not_found_displays_path() {
        let error = EngineError::ConfigNotFound {
            path: "/missing/file.yaml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found: /missing/file.yaml"
        );
    }

    #[test]
    fn test_config_parse_error_displays_path_and_message() {
        let error = EngineError::ConfigParseError {
            path: "/config/bad.yaml".to_string(),
            message: "invalid YAML syntax".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse configuration file '/config/bad.yaml': invalid YAML syntax"
        );
    }

    #[test]
    fn test_invalid_table_displays_table_and_message() {
        let error = EngineError::invalid_table("federal.single", "brackets out of order");
        assert_eq!(
            error.to_string(),
            "Invalid rate table 'federal.single': brackets out of order"
        );
    }

    #[test]
    fn test_tax_year_not_found_displays_year() {
        let error = EngineError::TaxYearNotFound { year: 2019 };
        assert_eq!(error.to_string(), "No rate tables in effect for tax year 2019");
    }

    #[test]
    fn test_unknown_calculator_displays_name() {
        let error = EngineError::UnknownCalculator {
            name: "mortgage_refi".to_string(),
        };
        assert_eq!(error.to_string(), "Unknown calculator: mortgage_refi");
    }

    #[test]
    fn test_duplicate_result_displays_id() {
        let id = Uuid::nil();
        let error = EngineError::DuplicateResult { id };
        assert_eq!(
            error.to_string(),
            "Result '00000000-0000-0000-0000-000000000000' has already been stored"
        );
    }

    #[test]
    fn test_errors_implement_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<EngineError>();
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn returns_unknown_year() -> EngineResult<()> {
            Err(EngineError::TaxYearNotFound { year: 2000 })
        }

        fn propagates_error() -> EngineResult<()> {
            returns_unknown_year()?;
            Ok(())
        }

        assert!(propagates_error().is_err());
    }
}
