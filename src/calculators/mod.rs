//! Per-calculator orchestration.
//!
//! Each calculator reads its raw form fields through an [`InputReader`],
//! sequences the primitives in [`crate::calculation`] against the rate tables
//! in effect, and assembles a breakdown of every intermediate quantity.
//! [`calculate`] wraps them all: it never fails, and a calculator that cannot
//! produce a number yields [`CalculatorOutput::NotComputable`].

mod business_insurance;
mod health_insurance;
mod life_insurance;
mod loan;
mod paycheck;
mod profit_margin;
mod salary;
mod travel_insurance;
mod withholding;

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RateTables;
use crate::error::{EngineError, EngineResult};
use crate::models::{AuditLog, AuditTrace, CalculationResult, CalculatorInputs, InputReader};

pub use business_insurance::{BusinessInsuranceQuote, Industry};
pub use health_insurance::{HealthInsuranceQuote, PlanTier, SubsidySummary};
pub use life_insurance::{HealthRating, LifeInsuranceQuote};
pub use loan::{LoanBreakdown, MAX_TERM_MONTHS};
pub use paycheck::{PayFrequency, PaycheckBreakdown, ProjectedPaycheck};
pub use profit_margin::ProfitMarginBreakdown;
pub use salary::{PeriodEquivalents, SalaryBreakdown, SalaryPeriod};
pub use travel_insurance::{CoverageLevel, Destination, TravelInsuranceQuote};
pub use withholding::{AnnualTaxEstimate, FederalTaxBreakdown};

/// The calculators the engine supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculatorKind {
    /// Take-home pay for one paycheck.
    Paycheck,
    /// Salary converted between pay periods, with an annual tax estimate.
    Salary,
    /// Fixed-payment loan (EMI) with an amortization ledger.
    Loan,
    /// Gross profit, margin and markup.
    ProfitMargin,
    /// Term life insurance premium.
    LifeInsurance,
    /// Health insurance premium with subsidy.
    HealthInsurance,
    /// Single-trip travel insurance premium.
    TravelInsurance,
    /// Small-business liability insurance premium.
    BusinessInsurance,
}

impl CalculatorKind {
    /// Every calculator, in display order.
    pub const ALL: [CalculatorKind; 8] = [
        CalculatorKind::Paycheck,
        CalculatorKind::Salary,
        CalculatorKind::Loan,
        CalculatorKind::ProfitMargin,
        CalculatorKind::LifeInsurance,
        CalculatorKind::HealthInsurance,
        CalculatorKind::TravelInsurance,
        CalculatorKind::BusinessInsurance,
    ];

    /// The snake_case name used in routes and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculatorKind::Paycheck => "paycheck",
            CalculatorKind::Salary => "salary",
            CalculatorKind::Loan => "loan",
            CalculatorKind::ProfitMargin => "profit_margin",
            CalculatorKind::LifeInsurance => "life_insurance",
            CalculatorKind::HealthInsurance => "health_insurance",
            CalculatorKind::TravelInsurance => "travel_insurance",
            CalculatorKind::BusinessInsurance => "business_insurance",
        }
    }
}

impl fmt::Display for CalculatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculatorKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        CalculatorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| EngineError::UnknownCalculator {
                name: s.to_string(),
            })
    }
}

/// A calculator's breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculatorOutput {
    /// See [`PaycheckBreakdown`].
    Paycheck(PaycheckBreakdown),
    /// See [`SalaryBreakdown`].
    Salary(SalaryBreakdown),
    /// See [`LoanBreakdown`].
    Loan(LoanBreakdown),
    /// See [`ProfitMarginBreakdown`].
    ProfitMargin(ProfitMarginBreakdown),
    /// See [`LifeInsuranceQuote`].
    LifeInsurance(LifeInsuranceQuote),
    /// See [`HealthInsuranceQuote`].
    HealthInsurance(HealthInsuranceQuote),
    /// See [`TravelInsuranceQuote`].
    TravelInsurance(TravelInsuranceQuote),
    /// See [`BusinessInsuranceQuote`].
    BusinessInsurance(BusinessInsuranceQuote),
    /// The inputs do not describe something that can be priced or scheduled.
    NotComputable {
        /// What the user should change.
        message: String,
    },
}

/// Warning code for a choice field holding an unrecognized option.
pub const UNKNOWN_OPTION: &str = "UNKNOWN_OPTION";

/// Error returned by a calculator whose inputs cannot produce a number.
pub(crate) fn not_computable(message: impl Into<String>) -> EngineError {
    EngineError::CalculationError {
        message: message.into(),
    }
}

/// Reads a choice field through `parse`. Missing is `default`; unrecognized
/// is `default` with an [`UNKNOWN_OPTION`] warning.
pub(crate) fn read_option<T: fmt::Debug + Copy>(
    reader: &mut InputReader<'_>,
    field: &str,
    default: T,
    parse: fn(&str) -> Option<T>,
) -> T {
    read_option_as(reader, field, default, parse, UNKNOWN_OPTION)
}

/// [`read_option`] with a field-specific warning code.
pub(crate) fn read_option_as<T: fmt::Debug + Copy>(
    reader: &mut InputReader<'_>,
    field: &str,
    default: T,
    parse: fn(&str) -> Option<T>,
    code: &str,
) -> T {
    match reader.choice(field) {
        None => default,
        Some(raw) => parse(&raw).unwrap_or_else(|| {
            reader.warn(code, format!("'{}' is not a valid {}; using {:?}", raw, field, default));
            default
        }),
    }
}

fn run(
    kind: CalculatorKind,
    reader: &mut InputReader<'_>,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> EngineResult<CalculatorOutput> {
    Ok(match kind {
        CalculatorKind::Paycheck => CalculatorOutput::Paycheck(paycheck::calculate(reader, tables, audit)?),
        CalculatorKind::Salary => CalculatorOutput::Salary(salary::calculate(reader, tables, audit)?),
        CalculatorKind::Loan => CalculatorOutput::Loan(loan::calculate(reader, audit)?),
        CalculatorKind::ProfitMargin => {
            CalculatorOutput::ProfitMargin(profit_margin::calculate(reader, audit)?)
        }
        CalculatorKind::LifeInsurance => {
            CalculatorOutput::LifeInsurance(life_insurance::calculate(reader, audit)?)
        }
        CalculatorKind::HealthInsurance => {
            CalculatorOutput::HealthInsurance(health_insurance::calculate(reader, tables, audit)?)
        }
        CalculatorKind::TravelInsurance => {
            CalculatorOutput::TravelInsurance(travel_insurance::calculate(reader, audit)?)
        }
        CalculatorKind::BusinessInsurance => {
            CalculatorOutput::BusinessInsurance(business_insurance::calculate(reader, audit)?)
        }
    })
}

/// Runs one calculator against the given rate tables.
///
/// Never fails: unusable inputs produce [`CalculatorOutput::NotComputable`]
/// and every substituted field is listed in the audit trace warnings.
///
/// # Example
///
/// ```no_run
/// use finance_calc_engine::calculators::{CalculatorKind, CalculatorOutput, calculate};
/// use finance_calc_engine::config::ConfigLoader;
/// use finance_calc_engine::models::CalculatorInputs;
///
/// let loader = ConfigLoader::load("./config/us").unwrap();
/// let inputs = CalculatorInputs::new()
///     .with("principal", "2,500,000")
///     .with("annual_rate", "8.5")
///     .with("term_years", 20);
///
/// let result = calculate(CalculatorKind::Loan, &inputs, loader.latest());
/// if let CalculatorOutput::Loan(loan) = &result.output {
///     println!("Monthly payment: {}", loan.payment);
/// }
/// ```
pub fn calculate(kind: CalculatorKind, inputs: &CalculatorInputs, tables: &RateTables) -> CalculationResult {
    let start_time = Instant::now();
    let calculation_id = Uuid::new_v4();

    let mut reader = InputReader::new(inputs);
    let mut audit = AuditLog::new();

    let output = match run(kind, &mut reader, tables, &mut audit) {
        Ok(output) => output,
        Err(err) => {
            warn!(
                calculation_id = %calculation_id,
                calculator = %kind,
                error = %err,
                "Calculation not computable"
            );
            let message = match err {
                EngineError::CalculationError { message } => message,
                other => other.to_string(),
            };
            CalculatorOutput::NotComputable { message }
        }
    };

    let duration_us = start_time.elapsed().as_micros() as u64;
    info!(
        calculation_id = %calculation_id,
        calculator = %kind,
        tax_year = tables.tax_year,
        fields = inputs.len(),
        duration_us,
        "Calculation completed"
    );

    CalculationResult {
        calculation_id,
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        calculator: kind,
        tax_year: tables.tax_year,
        output,
        audit_trace: AuditTrace {
            steps: audit.into_steps(),
            warnings: reader.into_warnings(),
            duration_us,
        },
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{dec, tables_2024};
    use super::*;
    use crate::models::INPUT_DEFAULTED;
    use proptest::prelude::*;

    const NUMERIC_FIELDS: [&str; 32] = [
        "adults",
        "age",
        "annual_rate",
        "annual_revenue",
        "annual_salary",
        "children",
        "cost",
        "coverage_amount",
        "coverage_limit",
        "days_per_week",
        "employees",
        "hourly_rate",
        "hours_per_week",
        "household_income",
        "household_size",
        "oldest_age",
        "post_tax_deductions",
        "pre_tax_deductions",
        "preview_periods",
        "principal",
        "prior_claims",
        "retirement_percent",
        "revenue",
        "salary_amount",
        "target_margin_percent",
        "term_months",
        "term_years",
        "travelers",
        "trip_cost",
        "trip_days",
        "years_in_business",
        "ytd_gross",
    ];

    const EXTREME_VALUES: [&str; 9] = [
        "1000000000000000",
        "999999999999999.99",
        "7e28",
        "79228162514264337593543950335",
        "0.0000000000000000000000001",
        "1e-28",
        "4294967295",
        "1000000",
        "99.9999999999999999999999999",
    ];

    fn run_every_calculator(inputs: &CalculatorInputs) {
        for kind in CalculatorKind::ALL {
            let result = calculate(kind, inputs, tables_2024());
            assert_eq!(result.calculator, kind);
            serde_json::to_string(&result).unwrap();
        }
    }

    #[test]
    fn test_kind_parses_names() {
        assert_eq!("paycheck".parse::<CalculatorKind>().unwrap(), CalculatorKind::Paycheck);
        assert_eq!(
            "Health-Insurance".parse::<CalculatorKind>().unwrap(),
            CalculatorKind::HealthInsurance
        );
        for kind in CalculatorKind::ALL {
            assert_eq!(kind.as_str().parse::<CalculatorKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_is_error() {
        match "mortgage_refinance".parse::<CalculatorKind>() {
            Err(EngineError::UnknownCalculator { name }) => assert_eq!(name, "mortgage_refinance"),
            other => panic!("Expected UnknownCalculator, got {:?}", other),
        }
    }

    #[test]
    fn test_calculate_records_metadata() {
        let inputs = CalculatorInputs::new()
            .with("principal", "12000")
            .with("annual_rate", "0")
            .with("term_months", 12);
        let result = calculate(CalculatorKind::Loan, &inputs, tables_2024());

        assert_eq!(result.calculator, CalculatorKind::Loan);
        assert_eq!(result.tax_year, 2024);
        assert_eq!(result.engine_version, env!("CARGO_PKG_VERSION"));
        assert!(result.is_computable());
        assert!(!result.audit_trace.steps.is_empty());
        match result.output {
            CalculatorOutput::Loan(loan) => assert_eq!(loan.payment, dec("1000")),
            other => panic!("Expected loan output, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_form_is_not_computable_not_a_panic() {
        let result = calculate(CalculatorKind::Loan, &CalculatorInputs::new(), tables_2024());
        assert!(!result.is_computable());
        assert!(matches!(result.output, CalculatorOutput::NotComputable { .. }));
    }

    #[test]
    fn test_invalid_fields_are_defaulted_with_warning() {
        let inputs = CalculatorInputs::new()
            .with("cost", "abc")
            .with("revenue", "100");
        let result = calculate(CalculatorKind::ProfitMargin, &inputs, tables_2024());

        assert!(result.is_computable());
        assert!(
            result
                .audit_trace
                .warnings
                .iter()
                .any(|w| w.code == INPUT_DEFAULTED && w.message.contains("cost"))
        );
    }

    #[test]
    fn test_every_calculator_survives_an_empty_form() {
        for kind in CalculatorKind::ALL {
            let result = calculate(kind, &CalculatorInputs::new(), tables_2024());
            assert_eq!(result.calculator, kind);
        }
    }

    #[test]
    fn test_result_serializes_with_output_kind_tag() {
        let inputs = CalculatorInputs::new().with("cost", 60).with("revenue", 100);
        let result = calculate(CalculatorKind::ProfitMargin, &inputs, tables_2024());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["calculator"], "profit_margin");
        assert_eq!(json["output"]["kind"], "profit_margin");

        let back: CalculationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_every_calculator_survives_extreme_forms() {
        for value in EXTREME_VALUES {
            let mut inputs = CalculatorInputs::new();
            for field in NUMERIC_FIELDS {
                inputs.insert(field, value);
            }
            run_every_calculator(&inputs);
        }

        let large_over_tiny = CalculatorInputs::new()
            .with("cost", "1000000000000000")
            .with("revenue", "0.0000000000000000000000001")
            .with("salary_amount", "1000000000000000")
            .with("salary_period", "hourly")
            .with("hours_per_week", "1000000000000000")
            .with("days_per_week", "0.0000000000000000000000001")
            .with("hourly_rate", "1000000000000000")
            .with("principal", "1000000000000000")
            .with("annual_rate", "0.0000000000000000000000001")
            .with("term_months", 1200);
        run_every_calculator(&large_over_tiny);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_calculate_never_panics_on_extreme_fields(
            fields in proptest::collection::vec(
                (0..NUMERIC_FIELDS.len(), 0..EXTREME_VALUES.len()),
                1..16,
            ),
        ) {
            let mut inputs = CalculatorInputs::new();
            for (field, value) in fields {
                inputs.insert(NUMERIC_FIELDS[field], EXTREME_VALUES[value]);
            }
            run_every_calculator(&inputs);
        }
    }
}
