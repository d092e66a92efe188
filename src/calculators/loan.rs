//! Loan (EMI) calculator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{AmortizationEntry, YearSummary, amortize};
use crate::error::EngineResult;
use crate::models::{AuditLog, InputReader, Money, Rate, round_money, round_rate};

use super::not_computable;

/// Longest term accepted, in months.
pub const MAX_TERM_MONTHS: u32 = 1200;

const DEFAULT_PREVIEW_PERIODS: u32 = 12;
const MONTHS_PER_YEAR: u32 = 12;

/// The loan breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanBreakdown {
    /// Amount borrowed.
    pub principal: Money,
    /// Annual interest rate as a fraction.
    pub annual_rate: Rate,
    /// Monthly interest rate.
    pub periodic_rate: Rate,
    /// Number of monthly payments.
    pub term_months: u32,
    /// The level monthly payment (EMI).
    pub payment: Money,
    /// Payment times the number of payments.
    pub total_paid: Money,
    /// Total paid less the principal.
    pub total_interest: Money,
    /// The first rows of the ledger.
    pub preview: Vec<AmortizationEntry>,
    /// Principal and interest per year of the loan.
    pub yearly_summary: Vec<YearSummary>,
}

fn read_term(reader: &mut InputReader<'_>) -> u32 {
    if reader.is_present("term_months") {
        reader.count("term_months")
    } else {
        reader.count("term_years").saturating_mul(MONTHS_PER_YEAR)
    }
}

fn rounded_entry(entry: AmortizationEntry) -> AmortizationEntry {
    AmortizationEntry {
        payment: round_money(entry.payment),
        principal_portion: round_money(entry.principal_portion),
        interest_portion: round_money(entry.interest_portion),
        remaining_balance: round_money(entry.remaining_balance),
        ..entry
    }
}

pub(crate) fn calculate(reader: &mut InputReader<'_>, audit: &mut AuditLog) -> EngineResult<LoanBreakdown> {
    let principal = reader.money("principal");
    let annual_rate = reader.percent("annual_rate");
    let term_months = read_term(reader);
    let preview_periods = if reader.is_present("preview_periods") {
        reader.count("preview_periods")
    } else {
        DEFAULT_PREVIEW_PERIODS
    };

    if term_months > MAX_TERM_MONTHS {
        return Err(not_computable(format!(
            "Loan terms longer than {} months are not supported",
            MAX_TERM_MONTHS
        )));
    }

    let periodic_rate = annual_rate / Decimal::from(MONTHS_PER_YEAR);
    let schedule = amortize(principal, periodic_rate, term_months).ok_or_else(|| {
        not_computable("Enter a principal above zero and a term of at least one month")
    })?;

    audit.record(
        "loan_payment",
        "Level Loan Payment",
        "P * r * (1 + r)^n / ((1 + r)^n - 1)",
        serde_json::json!({
            "principal": principal,
            "periodic_rate": round_rate(periodic_rate),
            "number_of_periods": term_months,
        }),
        serde_json::json!({
            "payment": round_money(schedule.payment()),
            "total_paid": round_money(schedule.total_paid()),
            "total_interest": round_money(schedule.total_interest()),
        }),
        if periodic_rate.is_zero() {
            format!("Interest-free: {} split evenly over {} payments", principal, term_months)
        } else {
            format!(
                "{} at {} per month over {} payments gives a level payment of {}",
                principal,
                round_rate(periodic_rate),
                term_months,
                round_money(schedule.payment())
            )
        },
    );

    let preview: Vec<AmortizationEntry> = schedule
        .preview(preview_periods.min(term_months))
        .into_iter()
        .map(rounded_entry)
        .collect();
    let yearly_summary: Vec<YearSummary> = schedule
        .yearly_summary(MONTHS_PER_YEAR)
        .into_iter()
        .map(|year| YearSummary {
            principal_paid: round_money(year.principal_paid),
            interest_paid: round_money(year.interest_paid),
            closing_balance: round_money(year.closing_balance),
            ..year
        })
        .collect();

    audit.record(
        "amortization_schedule",
        "Amortization Schedule",
        "balance * r per period",
        serde_json::json!({ "preview_periods": preview.len(), "years": yearly_summary.len() }),
        serde_json::json!({
            "first_interest_portion": preview.first().map(|e| e.interest_portion),
            "final_balance": yearly_summary.last().map(|y| y.closing_balance),
        }),
        "Each payment covers the interest on the opening balance; the rest repays principal".to_string(),
    );

    Ok(LoanBreakdown {
        principal: round_money(principal),
        annual_rate: round_rate(annual_rate),
        periodic_rate: round_rate(periodic_rate),
        term_months,
        payment: round_money(schedule.payment()),
        total_paid: round_money(schedule.total_paid()),
        total_interest: round_money(schedule.total_interest()),
        preview,
        yearly_summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::test_support::dec;
    use crate::models::CalculatorInputs;

    fn run(inputs: &CalculatorInputs) -> EngineResult<LoanBreakdown> {
        let mut reader = InputReader::new(inputs);
        let mut audit = AuditLog::new();
        calculate(&mut reader, &mut audit)
    }

    #[test]
    fn test_home_loan_emi() {
        let inputs = CalculatorInputs::new()
            .with("principal", "2,500,000")
            .with("annual_rate", "8.5")
            .with("term_years", 20);
        let loan = run(&inputs).unwrap();

        assert_eq!(loan.term_months, 240);
        assert_eq!(loan.payment, dec("21695.58"));
        assert_eq!(loan.total_interest, dec("2706939.40"));
        assert_eq!(loan.preview.len(), 12);
        assert_eq!(loan.yearly_summary.len(), 20);
        assert_eq!(loan.yearly_summary[19].closing_balance, Decimal::ZERO);
    }

    #[test]
    fn test_first_payment_is_mostly_interest() {
        let inputs = CalculatorInputs::new()
            .with("principal", 2500000)
            .with("annual_rate", "8.5")
            .with("term_months", 240);
        let loan = run(&inputs).unwrap();

        // 2,500,000 * 0.085 / 12
        assert_eq!(loan.preview[0].interest_portion, dec("17708.33"));
        assert_eq!(loan.preview[0].principal_portion, dec("3987.25"));
    }

    #[test]
    fn test_zero_rate_loan() {
        let inputs = CalculatorInputs::new()
            .with("principal", 12000)
            .with("annual_rate", 0)
            .with("term_months", 12);
        let loan = run(&inputs).unwrap();
        assert_eq!(loan.payment, dec("1000"));
        assert!(loan.preview.iter().all(|e| e.interest_portion.is_zero()));
        assert_eq!(loan.total_interest, Decimal::ZERO);
    }

    #[test]
    fn test_preview_window_is_capped_at_term() {
        let inputs = CalculatorInputs::new()
            .with("principal", 6000)
            .with("annual_rate", 6)
            .with("term_months", 6)
            .with("preview_periods", 360);
        let loan = run(&inputs).unwrap();
        assert_eq!(loan.preview.len(), 6);
        assert_eq!(loan.preview[5].remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn test_missing_principal_is_not_computable() {
        let inputs = CalculatorInputs::new().with("annual_rate", 5).with("term_months", 12);
        assert!(run(&inputs).is_err());
    }

    #[test]
    fn test_zero_term_is_not_computable() {
        let inputs = CalculatorInputs::new().with("principal", 1000).with("annual_rate", 5);
        assert!(run(&inputs).is_err());
    }

    #[test]
    fn test_excessive_term_is_not_computable() {
        let inputs = CalculatorInputs::new()
            .with("principal", 1000)
            .with("annual_rate", 5)
            .with("term_years", 500);
        assert!(run(&inputs).is_err());
    }
}
