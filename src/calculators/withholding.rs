//! Income and payroll tax steps shared by the paycheck and salary calculators.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculation::{BracketLine, CappedRateResult, apply_capped_rate};
use crate::config::{FilingStatus, RateTables};
use crate::models::{AuditLog, InputReader, Money, Rate, ratio_or_zero, round_money, round_rate};

use super::read_option_as;

/// Warning code for a state code missing from the rate tables.
pub const UNKNOWN_STATE: &str = "UNKNOWN_STATE";

/// Warning code for an unrecognized filing status.
pub const UNKNOWN_FILING_STATUS: &str = "UNKNOWN_FILING_STATUS";

/// Federal income tax, computed on annualized wages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederalTaxBreakdown {
    /// Annualized wages before the standard deduction.
    pub annual_wages: Money,
    /// The deduction for the filing status.
    pub standard_deduction: Money,
    /// Annual wages less the deduction, never negative.
    pub annual_taxable_income: Money,
    /// Tax on the annual taxable income.
    pub annual_tax: Money,
    /// Annual tax divided across the pay periods.
    pub tax_per_period: Money,
    /// Rate of the highest bracket reached.
    pub marginal_rate: Rate,
    /// Annual tax over annual taxable income.
    pub effective_rate: Rate,
    /// The slice of income taxed in each bracket.
    pub bracket_lines: Vec<BracketLine>,
}

/// Social Security and Medicare on one amount of wages.
#[derive(Debug, Clone)]
pub(crate) struct PayrollTaxes {
    pub social_security: CappedRateResult,
    pub medicare: CappedRateResult,
}

/// A full year of income and payroll taxes on an annual salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualTaxEstimate {
    /// Federal income tax.
    pub federal: FederalTaxBreakdown,
    /// Social Security, limited by the wage base.
    pub social_security: Money,
    /// Medicare at the base rate.
    pub medicare: Money,
    /// Additional Medicare above the filing-status threshold.
    pub additional_medicare: Money,
    /// State income tax at the state's flat rate.
    pub state_tax: Money,
    /// Every tax above.
    pub total_taxes: Money,
}

/// The state whose flat rate applies.
#[derive(Debug, Clone)]
pub(crate) struct StateSelection {
    pub code: Option<String>,
    pub rate: Rate,
}

/// Reads `filing_status`; missing is single, unrecognized is single with a warning.
pub(crate) fn read_filing_status(reader: &mut InputReader<'_>) -> FilingStatus {
    read_option_as(
        reader,
        "filing_status",
        FilingStatus::Single,
        |raw: &str| raw.parse::<FilingStatus>().ok(),
        UNKNOWN_FILING_STATUS,
    )
}

/// Reads `state` and looks up its flat rate; unknown codes tax at zero.
pub(crate) fn read_state(reader: &mut InputReader<'_>, tables: &RateTables) -> StateSelection {
    let Some(code) = reader.choice("state") else {
        return StateSelection {
            code: None,
            rate: Decimal::ZERO,
        };
    };
    let code = code.to_ascii_uppercase();
    match tables.state_rate(&code) {
        Some(rate) => StateSelection {
            code: Some(code),
            rate,
        },
        None => {
            warn!(state = %code, tax_year = tables.tax_year, "Unknown state code; using zero rate");
            reader.warn(
                UNKNOWN_STATE,
                format!("No {} rate for state '{}'; state tax is zero", tables.tax_year, code),
            );
            StateSelection {
                code: Some(code),
                rate: Decimal::ZERO,
            }
        }
    }
}

/// Federal income tax on `annual_wages`, spread across `periods` pay periods.
///
/// Returns the rounded breakdown and the unrounded tax per period.
pub(crate) fn federal_income_tax(
    annual_wages: Money,
    periods: u32,
    status: FilingStatus,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> (FederalTaxBreakdown, Money) {
    let schedule = tables.federal(status);
    let annual_taxable_income = (annual_wages - schedule.standard_deduction).max(Decimal::ZERO);
    let evaluation = schedule.brackets.evaluate_detailed(annual_taxable_income);
    let tax_per_period = ratio_or_zero(evaluation.total, Decimal::from(periods));

    debug!(
        filing_status = %status,
        annual_taxable_income = %annual_taxable_income,
        annual_tax = %evaluation.total,
        "Federal brackets evaluated"
    );

    audit.record(
        "federal_income_tax",
        "Federal Income Tax",
        &format!("{}.federal.{}", tables.tax_year, status),
        serde_json::json!({
            "annual_wages": round_money(annual_wages),
            "standard_deduction": schedule.standard_deduction,
            "annual_taxable_income": round_money(annual_taxable_income),
            "pay_periods": periods,
        }),
        serde_json::json!({
            "annual_tax": round_money(evaluation.total),
            "tax_per_period": round_money(tax_per_period),
            "marginal_rate": evaluation.marginal_rate,
            "brackets_reached": evaluation.lines.len(),
        }),
        format!(
            "Annual wages {} less the {} standard deduction of {} leaves {} taxable; \
             the progressive brackets give {} per year, {} per pay period",
            round_money(annual_wages),
            status,
            schedule.standard_deduction,
            round_money(annual_taxable_income),
            round_money(evaluation.total),
            round_money(tax_per_period)
        ),
    );

    let breakdown = FederalTaxBreakdown {
        annual_wages: round_money(annual_wages),
        standard_deduction: schedule.standard_deduction,
        annual_taxable_income: round_money(annual_taxable_income),
        annual_tax: round_money(evaluation.total),
        tax_per_period: round_money(tax_per_period),
        marginal_rate: evaluation.marginal_rate,
        effective_rate: round_rate(evaluation.effective_rate),
        bracket_lines: evaluation
            .lines
            .into_iter()
            .map(|line| BracketLine {
                taxed_amount: round_money(line.taxed_amount),
                tax: round_money(line.tax),
                ..line
            })
            .collect(),
    };
    (breakdown, tax_per_period)
}

/// Social Security and Medicare on `wages`, given wages already paid this year.
pub(crate) fn payroll_taxes(
    wages: Money,
    prior_wages: Money,
    status: FilingStatus,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> PayrollTaxes {
    let payroll = tables.payroll();
    let social_security = apply_capped_rate(wages, &payroll.social_security, prior_wages);
    let medicare_rule = payroll.medicare_for(status);
    let medicare = apply_capped_rate(wages, &medicare_rule, prior_wages);

    audit.record(
        "social_security",
        "Social Security",
        &format!("{}.payroll.social_security", tables.tax_year),
        serde_json::json!({
            "wages": round_money(wages),
            "prior_wages": round_money(prior_wages),
            "rate": payroll.social_security.rate,
            "wage_cap": payroll.social_security.wage_cap,
        }),
        serde_json::json!({
            "taxable_wages": round_money(social_security.taxable_for_cap),
            "tax": round_money(social_security.base),
            "cap_reached": social_security.cap_reached,
        }),
        if social_security.taxable_for_cap < wages {
            format!(
                "Only {} of {} falls under the annual wage base; Social Security stops at the cap",
                round_money(social_security.taxable_for_cap),
                round_money(wages)
            )
        } else {
            format!(
                "All {} is under the annual wage base and taxed at {}",
                round_money(wages),
                payroll.social_security.rate
            )
        },
    );

    audit.record(
        "medicare",
        "Medicare",
        &format!("{}.payroll.medicare", tables.tax_year),
        serde_json::json!({
            "wages": round_money(wages),
            "prior_wages": round_money(prior_wages),
            "rate": medicare_rule.rate,
            "additional_rate": medicare_rule.additional_rate,
            "additional_threshold": medicare_rule.additional_threshold,
        }),
        serde_json::json!({
            "tax": round_money(medicare.base),
            "additional_taxable_wages": round_money(medicare.taxable_for_additional),
            "additional_tax": round_money(medicare.additional),
        }),
        format!(
            "Medicare applies to all {} of wages; {} is above the {} threshold for additional Medicare",
            round_money(wages),
            round_money(medicare.taxable_for_additional),
            status
        ),
    );

    PayrollTaxes {
        social_security,
        medicare,
    }
}

/// State income tax at the selected flat rate.
pub(crate) fn state_income_tax(
    taxable: Money,
    state: &StateSelection,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> Money {
    let tax = taxable * state.rate;
    audit.record(
        "state_income_tax",
        "State Income Tax",
        &format!("{}.states", tables.tax_year),
        serde_json::json!({
            "state": state.code,
            "taxable": round_money(taxable),
            "rate": state.rate,
        }),
        serde_json::json!({ "tax": round_money(tax) }),
        match &state.code {
            Some(code) => format!("{} flat rate {} on {}", code, state.rate, round_money(taxable)),
            None => "No state selected; state tax is zero".to_string(),
        },
    );
    tax
}

/// Every tax on a full year of `annual_wages` paid in one lump.
pub(crate) fn annual_taxes(
    annual_wages: Money,
    status: FilingStatus,
    state: &StateSelection,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> (AnnualTaxEstimate, Money) {
    let (federal, federal_tax) = federal_income_tax(annual_wages, 1, status, tables, audit);
    let payroll = payroll_taxes(annual_wages, Decimal::ZERO, status, tables, audit);
    let state_tax = state_income_tax(annual_wages, state, tables, audit);

    let total = federal_tax + payroll.social_security.base + payroll.medicare.total + state_tax;

    (
        AnnualTaxEstimate {
            federal,
            social_security: round_money(payroll.social_security.base),
            medicare: round_money(payroll.medicare.base),
            additional_medicare: round_money(payroll.medicare.additional),
            state_tax: round_money(state_tax),
            total_taxes: round_money(total),
        },
        total,
    )
}
