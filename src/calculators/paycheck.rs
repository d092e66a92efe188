//! Paycheck (take-home pay) calculator.
//!
//! Sequence per paycheck:
//!
//! 1. Gross pay is the annual salary divided by the pay periods.
//! 2. Pre-tax deductions (retirement share plus other pre-tax amounts) reduce
//!    taxable income before any bracket is evaluated.
//! 3. Federal tax is the bracket tax on annualized taxable income less the
//!    standard deduction, divided back across the periods.
//! 4. Social Security and Medicare are applied to FICA wages (gross less the
//!    non-retirement pre-tax deductions) with year-to-date wages as the prior
//!    amount, so the wage base cap and the additional Medicare threshold are
//!    annual.
//! 5. State tax is the state flat rate on taxable income.
//! 6. Post-tax deductions come off last.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculation::apply_capped_rate;
use crate::config::{FilingStatus, RateTables};
use crate::error::EngineResult;
use crate::models::{AuditLog, InputReader, MAX_AMOUNT, Money, Rate, ratio_or_zero, round_money, round_rate};

use super::{not_computable, read_option_as};
use super::withholding::{
    FederalTaxBreakdown, federal_income_tax, payroll_taxes, read_filing_status, read_state,
    state_income_tax,
};

/// Warning code for an unrecognized pay frequency.
pub const UNKNOWN_PAY_FREQUENCY: &str = "UNKNOWN_PAY_FREQUENCY";

const WEEKS_PER_YEAR: Decimal = Decimal::from_parts(52, 0, 0, false, 0);
const DEFAULT_HOURS_PER_WEEK: Decimal = Decimal::from_parts(40, 0, 0, false, 0);

/// How often the employee is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayFrequency {
    /// 52 paychecks a year.
    Weekly,
    /// 26 paychecks a year.
    Biweekly,
    /// 24 paychecks a year.
    Semimonthly,
    /// 12 paychecks a year.
    Monthly,
}

impl PayFrequency {
    /// Number of paychecks per year.
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PayFrequency::Weekly => 52,
            PayFrequency::Biweekly => 26,
            PayFrequency::Semimonthly => 24,
            PayFrequency::Monthly => 12,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.replace(['-', '_', ' '], "").as_str() {
            "weekly" | "52" => Some(PayFrequency::Weekly),
            "biweekly" | "fortnightly" | "26" => Some(PayFrequency::Biweekly),
            "semimonthly" | "twicemonthly" | "24" => Some(PayFrequency::Semimonthly),
            "monthly" | "12" => Some(PayFrequency::Monthly),
            _ => None,
        }
    }
}

/// One paycheck of the full-year projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedPaycheck {
    /// 1-based paycheck number.
    pub period: u32,
    /// FICA wages paid this year including this paycheck.
    pub wages_to_date: Money,
    /// Social Security withheld from this paycheck.
    pub social_security: Money,
    /// Medicare, including any additional Medicare, withheld from this paycheck.
    pub medicare: Money,
    /// Take-home pay for this paycheck.
    pub net_pay: Money,
    /// True once the Social Security wage base has been reached.
    pub social_security_cap_reached: bool,
}

/// The take-home pay breakdown for one paycheck.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaycheckBreakdown {
    /// The pay frequency used.
    pub pay_frequency: PayFrequency,
    /// Paychecks per year.
    pub periods_per_year: u32,
    /// Filing status used for the federal schedule.
    pub filing_status: FilingStatus,
    /// Upper-cased state code, if one was given.
    pub state: Option<String>,
    /// The state's flat rate.
    pub state_rate: Rate,
    /// Annual salary the paycheck is derived from.
    pub annual_salary: Money,
    /// Gross pay for the paycheck.
    pub gross_pay: Money,
    /// Retirement (401(k)) contribution.
    pub retirement_contribution: Money,
    /// Other pre-tax deductions such as health premiums.
    pub other_pre_tax_deductions: Money,
    /// Gross pay less all pre-tax deductions.
    pub taxable_income: Money,
    /// Federal income tax detail.
    pub federal: FederalTaxBreakdown,
    /// Federal income tax withheld.
    pub federal_income_tax: Money,
    /// Wages subject to Social Security and Medicare.
    pub fica_wages: Money,
    /// Social Security withheld.
    pub social_security: Money,
    /// Medicare withheld at the base rate.
    pub medicare: Money,
    /// Additional Medicare withheld.
    pub additional_medicare: Money,
    /// State income tax withheld.
    pub state_tax: Money,
    /// Every tax above.
    pub total_taxes: Money,
    /// Post-tax deductions.
    pub post_tax_deductions: Money,
    /// Take-home pay.
    pub net_pay: Money,
    /// Total taxes over gross pay.
    pub effective_tax_rate: Rate,
    /// Every paycheck of the year, starting from zero wages.
    pub projection: Vec<ProjectedPaycheck>,
    /// First paycheck in the projection at which the wage base is reached.
    pub social_security_cap_period: Option<u32>,
}

fn read_annual_salary(reader: &mut InputReader<'_>) -> Option<Money> {
    if reader.is_present("annual_salary") || !reader.is_present("hourly_rate") {
        return Some(reader.money("annual_salary"));
    }
    let hourly_rate = reader.money("hourly_rate");
    let hours = if reader.is_present("hours_per_week") {
        reader.money("hours_per_week")
    } else {
        DEFAULT_HOURS_PER_WEEK
    };
    hourly_rate
        .checked_mul(hours)
        .and_then(|weekly| weekly.checked_mul(WEEKS_PER_YEAR))
        .filter(|annual| *annual <= MAX_AMOUNT)
}

pub(crate) fn calculate(
    reader: &mut InputReader<'_>,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> EngineResult<PaycheckBreakdown> {
    let frequency = read_option_as(
        reader,
        "pay_frequency",
        PayFrequency::Biweekly,
        PayFrequency::parse,
        UNKNOWN_PAY_FREQUENCY,
    );
    let periods = frequency.periods_per_year();
    let periods_dec = Decimal::from(periods);

    let annual_salary = read_annual_salary(reader)
        .ok_or_else(|| not_computable("Hourly rate times hours is too large to annualize"))?;
    if annual_salary.is_zero() {
        return Err(not_computable("Enter an annual salary or hourly rate above zero"));
    }

    let filing_status = read_filing_status(reader);
    let state = read_state(reader, tables);
    let retirement_rate = reader.percent("retirement_percent").min(Decimal::ONE);
    let other_pre_tax = reader.money("pre_tax_deductions");
    let post_tax = reader.money("post_tax_deductions");
    let ytd_gross = reader.money("ytd_gross");

    let gross = annual_salary / periods_dec;
    let retirement = gross * retirement_rate;
    let pre_tax = retirement + other_pre_tax;
    let taxable = (gross - pre_tax).max(Decimal::ZERO);
    let fica_wages = (gross - other_pre_tax).max(Decimal::ZERO);

    audit.record(
        "gross_pay",
        "Gross Pay",
        "salary / pay periods",
        serde_json::json!({
            "annual_salary": round_money(annual_salary),
            "pay_frequency": frequency,
            "periods_per_year": periods,
        }),
        serde_json::json!({ "gross_pay": round_money(gross) }),
        format!(
            "{} a year paid {} times gives {} per paycheck",
            round_money(annual_salary),
            periods,
            round_money(gross)
        ),
    );
    audit.record(
        "pre_tax_deductions",
        "Pre-tax Deductions",
        "retirement_percent + pre_tax_deductions",
        serde_json::json!({
            "gross_pay": round_money(gross),
            "retirement_rate": retirement_rate,
            "other_pre_tax_deductions": round_money(other_pre_tax),
        }),
        serde_json::json!({
            "retirement_contribution": round_money(retirement),
            "taxable_income": round_money(taxable),
            "fica_wages": round_money(fica_wages),
        }),
        format!(
            "Pre-tax deductions of {} reduce taxable income to {}; retirement contributions stay subject to FICA",
            round_money(pre_tax),
            round_money(taxable)
        ),
    );

    let (federal, federal_tax) = federal_income_tax(taxable * periods_dec, periods, filing_status, tables, audit);
    let payroll = payroll_taxes(fica_wages, ytd_gross, filing_status, tables, audit);
    let state_tax = state_income_tax(taxable, &state, tables, audit);

    let fixed_deductions = pre_tax + federal_tax + state_tax + post_tax;
    let total_taxes = federal_tax + payroll.social_security.base + payroll.medicare.total + state_tax;
    let net = gross - pre_tax - total_taxes - post_tax;

    audit.record(
        "net_pay",
        "Net Pay",
        "gross - deductions - taxes",
        serde_json::json!({
            "gross_pay": round_money(gross),
            "pre_tax_deductions": round_money(pre_tax),
            "total_taxes": round_money(total_taxes),
            "post_tax_deductions": round_money(post_tax),
        }),
        serde_json::json!({ "net_pay": round_money(net) }),
        format!(
            "{} gross less {} of deductions and {} of taxes leaves {}",
            round_money(gross),
            round_money(pre_tax + post_tax),
            round_money(total_taxes),
            round_money(net)
        ),
    );

    let projection = project_year(gross, fica_wages, fixed_deductions, periods, filing_status, tables);
    let social_security_cap_period = projection
        .iter()
        .find(|paycheck| paycheck.social_security_cap_reached)
        .map(|paycheck| paycheck.period);

    audit.record(
        "social_security_cap_projection",
        "Social Security Wage Base Projection",
        &format!("{}.payroll.social_security", tables.tax_year),
        serde_json::json!({
            "fica_wages_per_paycheck": round_money(fica_wages),
            "periods_per_year": periods,
            "wage_cap": tables.payroll().social_security.wage_cap,
        }),
        serde_json::json!({ "cap_reached_at_period": social_security_cap_period }),
        match social_security_cap_period {
            Some(period) => format!(
                "The wage base is reached at paycheck {}; later paychecks withhold no Social Security",
                period
            ),
            None => "Annual wages stay under the wage base".to_string(),
        },
    );

    debug!(
        gross = %round_money(gross),
        net = %round_money(net),
        cap_period = ?social_security_cap_period,
        "Paycheck calculated"
    );

    Ok(PaycheckBreakdown {
        pay_frequency: frequency,
        periods_per_year: periods,
        filing_status,
        state: state.code,
        state_rate: state.rate,
        annual_salary: round_money(annual_salary),
        gross_pay: round_money(gross),
        retirement_contribution: round_money(retirement),
        other_pre_tax_deductions: round_money(other_pre_tax),
        taxable_income: round_money(taxable),
        federal,
        federal_income_tax: round_money(federal_tax),
        fica_wages: round_money(fica_wages),
        social_security: round_money(payroll.social_security.base),
        medicare: round_money(payroll.medicare.base),
        additional_medicare: round_money(payroll.medicare.additional),
        state_tax: round_money(state_tax),
        total_taxes: round_money(total_taxes),
        post_tax_deductions: round_money(post_tax),
        net_pay: round_money(net),
        effective_tax_rate: round_rate(ratio_or_zero(total_taxes, gross)),
        projection,
        social_security_cap_period,
    })
}

/// Every paycheck of a year, with payroll taxes accumulating from zero.
fn project_year(
    gross: Money,
    fica_wages: Money,
    fixed_deductions: Money,
    periods: u32,
    filing_status: FilingStatus,
    tables: &RateTables,
) -> Vec<ProjectedPaycheck> {
    let payroll = tables.payroll();
    let medicare_rule = payroll.medicare_for(filing_status);

    (1..=periods)
        .map(|period| {
            let prior = fica_wages * Decimal::from(period - 1);
            let social_security = apply_capped_rate(fica_wages, &payroll.social_security, prior);
            let medicare = apply_capped_rate(fica_wages, &medicare_rule, prior);
            let net = gross - fixed_deductions - social_security.base - medicare.total;
            ProjectedPaycheck {
                period,
                wages_to_date: round_money(prior + fica_wages),
                social_security: round_money(social_security.base),
                medicare: round_money(medicare.total),
                net_pay: round_money(net),
                social_security_cap_reached: social_security.cap_reached,
            }
        })
        .collect()
}
