//! Salary converter: one amount expressed in every pay period, plus an
//! annual tax estimate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{FilingStatus, RateTables};
use crate::error::EngineResult;
use crate::models::{
    AuditLog, InputReader, MAX_AMOUNT, Money, Rate, checked_ratio, ratio_or_zero, round_money, round_rate,
};

use super::{not_computable, read_option_as};
use super::withholding::{AnnualTaxEstimate, annual_taxes, read_filing_status, read_state};

/// Warning code for an unrecognized salary period.
pub const UNKNOWN_SALARY_PERIOD: &str = "UNKNOWN_SALARY_PERIOD";

const WEEKS_PER_YEAR: Decimal = Decimal::from_parts(52, 0, 0, false, 0);
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const DEFAULT_HOURS_PER_WEEK: Decimal = Decimal::from_parts(40, 0, 0, false, 0);
const DEFAULT_DAYS_PER_WEEK: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// The period a salary amount is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryPeriod {
    /// Per hour worked.
    Hourly,
    /// Per day worked.
    Daily,
    /// Per week.
    Weekly,
    /// Per two weeks.
    Biweekly,
    /// Twice a month.
    Semimonthly,
    /// Per month.
    Monthly,
    /// Per quarter.
    Quarterly,
    /// Per year.
    Annual,
}

impl SalaryPeriod {
    fn parse(raw: &str) -> Option<Self> {
        match raw.replace(['-', '_', ' '], "").as_str() {
            "hourly" | "hour" => Some(SalaryPeriod::Hourly),
            "daily" | "day" => Some(SalaryPeriod::Daily),
            "weekly" | "week" => Some(SalaryPeriod::Weekly),
            "biweekly" | "fortnightly" => Some(SalaryPeriod::Biweekly),
            "semimonthly" => Some(SalaryPeriod::Semimonthly),
            "monthly" | "month" => Some(SalaryPeriod::Monthly),
            "quarterly" | "quarter" => Some(SalaryPeriod::Quarterly),
            "annual" | "annually" | "yearly" | "year" => Some(SalaryPeriod::Annual),
            _ => None,
        }
    }

    /// How many of this period make a year, given the working pattern.
    fn per_year(&self, hours_per_week: Decimal, days_per_week: Decimal) -> Decimal {
        match self {
            SalaryPeriod::Hourly => hours_per_week * WEEKS_PER_YEAR,
            SalaryPeriod::Daily => days_per_week * WEEKS_PER_YEAR,
            SalaryPeriod::Weekly => WEEKS_PER_YEAR,
            SalaryPeriod::Biweekly => Decimal::from(26),
            SalaryPeriod::Semimonthly => Decimal::from(24),
            SalaryPeriod::Monthly => MONTHS_PER_YEAR,
            SalaryPeriod::Quarterly => Decimal::from(4),
            SalaryPeriod::Annual => Decimal::ONE,
        }
    }
}

/// The same salary in every period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodEquivalents {
    /// Per hour.
    pub hourly: Money,
    /// Per working day.
    pub daily: Money,
    /// Per week.
    pub weekly: Money,
    /// Per two weeks.
    pub biweekly: Money,
    /// Per half month.
    pub semimonthly: Money,
    /// Per month.
    pub monthly: Money,
    /// Per quarter.
    pub quarterly: Money,
    /// Per year.
    pub annual: Money,
}

/// The salary breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryBreakdown {
    /// The amount as entered.
    pub salary_amount: Money,
    /// The period it was entered in.
    pub salary_period: SalaryPeriod,
    /// Working hours per week.
    pub hours_per_week: Decimal,
    /// Working days per week.
    pub days_per_week: Decimal,
    /// The salary in every period.
    pub equivalents: PeriodEquivalents,
    /// Filing status used for the federal estimate.
    pub filing_status: FilingStatus,
    /// Upper-cased state code, if one was given.
    pub state: Option<String>,
    /// Annual taxes.
    pub annual_taxes: AnnualTaxEstimate,
    /// Annual salary less annual taxes.
    pub net_annual: Money,
    /// Net annual pay divided by twelve.
    pub net_monthly: Money,
    /// Annual taxes over annual salary.
    pub effective_tax_rate: Rate,
}

fn read_or(reader: &mut InputReader<'_>, field: &str, default: Decimal) -> Decimal {
    if reader.is_present(field) {
        reader.money(field)
    } else {
        default
    }
}

pub(crate) fn calculate(
    reader: &mut InputReader<'_>,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> EngineResult<SalaryBreakdown> {
    let salary_amount = reader.money("salary_amount");
    let salary_period = read_option_as(
        reader,
        "salary_period",
        SalaryPeriod::Annual,
        SalaryPeriod::parse,
        UNKNOWN_SALARY_PERIOD,
    );
    let hours_per_week = read_or(reader, "hours_per_week", DEFAULT_HOURS_PER_WEEK);
    let days_per_week = read_or(reader, "days_per_week", DEFAULT_DAYS_PER_WEEK);
    let filing_status = read_filing_status(reader);
    let state = read_state(reader, tables);

    let annual = salary_amount
        .checked_mul(salary_period.per_year(hours_per_week, days_per_week))
        .filter(|annual| *annual <= MAX_AMOUNT)
        .ok_or_else(|| not_computable("The salary is too large to annualize"))?;
    if annual.is_zero() {
        return Err(not_computable("Enter a salary amount and working hours above zero"));
    }

    let per_working_unit = |units: Decimal| {
        checked_ratio(annual, units * WEEKS_PER_YEAR)
            .map(round_money)
            .ok_or_else(|| not_computable("Working hours or days per week are too small to convert"))
    };
    let equivalents = PeriodEquivalents {
        hourly: per_working_unit(hours_per_week)?,
        daily: per_working_unit(days_per_week)?,
        weekly: round_money(annual / WEEKS_PER_YEAR),
        biweekly: round_money(annual / Decimal::from(26)),
        semimonthly: round_money(annual / Decimal::from(24)),
        monthly: round_money(annual / MONTHS_PER_YEAR),
        quarterly: round_money(annual / Decimal::from(4)),
        annual: round_money(annual),
    };

    audit.record(
        "salary_conversion",
        "Salary Period Conversion",
        "salary_amount x periods per year",
        serde_json::json!({
            "salary_amount": salary_amount,
            "salary_period": salary_period,
            "hours_per_week": hours_per_week,
            "days_per_week": days_per_week,
        }),
        serde_json::json!({ "annual": round_money(annual) }),
        format!("{} per {:?} is {} per year", salary_amount, salary_period, round_money(annual)),
    );

    let (annual_taxes, total_taxes) = annual_taxes(annual, filing_status, &state, tables, audit);
    let net_annual = annual - total_taxes;

    Ok(SalaryBreakdown {
        salary_amount,
        salary_period,
        hours_per_week,
        days_per_week,
        equivalents,
        filing_status,
        state: state.code,
        annual_taxes,
        net_annual: round_money(net_annual),
        net_monthly: round_money(net_annual / MONTHS_PER_YEAR),
        effective_tax_rate: round_rate(ratio_or_zero(total_taxes, annual)),
    })
}
