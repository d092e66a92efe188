//! Small-business general liability premium estimate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{AddOn, PremiumBreakdown, RiskFactor, price};
use crate::error::EngineResult;
use crate::models::{AuditLog, InputReader, Money, round_money};

use super::{not_computable, read_option};

const MINIMUM_PREMIUM: Decimal = Decimal::from_parts(400, 0, 0, false, 0);
/// Premium per dollar of annual revenue.
const REVENUE_RATE: Decimal = Decimal::from_parts(2, 0, 0, false, 3);
const PER_EMPLOYEE: Decimal = Decimal::from_parts(85, 0, 0, false, 0);
const DEFAULT_COVERAGE_LIMIT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const CYBER_LIABILITY: Decimal = Decimal::from_parts(1250, 0, 0, false, 0);
const WORKERS_COMP_PER_EMPLOYEE: Decimal = Decimal::from_parts(520, 0, 0, false, 0);

/// Industry classification used for the hazard multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    /// Professional office work.
    Office,
    /// Retail storefront; the reference class.
    Retail,
    /// Food service.
    Restaurant,
    /// Light and heavy manufacturing.
    Manufacturing,
    /// Building trades.
    Construction,
    /// Software and IT services.
    Technology,
    /// Clinics and care providers.
    Healthcare,
}

impl Industry {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "office" | "professional_services" => Some(Industry::Office),
            "retail" => Some(Industry::Retail),
            "restaurant" | "food_service" => Some(Industry::Restaurant),
            "manufacturing" => Some(Industry::Manufacturing),
            "construction" | "contractor" => Some(Industry::Construction),
            "technology" | "tech" | "software" => Some(Industry::Technology),
            "healthcare" | "medical" => Some(Industry::Healthcare),
            _ => None,
        }
    }

    fn multiplier(&self) -> Decimal {
        match self {
            Industry::Office => Decimal::new(85, 2),
            Industry::Retail => Decimal::ONE,
            Industry::Restaurant => Decimal::new(135, 2),
            Industry::Manufacturing => Decimal::new(160, 2),
            Industry::Construction => Decimal::new(210, 2),
            Industry::Technology => Decimal::new(90, 2),
            Industry::Healthcare => Decimal::new(145, 2),
        }
    }
}

#[derive(Debug)]
struct Business {
    employees: u32,
    industry: Industry,
    coverage_limit: Money,
    years_in_business: Option<u32>,
    prior_claims: u32,
    cyber_liability: bool,
    professional_liability: bool,
    workers_comp: bool,
    high_deductible: bool,
}

fn coverage_multiplier(business: &Business) -> Decimal {
    if business.coverage_limit <= DEFAULT_COVERAGE_LIMIT {
        Decimal::ONE
    } else if business.coverage_limit <= DEFAULT_COVERAGE_LIMIT * Decimal::TWO {
        Decimal::new(130, 2)
    } else {
        Decimal::new(165, 2)
    }
}

fn claims_multiplier(business: &Business) -> Decimal {
    Decimal::ONE + Decimal::new(15, 2) * Decimal::from(business.prior_claims)
}

fn factors() -> Vec<RiskFactor<Business>> {
    vec![
        RiskFactor::multiply_by(
            "industry",
            "Industry class",
            |b: &Business| b.industry.multiplier(),
            |b: &Business| b.industry != Industry::Retail,
        ),
        RiskFactor::multiply_by("coverage_limit", "Coverage limit", coverage_multiplier, |b: &Business| {
            b.coverage_limit > DEFAULT_COVERAGE_LIMIT
        }),
        RiskFactor::multiply("new_business", "New business", Decimal::new(120, 2), |b: &Business| {
            b.years_in_business.is_some_and(|years| years < 3)
        }),
        RiskFactor::multiply_by("prior_claims", "Prior claims", claims_multiplier, |b: &Business| {
            b.prior_claims > 0
        }),
        RiskFactor::add(
            "cyber_liability",
            "Cyber liability",
            AddOn::Flat(CYBER_LIABILITY),
            |b: &Business| b.cyber_liability,
        ),
        RiskFactor::add(
            "professional_liability",
            "Professional liability",
            AddOn::FractionOfAdjusted(Decimal::new(25, 2)),
            |b: &Business| b.professional_liability,
        ),
        RiskFactor::add(
            "workers_comp",
            "Workers' compensation",
            AddOn::Computed(|b: &Business| WORKERS_COMP_PER_EMPLOYEE * Decimal::from(b.employees)),
            |b: &Business| b.workers_comp && b.employees > 0,
        ),
        RiskFactor::add(
            "high_deductible",
            "High deductible credit",
            AddOn::FractionOfAdjusted(Decimal::new(-10, 2)),
            |b: &Business| b.high_deductible,
        ),
    ]
}

/// The business insurance quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessInsuranceQuote {
    /// Annual revenue.
    pub annual_revenue: Money,
    /// Headcount.
    pub employees: u32,
    /// Industry class used.
    pub industry: Industry,
    /// Per-occurrence liability limit.
    pub coverage_limit: Money,
    /// The priced premium.
    pub premium: PremiumBreakdown,
}

pub(crate) fn calculate(reader: &mut InputReader<'_>, audit: &mut AuditLog) -> EngineResult<BusinessInsuranceQuote> {
    let revenue = reader.money("annual_revenue");
    let coverage_limit = match reader.money("coverage_limit") {
        limit if limit > Decimal::ZERO => limit,
        _ => DEFAULT_COVERAGE_LIMIT,
    };
    let business = Business {
        employees: reader.count("employees"),
        industry: read_option(reader, "industry", Industry::Retail, Industry::parse),
        coverage_limit,
        years_in_business: reader
            .is_present("years_in_business")
            .then(|| reader.count("years_in_business")),
        prior_claims: reader.count("prior_claims"),
        cyber_liability: reader.flag("cyber_liability"),
        professional_liability: reader.flag("professional_liability"),
        workers_comp: reader.flag("workers_comp"),
        high_deductible: reader.flag("high_deductible"),
    };

    if revenue <= Decimal::ZERO && business.employees == 0 {
        return Err(not_computable("Enter annual revenue or number of employees"));
    }

    let base = MINIMUM_PREMIUM + revenue * REVENUE_RATE + PER_EMPLOYEE * Decimal::from(business.employees);
    let premium = price(base, &factors(), &business)
        .ok_or_else(|| not_computable("The premium could not be priced"))?
        .rounded();

    audit.record(
        "business_premium",
        "Business Liability Premium",
        "minimum + revenue x rate + employees x per-head",
        serde_json::json!({
            "annual_revenue": revenue,
            "revenue_rate": REVENUE_RATE,
            "employees": business.employees,
            "industry": business.industry,
            "coverage_limit": coverage_limit,
        }),
        serde_json::json!({
            "base_premium": premium.base_premium,
            "adjusted_premium": premium.adjusted_premium,
            "final_annual_premium": premium.final_annual_premium,
        }),
        format!(
            "Base {} for {} employees, adjusted for {:?} risk and cover to {} a year",
            premium.base_premium, business.employees, business.industry, premium.final_annual_premium
        ),
    );

    Ok(BusinessInsuranceQuote {
        annual_revenue: round_money(revenue),
        employees: business.employees,
        industry: business.industry,
        coverage_limit: round_money(coverage_limit),
        premium,
    })
}
