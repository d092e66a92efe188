//! Health insurance premium estimate with income-based subsidy.
//!
//! The base is the monthly reference premium for a 21-24 year old, annualized.
//! Age band, covered members, tobacco use and plan tier scale it; dental and
//! vision add per member. The subsidy fraction comes from household income as
//! a multiple of the poverty line for the household size.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculation::{AddOn, PremiumBreakdown, RiskFactor, SubsidyResolution, price};
use crate::config::RateTables;
use crate::error::EngineResult;
use crate::models::{AuditLog, InputReader, Money, ratio_or_zero, round_money, round_rate};

use super::{not_computable, read_option};

/// Monthly premium for the reference age band.
const REFERENCE_MONTHLY_PREMIUM: Decimal = Decimal::from_parts(450, 0, 0, false, 0);
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);
const DENTAL_PER_MEMBER: Decimal = Decimal::from_parts(360, 0, 0, false, 0);
const VISION_PER_MEMBER: Decimal = Decimal::from_parts(150, 0, 0, false, 0);
const MAX_CHARGED_CHILDREN: u32 = 3;

/// Age rating by band upper bound; the oldest band is 1.905 times the reference.
const AGE_BANDS: [(u32, Decimal); 10] = [
    (20, Decimal::from_parts(635, 0, 0, false, 3)),
    (24, Decimal::from_parts(1000, 0, 0, false, 3)),
    (29, Decimal::from_parts(1004, 0, 0, false, 3)),
    (34, Decimal::from_parts(1013, 0, 0, false, 3)),
    (39, Decimal::from_parts(1046, 0, 0, false, 3)),
    (44, Decimal::from_parts(1135, 0, 0, false, 3)),
    (49, Decimal::from_parts(1278, 0, 0, false, 3)),
    (54, Decimal::from_parts(1487, 0, 0, false, 3)),
    (59, Decimal::from_parts(1706, 0, 0, false, 3)),
    (u32::MAX, Decimal::from_parts(1905, 0, 0, false, 3)),
];

/// Plan metal tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    /// Lowest premium, highest cost sharing.
    Bronze,
    /// Reference tier.
    Silver,
    /// Lower cost sharing.
    Gold,
    /// Lowest cost sharing.
    Platinum,
}

impl PlanTier {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "bronze" => Some(PlanTier::Bronze),
            "silver" => Some(PlanTier::Silver),
            "gold" => Some(PlanTier::Gold),
            "platinum" => Some(PlanTier::Platinum),
            _ => None,
        }
    }

    fn multiplier(&self) -> Decimal {
        match self {
            PlanTier::Bronze => Decimal::new(80, 2),
            PlanTier::Silver => Decimal::ONE,
            PlanTier::Gold => Decimal::new(120, 2),
            PlanTier::Platinum => Decimal::new(145, 2),
        }
    }
}

#[derive(Debug)]
struct Household {
    age: u32,
    adults: u32,
    children: u32,
    tobacco: bool,
    tier: PlanTier,
    dental: bool,
    vision: bool,
}

impl Household {
    fn members(&self) -> u32 {
        self.adults.saturating_add(self.children)
    }

    /// Children beyond the third are covered without charge.
    fn charged_children(&self) -> u32 {
        self.children.min(MAX_CHARGED_CHILDREN)
    }
}

fn age_factor(household: &Household) -> Decimal {
    AGE_BANDS
        .iter()
        .find(|(max_age, _)| household.age <= *max_age)
        .map_or(Decimal::ONE, |(_, factor)| *factor)
}

/// Each extra adult costs a full share, each of up to three children 40%.
fn member_factor(household: &Household) -> Decimal {
    Decimal::from(household.adults) + Decimal::new(4, 1) * Decimal::from(household.charged_children())
}

fn factors() -> Vec<RiskFactor<Household>> {
    vec![
        RiskFactor::multiply_by("age_band", "Age band", age_factor, |h: &Household| {
            age_factor(h) != Decimal::ONE
        }),
        RiskFactor::multiply_by("covered_members", "Covered members", member_factor, |h: &Household| {
            h.members() > 1
        }),
        RiskFactor::multiply("tobacco", "Tobacco surcharge", Decimal::new(12, 1), |h: &Household| h.tobacco),
        RiskFactor::multiply_by(
            "plan_tier",
            "Plan tier",
            |h: &Household| h.tier.multiplier(),
            |h: &Household| h.tier != PlanTier::Silver,
        ),
        RiskFactor::add(
            "dental",
            "Dental coverage",
            AddOn::Computed(|h: &Household| DENTAL_PER_MEMBER * Decimal::from(h.members())),
            |h: &Household| h.dental,
        ),
        RiskFactor::add(
            "vision",
            "Vision coverage",
            AddOn::Computed(|h: &Household| VISION_PER_MEMBER * Decimal::from(h.members())),
            |h: &Household| h.vision,
        ),
    ]
}

/// The subsidy lookup and its effect on the premium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidySummary {
    /// Annual household income.
    pub household_income: Money,
    /// People in the tax household.
    pub household_size: u32,
    /// Poverty line for the household size.
    pub poverty_line: Money,
    /// The tier lookup.
    pub resolution: SubsidyResolution,
    /// Subsidy on the annual premium.
    pub annual_subsidy: Money,
    /// Subsidy per month.
    pub monthly_subsidy: Money,
}

/// The health insurance quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInsuranceQuote {
    /// Age of the primary applicant.
    pub age: u32,
    /// Adults covered.
    pub adults: u32,
    /// Children covered.
    pub children: u32,
    /// Plan tier.
    pub plan_tier: PlanTier,
    /// The priced premium before subsidy.
    pub premium: PremiumBreakdown,
    /// The subsidy.
    pub subsidy: SubsidySummary,
    /// Annual premium after subsidy.
    pub net_annual_premium: Money,
    /// Monthly premium after subsidy.
    pub net_monthly_premium: Money,
}

pub(crate) fn calculate(
    reader: &mut InputReader<'_>,
    tables: &RateTables,
    audit: &mut AuditLog,
) -> EngineResult<HealthInsuranceQuote> {
    let household = Household {
        age: reader.count("age"),
        adults: reader.count("adults").max(1),
        children: reader.count("children"),
        tobacco: reader.flag("tobacco"),
        tier: read_option(reader, "plan_tier", PlanTier::Silver, PlanTier::parse),
        dental: reader.flag("dental"),
        vision: reader.flag("vision"),
    };
    let household_income = reader.money("household_income");
    let household_size = match reader.count("household_size") {
        0 => household.members(),
        size => size,
    };

    let base = REFERENCE_MONTHLY_PREMIUM * MONTHS_PER_YEAR;
    let premium = price(base, &factors(), &household)
        .ok_or_else(|| not_computable("The premium could not be priced"))?
        .rounded();

    audit.record(
        "health_premium",
        "Health Premium",
        "reference premium x age band x members",
        serde_json::json!({
            "age": household.age,
            "members": household.members(),
            "plan_tier": household.tier,
            "tobacco": household.tobacco,
        }),
        serde_json::json!({
            "base_premium": premium.base_premium,
            "adjusted_premium": premium.adjusted_premium,
            "final_annual_premium": premium.final_annual_premium,
        }),
        format!(
            "Reference premium {} adjusted for age, household and plan to {} a year",
            premium.base_premium, premium.final_annual_premium
        ),
    );

    let subsidy_tables = tables.subsidy();
    let poverty_line = subsidy_tables.poverty_line.for_household(household_size);
    let income_ratio = ratio_or_zero(household_income, poverty_line);
    let resolution = subsidy_tables.schedule.resolve(income_ratio);
    let annual_subsidy = premium.final_annual_premium * resolution.subsidy_fraction;
    let net_annual = premium.final_annual_premium - annual_subsidy;

    debug!(
        income_ratio = %round_rate(income_ratio),
        eligible = resolution.eligible,
        tier = ?resolution.tier,
        "Subsidy resolved"
    );

    audit.record(
        "subsidy",
        "Premium Subsidy",
        &format!("{}.subsidy.tiers", tables.tax_year),
        serde_json::json!({
            "household_income": household_income,
            "household_size": household_size,
            "poverty_line": poverty_line,
            "income_ratio": round_rate(income_ratio),
        }),
        serde_json::json!({
            "eligible": resolution.eligible,
            "tier": resolution.tier,
            "subsidy_fraction": resolution.subsidy_fraction,
            "annual_subsidy": round_money(annual_subsidy),
        }),
        if resolution.eligible {
            format!(
                "Income is {} times the poverty line of {}; the subsidy covers {} of the premium",
                round_rate(income_ratio),
                poverty_line,
                resolution.subsidy_fraction
            )
        } else {
            format!(
                "Income is {} times the poverty line of {}, outside every subsidy tier",
                round_rate(income_ratio),
                poverty_line
            )
        },
    );

    Ok(HealthInsuranceQuote {
        age: household.age,
        adults: household.adults,
        children: household.children,
        plan_tier: household.tier,
        subsidy: SubsidySummary {
            household_income: round_money(household_income),
            household_size,
            poverty_line,
            resolution: SubsidyResolution {
                income_ratio: round_rate(income_ratio),
                ..resolution
            },
            annual_subsidy: round_money(annual_subsidy),
            monthly_subsidy: round_money(annual_subsidy / MONTHS_PER_YEAR),
        },
        premium,
        net_annual_premium: round_money(net_annual),
        net_monthly_premium: round_money(net_annual / MONTHS_PER_YEAR),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::test_support::{dec, tables_2024};
    use crate::models::CalculatorInputs;

    fn run(inputs: &CalculatorInputs) -> HealthInsuranceQuote {
        let mut reader = InputReader::new(inputs);
        let mut audit = AuditLog::new();
        calculate(&mut reader, tables_2024(), &mut audit).unwrap()
    }

    #[test]
    fn test_single_adult_with_subsidy() {
        let inputs = CalculatorInputs::new()
            .with("age", 40)
            .with("household_income", 30000);
        let quote = run(&inputs);

        // 5400 * 1.135
        assert_eq!(quote.premium.final_annual_premium, dec("6129"));
        assert_eq!(quote.premium.final_monthly_premium, dec("510.75"));

        // 30000 / 15060 = 1.99, tier 2.
        assert!(quote.subsidy.resolution.eligible);
        assert_eq!(quote.subsidy.resolution.tier, Some(2));
        assert_eq!(quote.subsidy.annual_subsidy, dec("4596.75"));
        assert_eq!(quote.net_annual_premium, dec("1532.25"));
        assert_eq!(quote.net_monthly_premium, dec("127.69"));
    }

    #[test]
    fn test_income_above_tiers_gets_no_subsidy() {
        let inputs = CalculatorInputs::new()
            .with("age", 40)
            .with("household_income", 120000);
        let quote = run(&inputs);
        assert!(!quote.subsidy.resolution.eligible);
        assert_eq!(quote.subsidy.annual_subsidy, Decimal::ZERO);
        assert_eq!(quote.net_annual_premium, quote.premium.final_annual_premium);
    }

    #[test]
    fn test_family_poverty_line_uses_household_size() {
        let inputs = CalculatorInputs::new()
            .with("age", 35)
            .with("adults", 2)
            .with("children", 2)
            .with("household_income", 62400);
        let quote = run(&inputs);

        // 15060 + 3 * 5380 = 31200; 62400 is exactly 2.0, the lower tier.
        assert_eq!(quote.subsidy.household_size, 4);
        assert_eq!(quote.subsidy.poverty_line, dec("31200"));
        assert_eq!(quote.subsidy.resolution.tier, Some(2));
        assert_eq!(quote.subsidy.resolution.subsidy_fraction, dec("0.75"));
    }

    #[test]
    fn test_family_premium_scales_by_members() {
        let inputs = CalculatorInputs::new()
            .with("age", 22)
            .with("adults", 2)
            .with("children", 1);
        let quote = run(&inputs);
        // 5400 * 2.4
        assert_eq!(quote.premium.adjusted_premium, dec("12960"));
    }

    #[test]
    fn test_tobacco_and_tier_then_dental() {
        let inputs = CalculatorInputs::new()
            .with("age", 22)
            .with("tobacco", true)
            .with("plan_tier", "gold")
            .with("dental", true);
        let quote = run(&inputs);
        // 5400 * 1.2 * 1.2 + 360
        assert_eq!(quote.premium.final_annual_premium, dec("8136"));
    }

    #[test]
    fn test_only_three_children_are_charged() {
        let three = run(&CalculatorInputs::new().with("age", 22).with("children", 3));
        let six = run(&CalculatorInputs::new().with("age", 22).with("children", 6));
        // 5400 * (1 + 3 * 0.4)
        assert_eq!(three.premium.adjusted_premium, dec("11880"));
        assert_eq!(six.premium.adjusted_premium, three.premium.adjusted_premium);
        assert_eq!(six.subsidy.household_size, 7);
    }

    #[test]
    fn test_large_households_price_without_overflow() {
        let inputs = CalculatorInputs::new()
            .with("age", 22)
            .with("adults", 1_000_000)
            .with("children", 1_000_000)
            .with("dental", true)
            .with("vision", true);
        let quote = run(&inputs);
        assert_eq!(quote.subsidy.household_size, 2_000_000);
        assert!(quote.premium.final_annual_premium > Decimal::ZERO);

        let inputs = CalculatorInputs::new()
            .with("children", 20_000_000)
            .with("dental", true);
        let mut reader = InputReader::new(&inputs);
        let mut audit = AuditLog::new();
        let quote = calculate(&mut reader, tables_2024(), &mut audit).unwrap();
        assert_eq!(quote.subsidy.household_size, 1);
        assert_eq!(reader.into_warnings()[0].code, crate::models::INPUT_DEFAULTED);
    }
}
