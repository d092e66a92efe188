//! Term life insurance premium estimate.
//!
//! The base premium is a rate per 1,000 of cover for the applicant's age
//! band. Risk factors then scale it and riders are added on top.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{AddOn, PremiumBreakdown, RiskFactor, always, price};
use crate::error::EngineResult;
use crate::models::{AuditLog, InputReader, Money, round_money};

use super::{not_computable, read_option};

/// Oldest age at which term cover is quoted.
const MAX_AGE: u32 = 85;
const DEFAULT_TERM_YEARS: u32 = 20;
const THOUSAND: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Annual premium per 1,000 of cover, by age band upper bound.
const RATE_PER_THOUSAND: [(u32, Decimal); 6] = [
    (29, Decimal::from_parts(75, 0, 0, false, 2)),
    (39, Decimal::from_parts(95, 0, 0, false, 2)),
    (49, Decimal::from_parts(185, 0, 0, false, 2)),
    (59, Decimal::from_parts(440, 0, 0, false, 2)),
    (69, Decimal::from_parts(1150, 0, 0, false, 2)),
    (MAX_AGE, Decimal::from_parts(2800, 0, 0, false, 2)),
];

/// Self-reported health class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthRating {
    /// Preferred plus.
    Excellent,
    /// Standard.
    Good,
    /// Standard plus a table rating.
    Average,
    /// Substandard.
    Poor,
}

impl HealthRating {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "excellent" | "preferred" => Some(HealthRating::Excellent),
            "good" | "standard" => Some(HealthRating::Good),
            "average" | "fair" => Some(HealthRating::Average),
            "poor" => Some(HealthRating::Poor),
            _ => None,
        }
    }

    fn multiplier(&self) -> Decimal {
        match self {
            HealthRating::Excellent => Decimal::new(85, 2),
            HealthRating::Good => Decimal::ONE,
            HealthRating::Average => Decimal::new(125, 2),
            HealthRating::Poor => Decimal::new(175, 2),
        }
    }
}

#[derive(Debug)]
struct Applicant {
    coverage: Money,
    term_years: u32,
    male: bool,
    smoker: bool,
    health: HealthRating,
    hazardous_occupation: bool,
    critical_illness_rider: bool,
    accidental_death_rider: bool,
    waiver_of_premium: bool,
}

fn term_multiplier(applicant: &Applicant) -> Decimal {
    match applicant.term_years {
        0..=10 => Decimal::new(80, 2),
        11..=20 => Decimal::ONE,
        21..=30 => Decimal::new(130, 2),
        _ => Decimal::new(160, 2),
    }
}

fn factors() -> Vec<RiskFactor<Applicant>> {
    vec![
        RiskFactor::multiply_by("term_length", "Term length", term_multiplier, |a: &Applicant| {
            a.term_years != DEFAULT_TERM_YEARS
        }),
        RiskFactor::multiply("male", "Male applicant", Decimal::new(110, 2), |a: &Applicant| a.male),
        RiskFactor::multiply("smoker", "Tobacco use", Decimal::new(250, 2), |a: &Applicant| a.smoker),
        RiskFactor::multiply_by(
            "health_rating",
            "Health class",
            |a: &Applicant| a.health.multiplier(),
            |a: &Applicant| a.health != HealthRating::Good,
        ),
        RiskFactor::multiply(
            "hazardous_occupation",
            "Hazardous occupation",
            Decimal::new(135, 2),
            |a: &Applicant| a.hazardous_occupation,
        ),
        RiskFactor::add(
            "critical_illness_rider",
            "Critical illness rider",
            AddOn::FractionOfBase(Decimal::new(30, 2)),
            |a: &Applicant| a.critical_illness_rider,
        ),
        RiskFactor::add(
            "accidental_death_rider",
            "Accidental death rider",
            AddOn::Computed(|a: &Applicant| a.coverage / THOUSAND * Decimal::new(12, 2)),
            |a: &Applicant| a.accidental_death_rider,
        ),
        RiskFactor::add(
            "waiver_of_premium",
            "Waiver of premium",
            AddOn::FractionOfAdjusted(Decimal::new(6, 2)),
            |a: &Applicant| a.waiver_of_premium,
        ),
        RiskFactor::add("policy_fee", "Policy fee", AddOn::Flat(Decimal::from(75)), always),
    ]
}

/// The term life quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeInsuranceQuote {
    /// Applicant age.
    pub age: u32,
    /// Death benefit.
    pub coverage_amount: Money,
    /// Length of the term.
    pub term_years: u32,
    /// Health class used.
    pub health_rating: HealthRating,
    /// Base rate per 1,000 of cover for the age band.
    pub rate_per_thousand: Decimal,
    /// The priced premium.
    pub premium: PremiumBreakdown,
}

pub(crate) fn calculate(reader: &mut InputReader<'_>, audit: &mut AuditLog) -> EngineResult<LifeInsuranceQuote> {
    let age = reader.count("age");
    let coverage = reader.money("coverage_amount");
    let term_years = match reader.count("term_years") {
        0 => DEFAULT_TERM_YEARS,
        years => years,
    };
    let male = reader.choice("gender").is_some_and(|g| g == "male" || g == "m");
    let applicant = Applicant {
        coverage,
        term_years,
        male,
        smoker: reader.flag("smoker"),
        health: read_option(reader, "health_rating", HealthRating::Good, HealthRating::parse),
        hazardous_occupation: reader.flag("hazardous_occupation"),
        critical_illness_rider: reader.flag("critical_illness_rider"),
        accidental_death_rider: reader.flag("accidental_death_rider"),
        waiver_of_premium: reader.flag("waiver_of_premium"),
    };

    let rate_per_thousand = RATE_PER_THOUSAND
        .iter()
        .find(|(max_age, _)| age <= *max_age)
        .map(|(_, rate)| *rate)
        .ok_or_else(|| not_computable(format!("Term life cover is not quoted past age {}", MAX_AGE)))?;

    let base = coverage / THOUSAND * rate_per_thousand;
    let premium = price(base, &factors(), &applicant)
        .ok_or_else(|| not_computable("Enter a coverage amount above zero"))?
        .rounded();

    audit.record(
        "life_premium",
        "Term Life Premium",
        "rate per 1,000 by age band",
        serde_json::json!({
            "age": age,
            "coverage_amount": coverage,
            "rate_per_thousand": rate_per_thousand,
            "term_years": term_years,
        }),
        serde_json::json!({
            "base_premium": premium.base_premium,
            "final_annual_premium": premium.final_annual_premium,
            "factors_applied": premium.contributions.iter().filter(|c| c.applied).count(),
        }),
        format!(
            "Base {} ({} per 1,000 at age {}) adjusted by risk factors and riders to {} a year",
            premium.base_premium, rate_per_thousand, age, premium.final_annual_premium
        ),
    );

    Ok(LifeInsuranceQuote {
        age,
        coverage_amount: round_money(coverage),
        term_years,
        health_rating: applicant.health,
        rate_per_thousand,
        premium,
    })
}
