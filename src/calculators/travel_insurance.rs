//! Single-trip travel insurance estimate.
//!
//! Priced per trip: the "annual" premium in the breakdown is the trip premium.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{AddOn, PremiumBreakdown, RiskFactor, price};
use crate::error::EngineResult;
use crate::models::{AuditLog, InputReader, Money, checked_ratio, round_money};

use super::{not_computable, read_option};

/// Share of the insured trip cost charged before adjustments.
const BASE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
const RENTAL_CAR_PER_DAY: Decimal = Decimal::from_parts(9, 0, 0, false, 0);

/// Where the trip goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Within the home country.
    Domestic,
    /// Europe; the reference region.
    Europe,
    /// Asia and Oceania.
    Asia,
    /// Anywhere, including high-cost medical regions.
    Worldwide,
}

impl Destination {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "domestic" | "local" => Some(Destination::Domestic),
            "europe" => Some(Destination::Europe),
            "asia" | "oceania" => Some(Destination::Asia),
            "worldwide" | "international" | "global" => Some(Destination::Worldwide),
            _ => None,
        }
    }

    fn multiplier(&self) -> Decimal {
        match self {
            Destination::Domestic => Decimal::new(70, 2),
            Destination::Europe => Decimal::ONE,
            Destination::Asia => Decimal::new(110, 2),
            Destination::Worldwide => Decimal::new(130, 2),
        }
    }
}

/// Breadth of cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLevel {
    /// Medical and cancellation only.
    Basic,
    /// Reference cover.
    Standard,
    /// Higher limits and baggage cover.
    Comprehensive,
}

impl CoverageLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "basic" => Some(CoverageLevel::Basic),
            "standard" => Some(CoverageLevel::Standard),
            "comprehensive" | "premium" => Some(CoverageLevel::Comprehensive),
            _ => None,
        }
    }

    fn multiplier(&self) -> Decimal {
        match self {
            CoverageLevel::Basic => Decimal::new(75, 2),
            CoverageLevel::Standard => Decimal::ONE,
            CoverageLevel::Comprehensive => Decimal::new(135, 2),
        }
    }
}

#[derive(Debug)]
struct Trip {
    trip_days: u32,
    travelers: u32,
    oldest_age: u32,
    destination: Destination,
    coverage: CoverageLevel,
    adventure_sports: bool,
    pre_existing_conditions: bool,
    cancel_for_any_reason: bool,
    rental_car: bool,
}

fn age_multiplier(trip: &Trip) -> Decimal {
    match trip.oldest_age {
        0..=39 => Decimal::ONE,
        40..=59 => Decimal::new(125, 2),
        60..=69 => Decimal::new(160, 2),
        _ => Decimal::new(220, 2),
    }
}

fn duration_multiplier(trip: &Trip) -> Decimal {
    match trip.trip_days {
        0..=7 => Decimal::ONE,
        8..=14 => Decimal::new(110, 2),
        15..=30 => Decimal::new(130, 2),
        _ => Decimal::new(160, 2),
    }
}

fn factors() -> Vec<RiskFactor<Trip>> {
    vec![
        RiskFactor::multiply_by(
            "travelers",
            "Travelers",
            |t: &Trip| Decimal::from(t.travelers),
            |t: &Trip| t.travelers > 1,
        ),
        RiskFactor::multiply_by("traveler_age", "Oldest traveler age", age_multiplier, |t: &Trip| {
            t.oldest_age >= 40
        }),
        RiskFactor::multiply_by("trip_length", "Trip length", duration_multiplier, |t: &Trip| {
            t.trip_days > 7
        }),
        RiskFactor::multiply_by(
            "destination",
            "Destination",
            |t: &Trip| t.destination.multiplier(),
            |t: &Trip| t.destination != Destination::Europe,
        ),
        RiskFactor::multiply_by(
            "coverage_level",
            "Coverage level",
            |t: &Trip| t.coverage.multiplier(),
            |t: &Trip| t.coverage != CoverageLevel::Standard,
        ),
        RiskFactor::multiply(
            "adventure_sports",
            "Adventure sports",
            Decimal::new(125, 2),
            |t: &Trip| t.adventure_sports,
        ),
        RiskFactor::multiply(
            "pre_existing_conditions",
            "Pre-existing conditions",
            Decimal::new(115, 2),
            |t: &Trip| t.pre_existing_conditions,
        ),
        RiskFactor::add(
            "cancel_for_any_reason",
            "Cancel for any reason",
            AddOn::FractionOfAdjusted(Decimal::new(40, 2)),
            |t: &Trip| t.cancel_for_any_reason,
        ),
        RiskFactor::add(
            "rental_car",
            "Rental car damage",
            AddOn::Computed(|t: &Trip| RENTAL_CAR_PER_DAY * Decimal::from(t.trip_days.max(1))),
            |t: &Trip| t.rental_car,
        ),
    ]
}

/// The travel insurance quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelInsuranceQuote {
    /// Insured, non-refundable trip cost.
    pub trip_cost: Money,
    /// Trip length in days.
    pub trip_days: u32,
    /// Number of travelers.
    pub travelers: u32,
    /// Destination region.
    pub destination: Destination,
    /// Coverage level.
    pub coverage_level: CoverageLevel,
    /// The priced premium for the trip.
    pub premium: PremiumBreakdown,
    /// Premium as a share of the trip cost, in percent.
    pub cost_percent: Decimal,
}

pub(crate) fn calculate(reader: &mut InputReader<'_>, audit: &mut AuditLog) -> EngineResult<TravelInsuranceQuote> {
    let trip_cost = reader.money("trip_cost");
    let trip = Trip {
        trip_days: reader.count("trip_days"),
        travelers: reader.count("travelers").max(1),
        oldest_age: reader.count("oldest_age"),
        destination: read_option(reader, "destination", Destination::Worldwide, Destination::parse),
        coverage: read_option(reader, "coverage_level", CoverageLevel::Standard, CoverageLevel::parse),
        adventure_sports: reader.flag("adventure_sports"),
        pre_existing_conditions: reader.flag("pre_existing_conditions"),
        cancel_for_any_reason: reader.flag("cancel_for_any_reason"),
        rental_car: reader.flag("rental_car"),
    };

    let base = trip_cost * BASE_RATE;
    let premium = price(base, &factors(), &trip)
        .ok_or_else(|| not_computable("Enter the trip cost to insure"))?
        .rounded();
    let cost_percent = checked_ratio(premium.final_annual_premium, trip_cost)
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .map(round_money)
        .ok_or_else(|| not_computable("The trip cost is too small to insure"))?;

    audit.record(
        "travel_premium",
        "Travel Premium",
        "trip cost x base rate",
        serde_json::json!({
            "trip_cost": trip_cost,
            "base_rate": BASE_RATE,
            "trip_days": trip.trip_days,
            "travelers": trip.travelers,
        }),
        serde_json::json!({
            "base_premium": premium.base_premium,
            "final_premium": premium.final_annual_premium,
        }),
        format!(
            "{} of a {} trip, adjusted for travelers, age, length and cover to {}",
            BASE_RATE, trip_cost, premium.final_annual_premium
        ),
    );

    Ok(TravelInsuranceQuote {
        trip_cost: round_money(trip_cost),
        trip_days: trip.trip_days,
        travelers: trip.travelers,
        destination: trip.destination,
        coverage_level: trip.coverage,
        premium,
        cost_percent,
    })
}
