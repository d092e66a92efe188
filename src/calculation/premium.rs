//! Risk-factor premium pricing.
//!
//! A premium starts from a base amount and is adjusted by an ordered list of
//! [`RiskFactor`]s, each guarded by a condition over the calculator's inputs.
//!
//! ## Application order
//!
//! Factors are applied in a fixed canonical order regardless of how the list
//! is written:
//!
//! 1. Every multiplicative factor whose condition holds, in list order,
//!    scales the running premium.
//! 2. Every additive factor whose condition holds, in list order, adds its
//!    amount. Amounts expressed as a fraction of the premium use the
//!    *adjusted* premium (after all multipliers), so add-ons never depend on
//!    one another.
//!
//! Every factor appears in the breakdown, with a zero delta when its
//! condition did not match.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Money, Rate, round_money};

/// Months per year used for the monthly premium.
const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// Whether a factor scales or adds to the premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    /// Scales the running premium.
    Multiplicative,
    /// Adds an amount after all multipliers.
    Additive,
}

/// The magnitude of a multiplicative factor.
pub enum Multiplier<I> {
    /// A constant multiplier such as `1.5`.
    Fixed(Decimal),
    /// A multiplier derived from the inputs (e.g. per covered member).
    Computed(fn(&I) -> Decimal),
}

/// The amount of an additive factor.
pub enum AddOn<I> {
    /// A flat annual amount.
    Flat(Money),
    /// A fraction of the base premium.
    FractionOfBase(Rate),
    /// A fraction of the premium after all multiplicative factors.
    FractionOfAdjusted(Rate),
    /// An amount derived from the inputs (e.g. a share of the trip cost).
    Computed(fn(&I) -> Money),
}

/// What a factor does when its condition holds.
pub enum FactorEffect<I> {
    /// Multiply the running premium.
    Multiply(Multiplier<I>),
    /// Add an amount after all multipliers.
    Add(AddOn<I>),
}

/// A conditional pricing adjustment.
pub struct RiskFactor<I> {
    /// Stable identifier used in breakdowns.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// The adjustment applied when `condition` holds.
    pub effect: FactorEffect<I>,
    /// Predicate over the calculator's inputs.
    pub condition: fn(&I) -> bool,
}

impl<I> RiskFactor<I> {
    /// A constant multiplier applied when `condition` holds.
    pub fn multiply(id: &'static str, name: &'static str, magnitude: Decimal, condition: fn(&I) -> bool) -> Self {
        Self {
            id,
            name,
            effect: FactorEffect::Multiply(Multiplier::Fixed(magnitude)),
            condition,
        }
    }

    /// A multiplier computed from the inputs, applied when `condition` holds.
    pub fn multiply_by(
        id: &'static str,
        name: &'static str,
        magnitude: fn(&I) -> Decimal,
        condition: fn(&I) -> bool,
    ) -> Self {
        Self {
            id,
            name,
            effect: FactorEffect::Multiply(Multiplier::Computed(magnitude)),
            condition,
        }
    }

    /// An add-on applied when `condition` holds.
    pub fn add(id: &'static str, name: &'static str, amount: AddOn<I>, condition: fn(&I) -> bool) -> Self {
        Self {
            id,
            name,
            effect: FactorEffect::Add(amount),
            condition,
        }
    }

    /// Whether the factor multiplies or adds.
    pub fn kind(&self) -> FactorKind {
        match self.effect {
            FactorEffect::Multiply(_) => FactorKind::Multiplicative,
            FactorEffect::Add(_) => FactorKind::Additive,
        }
    }
}

impl<I> fmt::Debug for RiskFactor<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskFactor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Condition that always holds.
pub fn always<I>(_: &I) -> bool {
    true
}

/// The marginal change one factor made to the premium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorContribution {
    /// The factor's identifier.
    pub factor_id: String,
    /// The factor's display name.
    pub name: String,
    /// Multiplicative or additive.
    pub kind: FactorKind,
    /// Whether the factor's condition held.
    pub applied: bool,
    /// The multiplier or add-on amount that was used (zero when not applied).
    pub magnitude: Decimal,
    /// Change in the running premium caused by this factor.
    pub delta: Money,
}

/// The priced premium and how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumBreakdown {
    /// The starting premium.
    pub base_premium: Money,
    /// One entry per factor, in application order.
    pub contributions: Vec<FactorContribution>,
    /// Premium after all multiplicative factors.
    pub adjusted_premium: Money,
    /// Final annual premium, rounded to cents.
    pub final_annual_premium: Money,
    /// `final_annual_premium / 12`, rounded to cents.
    pub final_monthly_premium: Money,
}

impl PremiumBreakdown {
    /// Returns a copy with every intermediate amount rounded to cents.
    pub fn rounded(&self) -> Self {
        Self {
            base_premium: round_money(self.base_premium),
            contributions: self
                .contributions
                .iter()
                .map(|c| FactorContribution {
                    delta: round_money(c.delta),
                    ..c.clone()
                })
                .collect(),
            adjusted_premium: round_money(self.adjusted_premium),
            final_annual_premium: self.final_annual_premium,
            final_monthly_premium: self.final_monthly_premium,
        }
    }

    /// Sum of the deltas of every applied factor.
    ///
    /// This is taken before the zero floor: when credits exceed the premium,
    /// `base_premium + total_adjustment()` is negative while
    /// `final_annual_premium` is zero.
    pub fn total_adjustment(&self) -> Money {
        self.contributions.iter().map(|c| c.delta).sum()
    }
}

fn not_applied<I>(factor: &RiskFactor<I>) -> FactorContribution {
    FactorContribution {
        factor_id: factor.id.to_string(),
        name: factor.name.to_string(),
        kind: factor.kind(),
        applied: false,
        magnitude: Decimal::ZERO,
        delta: Decimal::ZERO,
    }
}

/// Prices a premium.
///
/// Returns `None` when `base` is not positive or an adjustment overflows.
/// The final premium is never negative, even if discounts exceed it.
///
/// # Example
///
/// ```
/// use finance_calc_engine::calculation::{AddOn, RiskFactor, always, price};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// struct Applicant { smoker: bool }
///
/// let dec = |s: &str| Decimal::from_str(s).unwrap();
/// let factors = vec![
///     RiskFactor::add("rider", "Critical illness rider", AddOn::FractionOfBase(dec("0.30")), always),
///     RiskFactor::multiply("smoker", "Smoker", dec("2.0"), |a: &Applicant| a.smoker),
/// ];
///
/// let breakdown = price(dec("1000"), &factors, &Applicant { smoker: true }).unwrap();
/// // Multipliers first: 1000 * 2.0 = 2000, then + 30% of base.
/// assert_eq!(breakdown.final_annual_premium, dec("2300"));
/// assert_eq!(breakdown.contributions[0].factor_id, "smoker");
/// ```
pub fn price<I>(base: Money, factors: &[RiskFactor<I>], inputs: &I) -> Option<PremiumBreakdown> {
    if base <= Decimal::ZERO {
        return None;
    }

    let mut contributions = Vec::with_capacity(factors.len());
    let mut running = base;

    for factor in factors {
        let FactorEffect::Multiply(multiplier) = &factor.effect else {
            continue;
        };
        if !(factor.condition)(inputs) {
            contributions.push(not_applied(factor));
            continue;
        }
        let magnitude = match multiplier {
            Multiplier::Fixed(value) => *value,
            Multiplier::Computed(compute) => compute(inputs),
        };
        let next = running.checked_mul(magnitude)?;
        contributions.push(FactorContribution {
            factor_id: factor.id.to_string(),
            name: factor.name.to_string(),
            kind: FactorKind::Multiplicative,
            applied: true,
            magnitude,
            delta: next - running,
        });
        running = next;
    }

    let adjusted_premium = running;

    for factor in factors {
        let FactorEffect::Add(add_on) = &factor.effect else {
            continue;
        };
        if !(factor.condition)(inputs) {
            contributions.push(not_applied(factor));
            continue;
        }
        let amount = match add_on {
            AddOn::Flat(amount) => *amount,
            AddOn::FractionOfBase(fraction) => base.checked_mul(*fraction)?,
            AddOn::FractionOfAdjusted(fraction) => adjusted_premium.checked_mul(*fraction)?,
            AddOn::Computed(compute) => compute(inputs),
        };
        running = running.checked_add(amount)?;
        contributions.push(FactorContribution {
            factor_id: factor.id.to_string(),
            name: factor.name.to_string(),
            kind: FactorKind::Additive,
            applied: true,
            magnitude: amount,
            delta: amount,
        });
    }

    let final_annual_premium = round_money(running.max(Decimal::ZERO));
    Some(PremiumBreakdown {
        base_premium: base,
        contributions,
        adjusted_premium,
        final_annual_premium,
        final_monthly_premium: round_money(final_annual_premium / MONTHS_PER_YEAR),
    })
}
