//! Progressive marginal-rate evaluation.
//!
//! A [`BracketSchedule`] partitions an amount into contiguous slices, each
//! charged at its own rate. Only the dollars inside a bracket are charged at
//! that bracket's rate; the result is never a flat-rate approximation.
//!
//! ## Schedule rules
//!
//! - At least one bracket.
//! - Finite upper bounds are positive and strictly ascending.
//! - Exactly one unbounded bracket, and it is the last.
//! - Every rate lies in `[0, 1]`.
//!
//! Schedules that break these rules are rejected when constructed, so an
//! evaluation can never silently under- or over-charge.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{Money, Rate};

/// One bracket of a progressive schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBracket {
    /// Upper bound of the bracket; `None` for the unbounded top bracket.
    #[serde(default)]
    pub upper_bound: Option<Money>,
    /// Rate applied to the slice inside this bracket.
    pub rate: Rate,
}

impl RateBracket {
    /// A bracket ending at `upper_bound`.
    pub fn bounded(upper_bound: Money, rate: Rate) -> Self {
        Self {
            upper_bound: Some(upper_bound),
            rate,
        }
    }

    /// The unbounded top bracket.
    pub fn unbounded(rate: Rate) -> Self {
        Self {
            upper_bound: None,
            rate,
        }
    }
}

/// The portion of an amount that fell inside one bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketLine {
    /// Lower bound of the bracket (exclusive).
    pub lower_bound: Money,
    /// Upper bound of the bracket; `None` for the top bracket.
    pub upper_bound: Option<Money>,
    /// The bracket's rate.
    pub rate: Rate,
    /// The slice of the amount taxed in this bracket.
    pub taxed_amount: Money,
    /// `taxed_amount * rate`.
    pub tax: Money,
}

/// The full result of evaluating an amount against a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketEvaluation {
    /// The amount that was evaluated (negative amounts are reported as zero).
    pub amount: Money,
    /// Sum of every bracket's tax.
    pub total: Money,
    /// Rate of the highest bracket the amount reached.
    pub marginal_rate: Rate,
    /// `total / amount`, or zero for a zero amount.
    pub effective_rate: Rate,
    /// One line per bracket the amount reached, in ascending order.
    pub lines: Vec<BracketLine>,
}

/// A validated progressive schedule.
///
/// # Example
///
/// ```
/// use finance_calc_engine::calculation::{BracketSchedule, RateBracket};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let dec = |s: &str| Decimal::from_str(s).unwrap();
/// let schedule = BracketSchedule::new(vec![
///     RateBracket::bounded(dec("10000"), dec("0.10")),
///     RateBracket::bounded(dec("40000"), dec("0.20")),
///     RateBracket::unbounded(dec("0.30")),
/// ])
/// .unwrap();
///
/// // 10000 * 10% + 30000 * 20% + 10000 * 30%
/// assert_eq!(schedule.evaluate(dec("50000")), dec("10000"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BracketSchedule {
    brackets: Vec<RateBracket>,
}

impl BracketSchedule {
    /// Validates and builds a schedule.
    ///
    /// Returns [`EngineError::InvalidTable`] when the brackets are empty,
    /// out of order, missing the unbounded top bracket, or carry a rate
    /// outside `[0, 1]`.
    pub fn new(brackets: Vec<RateBracket>) -> EngineResult<Self> {
        Self::named("brackets", brackets)
    }

    /// Like [`BracketSchedule::new`], naming the table in any error.
    pub fn named(table: &str, brackets: Vec<RateBracket>) -> EngineResult<Self> {
        if brackets.is_empty() {
            return Err(EngineError::invalid_table(table, "schedule has no brackets"));
        }

        let last = brackets.len() - 1;
        let mut previous = Decimal::ZERO;
        for (index, bracket) in brackets.iter().enumerate() {
            if bracket.rate < Decimal::ZERO || bracket.rate > Decimal::ONE {
                return Err(EngineError::invalid_table(
                    table,
                    format!("bracket {} has rate {} outside [0, 1]", index + 1, bracket.rate),
                ));
            }
            match bracket.upper_bound {
                None if index != last => {
                    return Err(EngineError::invalid_table(
                        table,
                        format!("bracket {} is unbounded but is not the last bracket", index + 1),
                    ));
                }
                None => {}
                Some(_) if index == last => {
                    return Err(EngineError::invalid_table(
                        table,
                        "last bracket must be unbounded",
                    ));
                }
                Some(bound) if bound <= previous => {
                    return Err(EngineError::invalid_table(
                        table,
                        format!(
                            "bracket {} upper bound {} does not exceed {}",
                            index + 1,
                            bound,
                            previous
                        ),
                    ));
                }
                Some(bound) => previous = bound,
            }
        }

        Ok(Self { brackets })
    }

    /// The brackets in ascending order.
    pub fn brackets(&self) -> &[RateBracket] {
        &self.brackets
    }

    /// Returns the progressive total for `amount`.
    pub fn evaluate(&self, amount: Money) -> Money {
        self.evaluate_detailed(amount).total
    }

    /// Evaluates `amount`, returning one line per bracket reached.
    ///
    /// Amounts at or below zero produce a zero total and no lines.
    pub fn evaluate_detailed(&self, amount: Money) -> BracketEvaluation {
        let mut lines = Vec::new();
        let mut total = Decimal::ZERO;
        let mut marginal_rate = Decimal::ZERO;

        if amount <= Decimal::ZERO {
            return BracketEvaluation {
                amount: Decimal::ZERO,
                total,
                marginal_rate,
                effective_rate: Decimal::ZERO,
                lines,
            };
        }

        let mut previous_bound = Decimal::ZERO;
        for bracket in &self.brackets {
            let top = match bracket.upper_bound {
                Some(bound) => amount.min(bound),
                None => amount,
            };
            let slice = (top - previous_bound).max(Decimal::ZERO);
            let tax = slice * bracket.rate;
            total += tax;
            marginal_rate = bracket.rate;
            lines.push(BracketLine {
                lower_bound: previous_bound,
                upper_bound: bracket.upper_bound,
                rate: bracket.rate,
                taxed_amount: slice,
                tax,
            });

            match bracket.upper_bound {
                Some(bound) if amount > bound => previous_bound = bound,
                _ => break,
            }
        }

        BracketEvaluation {
            amount,
            total,
            marginal_rate,
            effective_rate: total / amount,
            lines,
        }
    }
}

impl<'de> Deserialize<'de> for BracketSchedule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let brackets = Vec::<RateBracket>::deserialize(deserializer)?;
        BracketSchedule::new(brackets).map_err(serde::de::Error::custom)
    }
}
