//! Flat-rate charges with an annual wage cap and an additional rate above a
//! threshold.
//!
//! This models payroll taxes that are withheld per paycheck but capped on
//! the *annual* total, such as Social Security (6.2% up to the wage base)
//! and Medicare (1.45% on all wages plus 0.9% Additional Medicare Tax above
//! a threshold).
//!
//! ## Rule semantics
//!
//! - The base rate applies only to the part of the amount at or below the
//!   cap, after accounting for wages already earned this year.
//! - The additional rate applies only to the part of the cumulative total
//!   above the threshold, independently of the cap.
//! - Once prior wages reach the cap, the base contribution is exactly zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{Money, Rate};

/// A flat rate with an optional cap and an optional additional-rate rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CappedRateRule {
    /// Base rate applied to wages at or below the cap.
    pub rate: Rate,
    /// Annual ceiling for the base rate; `None` means uncapped.
    #[serde(default)]
    pub wage_cap: Option<Money>,
    /// Rate applied to cumulative wages above `additional_threshold`.
    #[serde(default)]
    pub additional_rate: Rate,
    /// Threshold above which `additional_rate` applies.
    #[serde(default)]
    pub additional_threshold: Option<Money>,
}

impl CappedRateRule {
    /// Validates a rule. Rates must be in `[0, 1]`; a cap or threshold, when
    /// present, must be positive.
    pub fn new(
        rate: Rate,
        wage_cap: Option<Money>,
        additional_rate: Rate,
        additional_threshold: Option<Money>,
    ) -> EngineResult<Self> {
        let rule = Self {
            rate,
            wage_cap,
            additional_rate,
            additional_threshold,
        };
        rule.validate("capped_rate")?;
        Ok(rule)
    }

    /// A plain flat rate with no cap and no additional rate.
    pub fn flat(rate: Rate) -> Self {
        Self {
            rate,
            wage_cap: None,
            additional_rate: Decimal::ZERO,
            additional_threshold: None,
        }
    }

    /// Returns a copy of the rule with a different additional-rate threshold.
    pub fn with_additional_threshold(self, threshold: Option<Money>) -> Self {
        Self {
            additional_threshold: threshold,
            ..self
        }
    }

    /// Checks the rule, naming `table` in any error.
    pub fn validate(&self, table: &str) -> EngineResult<()> {
        for (name, rate) in [("rate", self.rate), ("additional_rate", self.additional_rate)] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(EngineError::invalid_table(
                    table,
                    format!("{} {} is outside [0, 1]", name, rate),
                ));
            }
        }
        for (name, bound) in [
            ("wage_cap", self.wage_cap),
            ("additional_threshold", self.additional_threshold),
        ] {
            if bound.is_some_and(|b| b <= Decimal::ZERO) {
                return Err(EngineError::invalid_table(
                    table,
                    format!("{} must be positive", name),
                ));
            }
        }
        Ok(())
    }
}

/// The breakdown of one capped-rate application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CappedRateResult {
    /// Portion of the amount still under the cap.
    pub taxable_for_cap: Money,
    /// Base-rate contribution.
    pub base: Money,
    /// Portion of the amount above the additional-rate threshold.
    pub taxable_for_additional: Money,
    /// Additional-rate contribution.
    pub additional: Money,
    /// `base + additional`.
    pub total: Money,
    /// True when prior wages plus this amount reached the cap.
    pub cap_reached: bool,
}

/// Applies `rule` to `amount`, given wages already accumulated this year.
///
/// # Example
///
/// ```
/// use finance_calc_engine::calculation::{CappedRateRule, apply_capped_rate};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let dec = |s: &str| Decimal::from_str(s).unwrap();
/// let social_security = CappedRateRule::new(dec("0.062"), Some(dec("168600")), Decimal::ZERO, None).unwrap();
///
/// // Already at the cap: nothing more is withheld.
/// let result = apply_capped_rate(dec("10000"), &social_security, dec("168600"));
/// assert_eq!(result.base, Decimal::ZERO);
/// ```
pub fn apply_capped_rate(amount: Money, rule: &CappedRateRule, prior_amount: Money) -> CappedRateResult {
    let amount = amount.max(Decimal::ZERO);
    let prior_amount = prior_amount.max(Decimal::ZERO);

    let (taxable_for_cap, cap_reached) = match rule.wage_cap {
        Some(cap) => {
            let room = (cap - prior_amount).max(Decimal::ZERO);
            (amount.min(room), prior_amount + amount >= cap)
        }
        None => (amount, false),
    };
    let base = taxable_for_cap * rule.rate;

    let taxable_for_additional = match rule.additional_threshold {
        Some(threshold) => (prior_amount + amount - threshold)
            .max(Decimal::ZERO)
            .min(amount),
        None => Decimal::ZERO,
    };
    let additional = taxable_for_additional * rule.additional_rate;

    CappedRateResult {
        taxable_for_cap,
        base,
        taxable_for_additional,
        additional,
        total: base + additional,
        cap_reached,
    }
}
