//! Tiered subsidy eligibility.
//!
//! The subsidy fraction is looked up from the ratio of household income to a
//! threshold (typically the poverty line for the household size). Tiers are
//! ordered by ascending `max_ratio`; the first tier whose `max_ratio` is not
//! exceeded wins. A ratio exactly on a boundary resolves to the lower tier.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::Rate;

/// One subsidy tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidyTier {
    /// Highest income ratio (inclusive) covered by this tier.
    pub max_ratio: Decimal,
    /// Fraction of the premium covered, in `[0, 1]`.
    pub subsidy_fraction: Rate,
}

/// The outcome of a subsidy lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidyResolution {
    /// The ratio that was looked up.
    pub income_ratio: Decimal,
    /// Whether any tier covers the ratio.
    pub eligible: bool,
    /// Covered fraction; zero when not eligible.
    pub subsidy_fraction: Rate,
    /// 1-based index of the matching tier.
    pub tier: Option<usize>,
}

/// A validated, ordered tier table with an eligibility floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsidySchedule {
    eligibility_floor: Decimal,
    tiers: Vec<SubsidyTier>,
}

impl SubsidySchedule {
    /// Validates a schedule: at least one tier, strictly ascending
    /// `max_ratio` values all above the floor, fractions in `[0, 1]`.
    pub fn new(eligibility_floor: Decimal, tiers: Vec<SubsidyTier>) -> EngineResult<Self> {
        const TABLE: &str = "subsidy.tiers";
        if tiers.is_empty() {
            return Err(EngineError::invalid_table(TABLE, "no subsidy tiers"));
        }
        if eligibility_floor < Decimal::ZERO {
            return Err(EngineError::invalid_table(TABLE, "eligibility floor is negative"));
        }

        let mut previous = eligibility_floor;
        for (index, tier) in tiers.iter().enumerate() {
            // The first tier may start exactly at the floor.
            let out_of_order = if index == 0 {
                tier.max_ratio < previous
            } else {
                tier.max_ratio <= previous
            };
            if out_of_order {
                return Err(EngineError::invalid_table(
                    TABLE,
                    format!(
                        "tier {} max_ratio {} must exceed {}",
                        index + 1,
                        tier.max_ratio,
                        previous
                    ),
                ));
            }
            if tier.subsidy_fraction < Decimal::ZERO || tier.subsidy_fraction > Decimal::ONE {
                return Err(EngineError::invalid_table(
                    TABLE,
                    format!(
                        "tier {} subsidy fraction {} is outside [0, 1]",
                        index + 1,
                        tier.subsidy_fraction
                    ),
                ));
            }
            previous = tier.max_ratio;
        }

        Ok(Self {
            eligibility_floor,
            tiers,
        })
    }

    /// Lowest ratio that qualifies.
    pub fn eligibility_floor(&self) -> Decimal {
        self.eligibility_floor
    }

    /// The tiers in ascending order.
    pub fn tiers(&self) -> &[SubsidyTier] {
        &self.tiers
    }

    /// Looks up the subsidy for `income_ratio`.
    ///
    /// # Example
    ///
    /// ```
    /// use finance_calc_engine::calculation::{SubsidySchedule, SubsidyTier};
    /// use rust_decimal::Decimal;
    /// use std::str::FromStr;
    ///
    /// let dec = |s: &str| Decimal::from_str(s).unwrap();
    /// let schedule = SubsidySchedule::new(
    ///     dec("1.0"),
    ///     vec![
    ///         SubsidyTier { max_ratio: dec("2.0"), subsidy_fraction: dec("0.8") },
    ///         SubsidyTier { max_ratio: dec("4.0"), subsidy_fraction: dec("0.4") },
    ///     ],
    /// )
    /// .unwrap();
    ///
    /// // Exactly on a boundary: the lower, more generous tier.
    /// assert_eq!(schedule.resolve(dec("2.0")).subsidy_fraction, dec("0.8"));
    /// assert!(!schedule.resolve(dec("4.5")).eligible);
    /// ```
    pub fn resolve(&self, income_ratio: Decimal) -> SubsidyResolution {
        let not_eligible = SubsidyResolution {
            income_ratio,
            eligible: false,
            subsidy_fraction: Decimal::ZERO,
            tier: None,
        };
        if income_ratio < self.eligibility_floor {
            return not_eligible;
        }

        self.tiers
            .iter()
            .position(|tier| income_ratio <= tier.max_ratio)
            .map_or(not_eligible, |index| SubsidyResolution {
                income_ratio,
                eligible: true,
                subsidy_fraction: self.tiers[index].subsidy_fraction,
                tier: Some(index + 1),
            })
    }
}

impl<'de> Deserialize<'de> for SubsidySchedule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawSchedule {
            eligibility_floor: Decimal,
            tiers: Vec<SubsidyTier>,
        }

        let raw = RawSchedule::deserialize(deserializer)?;
        SubsidySchedule::new(raw.eligibility_floor, raw.tiers).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tier(max_ratio: &str, fraction: &str) -> SubsidyTier {
        SubsidyTier {
            max_ratio: dec(max_ratio),
            subsidy_fraction: dec(fraction),
        }
    }

    fn schedule() -> SubsidySchedule {
        SubsidySchedule::new(
            dec("1.0"),
            vec![
                tier("1.5", "0.90"),
                tier("2.0", "0.75"),
                tier("2.5", "0.60"),
                tier("3.0", "0.45"),
                tier("4.0", "0.30"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ratio_inside_tier() {
        let resolution = schedule().resolve(dec("1.75"));
        assert!(resolution.eligible);
        assert_eq!(resolution.subsidy_fraction, dec("0.75"));
        assert_eq!(resolution.tier, Some(2));
    }

    #[test]
    fn test_boundary_resolves_to_lower_tier() {
        let schedule = schedule();
        assert_eq!(schedule.resolve(dec("1.5")).tier, Some(1));
        assert_eq!(schedule.resolve(dec("2.0")).subsidy_fraction, dec("0.75"));
        assert_eq!(schedule.resolve(dec("2.0000001")).subsidy_fraction, dec("0.60"));
        assert_eq!(schedule.resolve(dec("4.0")).tier, Some(5));
    }

    #[test]
    fn test_below_floor_is_not_eligible() {
        let resolution = schedule().resolve(dec("0.99"));
        assert!(!resolution.eligible);
        assert_eq!(resolution.subsidy_fraction, Decimal::ZERO);
        assert_eq!(resolution.tier, None);
    }

    #[test]
    fn test_floor_itself_is_eligible() {
        assert!(schedule().resolve(dec("1.0")).eligible);
    }

    #[test]
    fn test_above_highest_tier_is_not_eligible() {
        let resolution = schedule().resolve(dec("4.01"));
        assert!(!resolution.eligible);
        assert_eq!(resolution.subsidy_fraction, Decimal::ZERO);
    }

    #[test]
    fn test_rejects_unordered_tiers() {
        let result = SubsidySchedule::new(dec("1.0"), vec![tier("3.0", "0.5"), tier("2.0", "0.7")]);
        assert!(matches!(result, Err(EngineError::InvalidTable { .. })));
    }

    #[test]
    fn test_rejects_fraction_above_one() {
        let result = SubsidySchedule::new(dec("1.0"), vec![tier("2.0", "1.2")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_empty_tiers() {
        assert!(SubsidySchedule::new(dec("1.0"), vec![]).is_err());
    }

    #[test]
    fn test_deserialize_validates_tiers() {
        let valid = r#"{
            "eligibility_floor": "1.0",
            "tiers": [
                { "max_ratio": "2.0", "subsidy_fraction": "0.8" },
                { "max_ratio": "4.0", "subsidy_fraction": "0.4" }
            ]
        }"#;
        let schedule: SubsidySchedule = serde_json::from_str(valid).unwrap();
        assert_eq!(schedule.tiers().len(), 2);

        let unordered = r#"{
            "eligibility_floor": "1.0",
            "tiers": [
                { "max_ratio": "4.0", "subsidy_fraction": "0.4" },
                { "max_ratio": "2.0", "subsidy_fraction": "0.8" }
            ]
        }"#;
        assert!(serde_json::from_str::<SubsidySchedule>(unordered).is_err());

        let over_one = r#"{
            "eligibility_floor": "1.0",
            "tiers": [{ "max_ratio": "2.0", "subsidy_fraction": "1.5" }]
        }"#;
        let err = serde_json::from_str::<SubsidySchedule>(over_one).unwrap_err();
        assert!(err.to_string().contains("outside [0, 1]"));
    }
}
