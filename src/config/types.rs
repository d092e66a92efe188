//! Configuration types for the rate tables.
//!
//! Raw structures are deserialized from YAML and then validated into the
//! domain tables consumed by the calculation primitives.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{
    BracketSchedule, CappedRateRule, RateBracket, SubsidySchedule, SubsidyTier,
};
use crate::error::{EngineError, EngineResult};
use crate::models::{Money, Rate};

/// Metadata about the jurisdiction whose tables are loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionMetadata {
    /// Short code (e.g., "US").
    pub code: String,
    /// The human-readable name of the jurisdiction.
    pub name: String,
    /// Currency code used by every amount in the tables.
    pub currency: String,
    /// URL of the published rate source.
    pub source_url: String,
}

/// Federal filing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    /// Single filer.
    Single,
    /// Married filing jointly.
    MarriedJoint,
    /// Married filing separately.
    MarriedSeparate,
    /// Head of household.
    HeadOfHousehold,
}

impl FilingStatus {
    /// Every filing status; each must be present in a table set.
    pub const ALL: [FilingStatus; 4] = [
        FilingStatus::Single,
        FilingStatus::MarriedJoint,
        FilingStatus::MarriedSeparate,
        FilingStatus::HeadOfHousehold,
    ];

    /// The snake_case key used in tables and forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilingStatus::Single => "single",
            FilingStatus::MarriedJoint => "married_joint",
            FilingStatus::MarriedSeparate => "married_separate",
            FilingStatus::HeadOfHousehold => "head_of_household",
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilingStatus {
    type Err = ();

    /// Accepts the table keys plus the spellings forms commonly submit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "single" => Ok(FilingStatus::Single),
            "married_joint" | "married" | "married_filing_jointly" | "mfj" => {
                Ok(FilingStatus::MarriedJoint)
            }
            "married_separate" | "married_filing_separately" | "mfs" => {
                Ok(FilingStatus::MarriedSeparate)
            }
            "head_of_household" | "hoh" => Ok(FilingStatus::HeadOfHousehold),
            _ => Err(()),
        }
    }
}

/// Federal income-tax schedule for one filing status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FederalSchedule {
    /// Deduction subtracted from annual taxable wages before the brackets.
    pub standard_deduction: Money,
    /// The progressive brackets.
    pub brackets: BracketSchedule,
}

/// Payroll-tax rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollRules {
    /// Social Security: flat rate up to the annual wage base.
    pub social_security: CappedRateRule,
    /// Medicare: uncapped flat rate plus the additional rate.
    pub medicare: CappedRateRule,
    /// Additional Medicare threshold per filing status.
    pub additional_medicare_thresholds: HashMap<FilingStatus, Money>,
}

impl PayrollRules {
    /// The Medicare rule with the threshold for `status` in place.
    pub fn medicare_for(&self, status: FilingStatus) -> CappedRateRule {
        match self.additional_medicare_thresholds.get(&status) {
            Some(threshold) => self.medicare.with_additional_threshold(Some(*threshold)),
            None => self.medicare,
        }
    }
}

/// Poverty line used as the subsidy threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PovertyLine {
    /// Line for a household of one.
    pub base: Money,
    /// Added for each person beyond the first.
    pub per_additional_person: Money,
}

impl PovertyLine {
    /// The line for a household of `size` people (at least one).
    pub fn for_household(&self, size: u32) -> Money {
        let extra = size.max(1) - 1;
        self.base + self.per_additional_person * Decimal::from(extra)
    }
}

/// Subsidy tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubsidyTables {
    /// The poverty line.
    pub poverty_line: PovertyLine,
    /// Eligibility floor and tiers.
    pub schedule: SubsidySchedule,
}

/// Every table in effect for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateTables {
    /// The tax year the tables apply to.
    pub tax_year: i32,
    federal: HashMap<FilingStatus, FederalSchedule>,
    payroll: PayrollRules,
    states: HashMap<String, Rate>,
    subsidy: SubsidyTables,
}

impl RateTables {
    /// The federal schedule for `status`.
    pub fn federal(&self, status: FilingStatus) -> &FederalSchedule {
        // Presence of every status is checked when the tables are built.
        &self.federal[&status]
    }

    /// Payroll-tax rules.
    pub fn payroll(&self) -> &PayrollRules {
        &self.payroll
    }

    /// The flat rate for a state code, case-insensitive. `None` if unknown.
    pub fn state_rate(&self, code: &str) -> Option<Rate> {
        self.states.get(&code.trim().to_ascii_uppercase()).copied()
    }

    /// Number of states in the table.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Subsidy tables.
    pub fn subsidy(&self) -> &SubsidyTables {
        &self.subsidy
    }
}

/// Federal schedule as written in a year file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawFederalSchedule {
    pub standard_deduction: Money,
    pub brackets: Vec<RateBracket>,
}

/// Payroll section as written in a year file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPayroll {
    pub social_security: CappedRateRule,
    pub medicare: CappedRateRule,
    #[serde(default)]
    pub additional_medicare_thresholds: HashMap<FilingStatus, Money>,
}

/// Subsidy section as written in a year file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSubsidy {
    pub poverty_line: PovertyLine,
    pub eligibility_floor: Decimal,
    pub tiers: Vec<SubsidyTier>,
}

/// A `years/<year>.yaml` file.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawYearTables {
    pub tax_year: i32,
    pub federal: HashMap<FilingStatus, RawFederalSchedule>,
    pub payroll: RawPayroll,
    pub states: HashMap<String, Rate>,
    pub subsidy: RawSubsidy,
}

impl RawYearTables {
    /// Validates every table, naming the offending one in any error.
    pub(crate) fn validate(self) -> EngineResult<RateTables> {
        let year = self.tax_year;

        let mut federal = HashMap::new();
        for status in FilingStatus::ALL {
            let table = format!("{}.federal.{}", year, status);
            let raw = self.federal.get(&status).ok_or_else(|| {
                EngineError::invalid_table(&table, "missing schedule for filing status")
            })?;
            if raw.standard_deduction < Decimal::ZERO {
                return Err(EngineError::invalid_table(&table, "standard deduction is negative"));
            }
            let brackets = BracketSchedule::named(&table, raw.brackets.clone())?;
            federal.insert(
                status,
                FederalSchedule {
                    standard_deduction: raw.standard_deduction,
                    brackets,
                },
            );
        }

        self.payroll
            .social_security
            .validate(&format!("{}.payroll.social_security", year))?;
        self.payroll
            .medicare
            .validate(&format!("{}.payroll.medicare", year))?;
        for (status, threshold) in &self.payroll.additional_medicare_thresholds {
            if *threshold <= Decimal::ZERO {
                return Err(EngineError::invalid_table(
                    format!("{}.payroll.additional_medicare_thresholds", year),
                    format!("threshold for {} must be positive", status),
                ));
            }
        }

        let mut states = HashMap::with_capacity(self.states.len());
        for (code, rate) in self.states {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(EngineError::invalid_table(
                    format!("{}.states", year),
                    format!("rate {} for {} is outside [0, 1]", rate, code),
                ));
            }
            states.insert(code.trim().to_ascii_uppercase(), rate);
        }

        let poverty_line = self.subsidy.poverty_line;
        if poverty_line.base <= Decimal::ZERO || poverty_line.per_additional_person < Decimal::ZERO {
            return Err(EngineError::invalid_table(
                format!("{}.subsidy.poverty_line", year),
                "poverty line must be positive",
            ));
        }
        let schedule = SubsidySchedule::new(self.subsidy.eligibility_floor, self.subsidy.tiers)
            .map_err(|err| match err {
                EngineError::InvalidTable { message, .. } => {
                    EngineError::invalid_table(format!("{}.subsidy.tiers", year), message)
                }
                other => other,
            })?;

        Ok(RateTables {
            tax_year: year,
            federal,
            payroll: PayrollRules {
                social_security: self.payroll.social_security,
                medicare: self.payroll.medicare,
                additional_medicare_thresholds: self.payroll.additional_medicare_thresholds,
            },
            states,
            subsidy: SubsidyTables {
                poverty_line,
                schedule,
            },
        })
    }
}
