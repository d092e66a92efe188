//! Calculation primitives for the financial calculation engine.
//!
//! Each primitive is a pure function of its inputs and an immutable rate
//! table: progressive bracket evaluation, capped flat-rate accumulation,
//! loan amortization, risk-factor premium pricing, and tiered subsidy lookup.
//! The calculators in [`crate::calculators`] sequence these.

mod amortization;
mod bracket;
mod capped_rate;
mod premium;
mod subsidy;

pub use amortization::{
    AmortizationEntries, AmortizationEntry, AmortizationSchedule, LoanTerms, YearSummary, amortize,
    periodic_payment, schedule,
};
pub use bracket::{BracketEvaluation, BracketLine, BracketSchedule, RateBracket};
pub use capped_rate::{CappedRateResult, CappedRateRule, apply_capped_rate};
pub use premium::{
    AddOn, FactorContribution, FactorEffect, FactorKind, Multiplier, PremiumBreakdown, RiskFactor,
    always, price,
};
pub use subsidy::{SubsidyResolution, SubsidySchedule, SubsidyTier};
