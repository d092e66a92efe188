//! Calculation result models for the financial calculation engine.
//!
//! This module contains the [`CalculationResult`] type returned by every
//! calculator together with the audit trace that records each primitive
//! invocation (bracket evaluation, capped-rate accumulation, amortization,
//! premium pricing, subsidy lookup) made along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculators::{CalculatorKind, CalculatorOutput};

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The rate table or formula the rule was taken from.
    pub source: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// A warning generated during calculation.
///
/// Warnings indicate substitutions or fallbacks that don't prevent
/// calculation but may explain a surprising number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

/// The complete audit trace for a calculation.
///
/// # Example
///
/// ```
/// use finance_calc_engine::models::AuditTrace;
///
/// let trace = AuditTrace {
///     steps: vec![],
///     warnings: vec![],
///     duration_us: 1234,
/// };
/// assert!(trace.steps.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// The sequence of calculation steps.
    pub steps: Vec<AuditStep>,
    /// Any warnings generated during calculation.
    pub warnings: Vec<AuditWarning>,
    /// The total calculation duration in microseconds.
    pub duration_us: u64,
}

/// Accumulates audit steps, numbering them in the order they are recorded.
#[derive(Debug, Default)]
pub struct AuditLog {
    steps: Vec<AuditStep>,
}

impl AuditLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a step. The step number is assigned by the log.
    pub fn record(
        &mut self,
        rule_id: &str,
        rule_name: &str,
        source: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        reasoning: String,
    ) {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(AuditStep {
            step_number,
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            source: source.to_string(),
            input,
            output,
            reasoning,
        });
    }

    /// Returns the steps recorded so far.
    pub fn steps(&self) -> &[AuditStep] {
        &self.steps
    }

    /// Consumes the log, returning the recorded steps.
    pub fn into_steps(self) -> Vec<AuditStep> {
        self.steps
    }
}

/// The complete result of a calculation.
///
/// Every intermediate quantity the presentation layer shows lives in
/// `output`; the audit trace explains how each was derived. A result is
/// never mutated once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The calculator that produced this result.
    pub calculator: CalculatorKind,
    /// The tax year of the rate tables in effect.
    pub tax_year: i32,
    /// The calculator's breakdown, or the reason it could not be computed.
    pub output: CalculatorOutput,
    /// Complete audit trace of calculation decisions.
    pub audit_trace: AuditTrace,
}

impl CalculationResult {
    /// Returns true when the calculator produced a breakdown.
    pub fn is_computable(&self) -> bool {
        !matches!(self.output, CalculatorOutput::NotComputable { .. })
    }
}
