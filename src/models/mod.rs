//! Core data models for the financial calculation engine.
//!
//! This module contains the raw input record and its normalization, money
//! helpers, and the result and audit types shared by every calculator.

mod calculation_result;
mod inputs;
mod money;

pub use calculation_result::{AuditLog, AuditStep, AuditTrace, AuditWarning, CalculationResult};
pub use inputs::{CalculatorInputs, INPUT_DEFAULTED, InputReader, InputValue, MAX_AMOUNT, MAX_COUNT};
pub use money::{Money, Rate, as_percent, checked_ratio, ratio_or_zero, round_money, round_rate};
