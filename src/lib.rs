//! Tiered financial calculation engine
//!
//! This crate computes paycheck withholding, salary conversions, loan
//! amortization, profit margins and insurance premium estimates from flat
//! form inputs and year-versioned rate tables loaded from YAML.

#![warn(missing_docs)]

pub mod advisory;
pub mod api;
pub mod calculation;
pub mod calculators;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
