//! Configuration loading and management for the calculation engine.
//!
//! This module loads versioned rate tables (federal brackets, payroll rules,
//! state flat rates, subsidy tiers) from YAML files. Tables are passed to the
//! calculators as parameters, so a new tax year is a new file rather than a
//! code change.
//!
//! # Example
//!
//! ```no_run
//! use finance_calc_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/us").unwrap();
//! println!("Loaded tables for: {}", config.metadata().name);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    FederalSchedule, FilingStatus, JurisdictionMetadata, PayrollRules, PovertyLine, RateTables,
    SubsidyTables,
};
