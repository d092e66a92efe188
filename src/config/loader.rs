//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading versioned rate
//! tables from YAML files.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

use super::types::{JurisdictionMetadata, RateTables, RawYearTables};

/// Loads and provides access to the rate tables of one jurisdiction.
///
/// Tables are loaded once and never mutated; share the loader behind an
/// `Arc` to use it from concurrent calculations.
///
/// # Directory Structure
///
/// ```text
/// config/us/
/// ├── jurisdiction.yaml   # Jurisdiction metadata
/// └── years/
///     ├── 2024.yaml       # Every table in effect for tax year 2024
///     └── 2025.yaml
/// ```
///
/// # Example
///
/// ```no_run
/// use finance_calc_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/us").unwrap();
/// let tables = loader.tables_for(2024).unwrap();
/// println!("State rate for CA: {:?}", tables.state_rate("CA"));
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    metadata: JurisdictionMetadata,
    /// Sorted oldest first; never empty.
    years: Vec<RateTables>,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if:
    /// - `jurisdiction.yaml` or the `years` directory is missing
    /// - any file contains invalid YAML
    /// - any table fails validation (see [`EngineError::InvalidTable`])
    /// - two files declare the same tax year
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let metadata = Self::load_yaml::<JurisdictionMetadata>(&path.join("jurisdiction.yaml"))?;
        let years = Self::load_years(&path.join("years"))?;

        info!(
            jurisdiction = %metadata.code,
            tax_years = ?years.iter().map(|t| t.tax_year).collect::<Vec<_>>(),
            "Rate tables loaded"
        );

        Ok(Self { metadata, years })
    }

    /// Builds a loader from tables already in memory.
    pub fn from_tables(metadata: JurisdictionMetadata, tables: Vec<RateTables>) -> EngineResult<Self> {
        Self::sorted(tables, "in-memory tables").map(|years| Self { metadata, years })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Loads and validates every year file in the years directory.
    fn load_years(years_dir: &Path) -> EngineResult<Vec<RateTables>> {
        let years_dir_str = years_dir.display().to_string();

        let entries = fs::read_dir(years_dir).map_err(|_| EngineError::ConfigNotFound {
            path: years_dir_str.clone(),
        })?;

        let mut tables = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound {
                path: years_dir_str.clone(),
            })?;

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                debug!(path = %path.display(), "Loading rate tables");
                let raw = Self::load_yaml::<RawYearTables>(&path)?;
                tables.push(raw.validate()?);
            }
        }

        Self::sorted(tables, &years_dir_str)
    }

    fn sorted(mut tables: Vec<RateTables>, origin: &str) -> EngineResult<Vec<RateTables>> {
        if tables.is_empty() {
            return Err(EngineError::ConfigNotFound {
                path: format!("{} (no rate tables found)", origin),
            });
        }

        tables.sort_by_key(|t| t.tax_year);
        if let Some(pair) = tables.windows(2).find(|w| w[0].tax_year == w[1].tax_year) {
            return Err(EngineError::invalid_table(
                origin,
                format!("tax year {} is defined more than once", pair[0].tax_year),
            ));
        }
        Ok(tables)
    }

    /// Returns the jurisdiction metadata.
    pub fn metadata(&self) -> &JurisdictionMetadata {
        &self.metadata
    }

    /// Tax years available, oldest first.
    pub fn tax_years(&self) -> Vec<i32> {
        self.years.iter().map(|t| t.tax_year).collect()
    }

    /// Returns the most recent tables whose tax year is on or before `year`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use finance_calc_engine::config::ConfigLoader;
    ///
    /// let loader = ConfigLoader::load("./config/us")?;
    /// // No 2026 file: the 2025 tables stay in effect.
    /// assert_eq!(loader.tables_for(2026)?.tax_year, 2025);
    /// # Ok::<(), finance_calc_engine::error::EngineError>(())
    /// ```
    pub fn tables_for(&self, year: i32) -> EngineResult<&RateTables> {
        self.years
            .iter()
            .rev()
            .find(|t| t.tax_year <= year)
            .ok_or(EngineError::TaxYearNotFound { year })
    }

    /// The newest tables.
    pub fn latest(&self) -> &RateTables {
        // `years` is never empty once constructed.
        &self.years[self.years.len() - 1]
    }
}
