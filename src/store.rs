//! Write-once retention of finished calculation results.
//!
//! A stored result is never mutated. Each calculation carries a fresh
//! identifier, so concurrent writers never collide on a key. The in-memory
//! store keeps a bounded number of results and evicts the oldest first.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::CalculationResult;

/// A sink for finished results.
pub trait ResultStore: Send + Sync {
    /// Stores a result under its calculation id.
    ///
    /// Fails with [`EngineError::DuplicateResult`] if the id is already present.
    fn put(&self, result: CalculationResult) -> EngineResult<()>;

    /// Returns a copy of the stored result, if any.
    fn get(&self, id: Uuid) -> Option<CalculationResult>;

    /// Number of stored results.
    fn len(&self) -> usize;

    /// Returns true when nothing has been stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of results [`InMemoryResultStore::new`] retains.
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct Retained {
    results: HashMap<Uuid, CalculationResult>,
    /// Ids in insertion order, oldest first.
    order: VecDeque<Uuid>,
}

/// Process-local store backed by a map, holding at most `capacity` results.
///
/// # Example
///
/// ```no_run
/// use finance_calc_engine::calculators::{CalculatorKind, calculate};
/// use finance_calc_engine::config::ConfigLoader;
/// use finance_calc_engine::models::CalculatorInputs;
/// use finance_calc_engine::store::{InMemoryResultStore, ResultStore};
///
/// let loader = ConfigLoader::load("./config/us").unwrap();
/// let inputs = CalculatorInputs::new().with("cost", 60).with("revenue", 100);
/// let result = calculate(CalculatorKind::ProfitMargin, &inputs, loader.latest());
///
/// let store = InMemoryResultStore::new();
/// let id = result.calculation_id;
/// store.put(result).unwrap();
/// assert!(store.get(id).is_some());
/// ```
#[derive(Debug)]
pub struct InMemoryResultStore {
    retained: RwLock<Retained>,
    capacity: usize,
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryResultStore {
    /// Creates an empty store retaining [`DEFAULT_CAPACITY`] results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store retaining at most `capacity` results (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            retained: RwLock::new(Retained::default()),
            capacity: capacity.max(1),
        }
    }

    /// Maximum number of results kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl ResultStore for InMemoryResultStore {
    fn put(&self, result: CalculationResult) -> EngineResult<()> {
        let mut retained = self.retained.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let id = result.calculation_id;
        if retained.results.contains_key(&id) {
            return Err(EngineError::DuplicateResult { id });
        }
        retained.results.insert(id, result);
        retained.order.push_back(id);

        while retained.order.len() > self.capacity {
            if let Some(evicted) = retained.order.pop_front() {
                retained.results.remove(&evicted);
                debug!(calculation_id = %evicted, "Evicted oldest result");
            }
        }
        debug!(calculation_id = %id, stored = retained.results.len(), "Result stored");
        Ok(())
    }

    fn get(&self, id: Uuid) -> Option<CalculationResult> {
        self.retained
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .results
            .get(&id)
            .cloned()
    }

    fn len(&self) -> usize {
        self.retained
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .results
            .len()
    }
}
