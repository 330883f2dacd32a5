// crates/scenario-harness-core/src/runtime/store.rs
// ============================================================================
// Module: Baseline Stores
// Description: In-memory baseline store and the shared reader/writer gate.
// Purpose: Provide a deterministic store and serialize promotion against reads.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryBaselineStore`] keeps baselines in a mutex-protected map for
//! tests and dry runs. [`SharedBaselineStore`] wraps any store behind a
//! reader/writer gate: comparisons take shared access, while promotion takes
//! exclusive access for a whole batch so no comparison observes a partially
//! promoted store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;

use crate::core::Baseline;
use crate::core::ScenarioId;
use crate::interfaces::BaselineStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory baseline store for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryBaselineStore {
    /// Baselines keyed by scenario identifier.
    baselines: Arc<Mutex<BTreeMap<String, Baseline>>>,
}

impl InMemoryBaselineStore {
    /// Creates an empty in-memory baseline store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            baselines: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl BaselineStore for InMemoryBaselineStore {
    fn load(&self, scenario_id: &ScenarioId) -> Result<Option<Baseline>, StoreError> {
        let guard = self
            .baselines
            .lock()
            .map_err(|_| StoreError::Store("baseline store mutex poisoned".to_string()))?;
        Ok(guard.get(scenario_id.as_str()).cloned())
    }

    fn save(&self, baseline: &Baseline) -> Result<(), StoreError> {
        self.baselines
            .lock()
            .map_err(|_| StoreError::Store("baseline store mutex poisoned".to_string()))?
            .insert(baseline.scenario_id.to_string(), baseline.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<Baseline>, StoreError> {
        let guard = self
            .baselines
            .lock()
            .map_err(|_| StoreError::Store("baseline store mutex poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

// ============================================================================
// SECTION: Shared Store Wrapper
// ============================================================================

/// Shared baseline store with a reader/writer gate.
#[derive(Clone)]
pub struct SharedBaselineStore {
    /// Inner store implementation.
    inner: Arc<dyn BaselineStore + Send + Sync>,
    /// Gate separating comparisons from promotion.
    gate: Arc<RwLock<()>>,
}

impl SharedBaselineStore {
    /// Wraps a baseline store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl BaselineStore + Send + Sync + 'static) -> Self {
        Self::new(Arc::new(store))
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub fn new(store: Arc<dyn BaselineStore + Send + Sync>) -> Self {
        Self {
            inner: store,
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Runs `operation` with exclusive access to the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the gate is poisoned or `operation` fails.
    pub fn with_exclusive<T>(
        &self,
        operation: impl FnOnce(&dyn BaselineStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self
            .gate
            .write()
            .map_err(|_| StoreError::Store("baseline store gate poisoned".to_string()))?;
        operation(self.inner.as_ref())
    }
}

impl BaselineStore for SharedBaselineStore {
    fn load(&self, scenario_id: &ScenarioId) -> Result<Option<Baseline>, StoreError> {
        let _guard = self
            .gate
            .read()
            .map_err(|_| StoreError::Store("baseline store gate poisoned".to_string()))?;
        self.inner.load(scenario_id)
    }

    fn save(&self, baseline: &Baseline) -> Result<(), StoreError> {
        self.with_exclusive(|store| store.save(baseline))
    }

    fn list(&self) -> Result<Vec<Baseline>, StoreError> {
        let _guard = self
            .gate
            .read()
            .map_err(|_| StoreError::Store("baseline store gate poisoned".to_string()))?;
        self.inner.list()
    }
}
