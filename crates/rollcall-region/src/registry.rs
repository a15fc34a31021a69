//! In-memory region adapter registry.

use crate::adapter::RegionAdapter;
use rollcall_core::RegionId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Tagged dispatch table from region ID to that region's adapter.
///
/// The registry is populated once at startup with every compiled-in
/// adapter; the engine looks tasks' regions up here rather than holding
/// adapter references itself. Cloning the registry is cheap and shares
/// the underlying table.
#[derive(Clone)]
pub struct RegionRegistry {
    /// Registered adapters, indexed by region ID
    adapters: Arc<RwLock<HashMap<RegionId, Arc<dyn RegionAdapter>>>>,
}

impl RegionRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            adapters: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register an adapter under its own region ID, replacing any
    /// previous adapter for that region.
    pub fn register(&self, adapter: Arc<dyn RegionAdapter>) {
        let region = adapter.region().clone();

        let mut table = self
            .adapters
            .write()
            .expect("acquire write lock on adapters");

        table.insert(region.clone(), adapter);

        debug!(region = %region, "registered region adapter");
    }

    /// Look up the adapter for a region, if one is registered.
    #[must_use]
    pub fn get(&self, region: &RegionId) -> Option<Arc<dyn RegionAdapter>> {
        let table = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        table.get(region).cloned()
    }

    /// Check whether a region has a registered adapter.
    #[must_use]
    pub fn contains(&self, region: &RegionId) -> bool {
        let table = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        table.contains_key(region)
    }

    /// Get the number of registered adapters.
    #[must_use]
    pub fn count(&self) -> usize {
        let table = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        table.len()
    }

    /// Get all registered region IDs.
    #[must_use]
    pub fn all_regions(&self) -> Vec<RegionId> {
        let table = self
            .adapters
            .read()
            .expect("acquire read lock on adapters");

        table.keys().cloned().collect()
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
