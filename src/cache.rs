use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use log::debug;
use once_cell::sync::OnceCell;

use crate::data::customers::{load_customers, CustomerLoadOptions};
use crate::data::fees::{load_fees, FeeLoadOptions};
use crate::data::model::{CustomerTable, FeeTable};
use crate::error::{LoadError, LoadResult};

// ---------------------------------------------------------------------------
// TableCache – memoized loads, one per file version
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    path: PathBuf,
    modified: Option<SystemTime>,
}

impl CacheKey {
    fn for_path(path: &Path) -> LoadResult<Self> {
        let canonical = path.canonicalize().map_err(|e| LoadError::io(path, e))?;
        let metadata = std::fs::metadata(&canonical).map_err(|e| LoadError::io(path, e))?;
        Ok(CacheKey {
            path: canonical,
            modified: metadata.modified().ok(),
        })
    }
}

/// Loads each file version once and hands out shared, read-only tables.
///
/// Concurrent requests for the same file wait on a single load instead of
/// parsing it again. A failed load is not remembered, so the next request
/// retries.
pub struct TableCache<T> {
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<Arc<T>>>>>,
}

impl<T> Default for TableCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> TableCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, running `load` if this version of
    /// the file has not been loaded yet.
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> LoadResult<Arc<T>>
    where
        F: FnOnce(&Path) -> LoadResult<T>,
    {
        let key = CacheKey::for_path(path)?;
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            // A newer version of the file replaces older entries.
            entries.retain(|k, _| k.path != key.path || k.modified == key.modified);
            Arc::clone(entries.entry(key).or_default())
        };

        if let Some(table) = cell.get() {
            debug!("cache hit for {}", path.display());
            return Ok(Arc::clone(table));
        }
        cell.get_or_try_init(|| load(path).map(Arc::new)).map(Arc::clone)
    }

    /// Number of file versions currently held.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

// ---------------------------------------------------------------------------
// Datasets – the two loaders behind one cache each
// ---------------------------------------------------------------------------

/// Entry point for front ends: cached customer and fee tables.
#[derive(Default)]
pub struct Datasets {
    customer_options: CustomerLoadOptions,
    fee_options: FeeLoadOptions,
    customers: TableCache<CustomerTable>,
    fees: TableCache<FeeTable>,
}

impl Datasets {
    pub fn new(customer_options: CustomerLoadOptions, fee_options: FeeLoadOptions) -> Self {
        Self {
            customer_options,
            fee_options,
            customers: TableCache::new(),
            fees: TableCache::new(),
        }
    }

    pub fn customers(&self, path: &Path) -> LoadResult<Arc<CustomerTable>> {
        let options = self.customer_options;
        self.customers.get_or_load(path, |p| load_customers(p, &options))
    }

    pub fn fees(&self, path: &Path) -> LoadResult<Arc<FeeTable>> {
        let options = self.fee_options;
        self.fees.get_or_load(path, |p| load_fees(p, &options))
    }
}
