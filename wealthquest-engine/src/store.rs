//! Durable cache seam for the current run.
//!
//! The cache is a write-through mirror of the run record, never a second
//! source of truth: every load is re-verified against the server before the
//! cached values are trusted.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use crate::run::RunRecord;

/// Storage key shared by key-value backed implementations (for example a
/// browser local-storage binding).
pub const RUN_CACHE_KEY: &str = "wealthquest.run.current";

/// Trait for the durable run cache.
/// Platform-specific implementations should provide this.
pub trait RunStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist the server-confirmed record, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save_run(&self, run: &RunRecord) -> Result<(), Self::Error>;

    /// Read the cached record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read or decoded.
    fn load_run(&self) -> Result<Option<RunRecord>, Self::Error>;

    /// Drop the cached record.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be cleared.
    fn clear_run(&self) -> Result<(), Self::Error>;
}

/// In-memory store used by tests and the headless QA tester.
#[derive(Debug, Clone, Default)]
pub struct MemoryRunStore {
    slot: Rc<RefCell<Option<RunRecord>>>,
}

impl MemoryRunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at the cached record without going through the trait.
    #[must_use]
    pub fn snapshot(&self) -> Option<RunRecord> {
        self.slot.borrow().clone()
    }
}

impl RunStore for MemoryRunStore {
    type Error = Infallible;

    fn save_run(&self, run: &RunRecord) -> Result<(), Self::Error> {
        *self.slot.borrow_mut() = Some(run.clone());
        Ok(())
    }

    fn load_run(&self) -> Result<Option<RunRecord>, Self::Error> {
        Ok(self.slot.borrow().clone())
    }

    fn clear_run(&self) -> Result<(), Self::Error> {
        *self.slot.borrow_mut() = None;
        Ok(())
    }
}
