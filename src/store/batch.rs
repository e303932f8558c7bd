//! Staged-write accumulation and end-of-run flush
//!
//! Writes are collected over the whole run and flushed as one grouped pass
//! per table and operation kind, keeping store round-trips O(1) in the
//! message count. Nothing is rolled back on partial failure; each kind
//! reports its own result so the caller can decide what to mark processed.

use tracing::{debug, error};

use crate::error::StoreError;

use super::{ApplicationRow, CellUpdate, CompanyRow, SheetStore};

/// Writes staged during one run, in flush order.
#[derive(Debug, Default)]
pub struct WriteBatch {
    pub new_companies: Vec<CompanyRow>,
    pub updates: Vec<CellUpdate>,
    pub new_applications: Vec<ApplicationRow>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.new_companies.is_empty() && self.updates.is_empty() && self.new_applications.is_empty()
    }

    /// Flush all staged writes, grouped by table and operation kind.
    /// Companies go first so application rows never reference a company id
    /// the store has not seen.
    pub fn flush<S: SheetStore + ?Sized>(self, store: &S) -> FlushReport {
        let companies = flush_kind(self.new_companies.len(), || {
            store.append_companies(&self.new_companies)
        });
        let updates = flush_kind(self.updates.len(), || store.update_cells(&self.updates));
        let applications = flush_kind(self.new_applications.len(), || {
            store.append_applications(&self.new_applications)
        });

        FlushReport {
            companies,
            updates,
            applications,
        }
    }
}

fn flush_kind(count: usize, write: impl FnOnce() -> Result<(), StoreError>) -> FlushResult {
    if count == 0 {
        return FlushResult::Nothing;
    }
    match write() {
        Ok(()) => {
            debug!(count, "flushed staged writes");
            FlushResult::Written(count)
        }
        Err(err) => {
            error!(error = %err, count, "staged write flush failed");
            FlushResult::Failed(err)
        }
    }
}

/// Outcome of flushing one operation kind.
#[derive(Debug)]
pub enum FlushResult {
    /// Nothing of this kind was staged
    Nothing,
    /// All staged writes of this kind landed
    Written(usize),
    /// The grouped write failed; staged writes of this kind were lost
    Failed(StoreError),
}

impl FlushResult {
    pub fn is_ok(&self) -> bool {
        !matches!(self, FlushResult::Failed(_))
    }

    pub fn written(&self) -> usize {
        match self {
            FlushResult::Written(n) => *n,
            _ => 0,
        }
    }
}

/// Per-kind flush results for one run.
#[derive(Debug)]
pub struct FlushReport {
    pub companies: FlushResult,
    pub updates: FlushResult,
    pub applications: FlushResult,
}

impl FlushReport {
    /// True when no kind failed (empty kinds count as success).
    pub fn fully_succeeded(&self) -> bool {
        self.companies.is_ok() && self.updates.is_ok() && self.applications.is_ok()
    }
}
