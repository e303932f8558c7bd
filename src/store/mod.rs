//! Two-table sheet store model and backend trait
//!
//! The durable store is two linked tables. Companies carry the canonical
//! spelling and a stable id; Applications reference a company by id and are
//! the rows users actually read. Backends only need three primitives: read
//! everything, append rows, update targeted cells.

mod schema;

pub mod batch;
pub mod cache;
pub mod sqlite;

pub use schema::SCHEMA;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::extract::Status;

/// The two logical tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Companies,
    Applications,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Companies => "companies",
            Table::Applications => "applications",
        }
    }
}

/// Columns of the Applications table, in sheet order:
/// Status, Company, Date Applied, Last Updated, Link, Role, Company ID, Job ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppColumn {
    Status,
    Company,
    DateApplied,
    LastUpdated,
    Link,
    Role,
    CompanyId,
    JobId,
}

impl AppColumn {
    pub fn index(&self) -> usize {
        match self {
            AppColumn::Status => 0,
            AppColumn::Company => 1,
            AppColumn::DateApplied => 2,
            AppColumn::LastUpdated => 3,
            AppColumn::Link => 4,
            AppColumn::Role => 5,
            AppColumn::CompanyId => 6,
            AppColumn::JobId => 7,
        }
    }
}

/// One row of the Companies table: [Company Name, Company ID, Role].
/// The Role column is retained for backward compatibility and unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRow {
    pub name: String,
    pub company_id: String,
    pub role: String,
}

/// One row of the Applications table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRow {
    pub status: Status,
    pub company: String,
    pub date_applied: String,
    pub last_updated: String,
    pub link: String,
    pub role: String,
    pub company_id: String,
    pub job_id: String,
}

/// A targeted single-cell write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub table: Table,
    /// Zero-based row position within the table, as seen in the snapshot
    pub row: usize,
    /// Zero-based column position within the table's fixed column set
    pub col: usize,
    pub value: String,
}

impl CellUpdate {
    pub fn application(row: usize, col: AppColumn, value: impl Into<String>) -> Self {
        Self {
            table: Table::Applications,
            row,
            col: col.index(),
            value: value.into(),
        }
    }
}

/// Point-in-time copy of both tables.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub companies: Vec<CompanyRow>,
    pub applications: Vec<ApplicationRow>,
}

/// Timestamped snapshot with a validity marker. Invalid means "no known
/// entities", never an error: a run against an invalid snapshot treats
/// everything as new and relies on in-run de-duplication.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub captured_at: DateTime<Utc>,
    pub snapshot: Snapshot,
    pub valid: bool,
}

/// Backend primitives for a two-table sheet store.
///
/// The pipeline never assumes row-ordering guarantees beyond "appended rows
/// are visible on the next read".
pub trait SheetStore {
    /// Fetch both tables in one pass.
    fn read_snapshot(&self) -> StoreResult<Snapshot>;

    /// Append company rows, preserving order.
    fn append_companies(&self, rows: &[CompanyRow]) -> StoreResult<()>;

    /// Append application rows, preserving order.
    fn append_applications(&self, rows: &[ApplicationRow]) -> StoreResult<()>;

    /// Apply targeted cell updates.
    fn update_cells(&self, updates: &[CellUpdate]) -> StoreResult<()>;
}
