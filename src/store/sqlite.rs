//! Local SQLite implementation of the sheet-store primitives

use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::extract::Status;

use super::{ApplicationRow, CellUpdate, CompanyRow, Snapshot, Table, SCHEMA};

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::backend)?;
        }

        let conn = Connection::open(path).map_err(StoreError::backend)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::backend)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(StoreError::backend)?;
        Ok(())
    }

    /// Column name for a zero-based cell position within a table.
    fn column_name(table: Table, col: usize) -> Option<&'static str> {
        match table {
            Table::Companies => ["company_name", "company_id", "role"].get(col).copied(),
            Table::Applications => [
                "status",
                "company",
                "date_applied",
                "last_updated",
                "link",
                "role",
                "company_id",
                "job_id",
            ]
            .get(col)
            .copied(),
        }
    }
}

impl super::SheetStore for SqliteStore {
    fn read_snapshot(&self) -> StoreResult<Snapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT company_name, company_id, role FROM companies ORDER BY pos")
            .map_err(StoreError::read)?;
        let companies = stmt
            .query_map([], |row| {
                Ok(CompanyRow {
                    name: row.get(0)?,
                    company_id: row.get(1)?,
                    role: row.get(2)?,
                })
            })
            .map_err(StoreError::read)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::read)?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT status, company, date_applied, last_updated, link, role, company_id, job_id
                 FROM applications ORDER BY pos",
            )
            .map_err(StoreError::read)?;
        let applications = stmt
            .query_map([], |row| {
                let status: String = row.get(0)?;
                Ok(ApplicationRow {
                    // Unrecognized stored statuses degrade to Draft rather
                    // than poisoning the whole snapshot read.
                    status: Status::parse(&status).unwrap_or(Status::Draft),
                    company: row.get(1)?,
                    date_applied: row.get(2)?,
                    last_updated: row.get(3)?,
                    link: row.get(4)?,
                    role: row.get(5)?,
                    company_id: row.get(6)?,
                    job_id: row.get(7)?,
                })
            })
            .map_err(StoreError::read)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::read)?;

        Ok(Snapshot {
            companies,
            applications,
        })
    }

    fn append_companies(&self, rows: &[CompanyRow]) -> StoreResult<()> {
        for row in rows {
            self.conn
                .execute(
                    "INSERT INTO companies (company_name, company_id, role) VALUES (?, ?, ?)",
                    params![row.name, row.company_id, row.role],
                )
                .map_err(|e| StoreError::Append {
                    table: "companies",
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn append_applications(&self, rows: &[ApplicationRow]) -> StoreResult<()> {
        for row in rows {
            self.conn
                .execute(
                    "INSERT INTO applications
                     (status, company, date_applied, last_updated, link, role, company_id, job_id)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        row.status.as_str(),
                        row.company,
                        row.date_applied,
                        row.last_updated,
                        row.link,
                        row.role,
                        row.company_id,
                        row.job_id,
                    ],
                )
                .map_err(|e| StoreError::Append {
                    table: "applications",
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    fn update_cells(&self, updates: &[CellUpdate]) -> StoreResult<()> {
        for update in updates {
            let table = update.table.as_str();
            let wrap = |e: rusqlite::Error| StoreError::Update {
                table,
                source: Box::new(e),
            };

            let column =
                Self::column_name(update.table, update.col).ok_or_else(|| StoreError::Update {
                    table,
                    source: format!("column {} out of range", update.col).into(),
                })?;

            // Resolve the snapshot row position to its rowid
            let pos: i64 = self
                .conn
                .query_row(
                    &format!("SELECT pos FROM {table} ORDER BY pos LIMIT 1 OFFSET ?"),
                    params![update.row as i64],
                    |row| row.get(0),
                )
                .map_err(wrap)?;

            self.conn
                .execute(
                    &format!("UPDATE {table} SET {column} = ? WHERE pos = ?"),
                    params![update.value, pos],
                )
                .map_err(wrap)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AppColumn, SheetStore};

    fn sample_app(company: &str, company_id: &str, job_id: &str) -> ApplicationRow {
        ApplicationRow {
            status: Status::Received,
            company: company.to_string(),
            date_applied: "01/15/2025".to_string(),
            last_updated: "01/15/2025".to_string(),
            link: String::new(),
            role: "SWE Intern".to_string(),
            company_id: company_id.to_string(),
            job_id: job_id.to_string(),
        }
    }

    #[test]
    fn test_roundtrip_append_and_read() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append_companies(&[CompanyRow {
                name: "Acme".to_string(),
                company_id: "C1".to_string(),
                role: String::new(),
            }])
            .unwrap();
        store
            .append_applications(&[sample_app("Acme", "C1", "J1")])
            .unwrap();

        let snapshot = store.read_snapshot().unwrap();
        assert_eq!(snapshot.companies.len(), 1);
        assert_eq!(snapshot.companies[0].name, "Acme");
        assert_eq!(snapshot.applications.len(), 1);
        assert_eq!(snapshot.applications[0].job_id, "J1");
    }

    #[test]
    fn test_update_cell_by_row_position() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .append_applications(&[
                sample_app("Acme", "C1", "J1"),
                sample_app("Globex", "C2", "J2"),
            ])
            .unwrap();

        store
            .update_cells(&[
                CellUpdate::application(1, AppColumn::Status, "Interview"),
                CellUpdate::application(1, AppColumn::LastUpdated, "02/01/2025"),
            ])
            .unwrap();

        let snapshot = store.read_snapshot().unwrap();
        assert_eq!(snapshot.applications[0].status, Status::Received);
        assert_eq!(snapshot.applications[1].status, Status::Interview);
        assert_eq!(snapshot.applications[1].last_updated, "02/01/2025");
    }

    #[test]
    fn test_appended_rows_visible_on_next_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("apptrack.db");
        let store = SqliteStore::open(&path).unwrap();
        store
            .append_applications(&[sample_app("Acme", "C1", "J1")])
            .unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        let snapshot = reopened.read_snapshot().unwrap();
        assert_eq!(snapshot.applications.len(), 1);
    }
}
