//! Identity resolution and staged upserts
//!
//! Matches each extracted record against the snapshot plus everything
//! already staged in the same run, then stages the minimal write: reuse or
//! create the company, then update, create, or leave alone the application.
//!
//! Lookup is two-tier: a primary map keyed by the strong
//! (company_id, job_id) pair, and a secondary map keyed by the normalized
//! (company, role) tuple. Company matching is exact normalized-key
//! equality; fuzzy matching is a caller-side tool
//! (`extract::normalize::closest_match`), never layered on top of the
//! exact lookup here.

use std::collections::HashMap;

use tracing::debug;

use crate::error::MessageFailure;
use crate::extract::normalize::{normalize_key, UNKNOWN_KEY};
use crate::extract::{ExtractedRecord, Status};
use crate::store::batch::WriteBatch;
use crate::store::{AppColumn, ApplicationRow, CellUpdate, CompanyRow, Snapshot};

/// How the company side of a record was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyOutcome {
    /// Matched an existing (or already staged) company
    Existing,
    /// A new company was staged
    Created,
}

/// How the application side of a record was resolved. "Matched, nothing
/// changed" is deliberately distinct from "failed to match".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppOutcome {
    Created,
    Updated,
    Unchanged,
}

/// Result of reconciling one extracted record.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub company: CompanyOutcome,
    pub application: AppOutcome,
    pub company_id: String,
    pub job_id: String,
}

/// A resolved company: stable id plus the spelling that must be displayed.
#[derive(Debug, Clone)]
struct CompanyEntry {
    company_id: String,
    canonical_name: String,
}

/// Where a known application lives: a stored snapshot row or a row staged
/// earlier in this run.
#[derive(Debug, Clone, Copy)]
enum AppSlot {
    Stored {
        /// Zero-based row position within the snapshot
        row: usize,
        /// Index into the batch's update list once a status change was
        /// staged for this row (the paired last-updated touch sits at +1)
        staged_update: Option<usize>,
    },
    Staged {
        /// Index into the batch's new-application list
        index: usize,
    },
}

type FallbackKey = (String, String);
type StrongKey = (String, String);

/// Per-run reconciliation engine. Owns the staged batch; single logical
/// thread of control, never shared across concurrent runs.
pub struct Reconciler<'s> {
    snapshot: &'s Snapshot,
    batch: WriteBatch,
    companies_by_key: HashMap<String, CompanyEntry>,
    apps_by_strong: HashMap<StrongKey, AppSlot>,
    apps_by_fallback: HashMap<FallbackKey, AppSlot>,
    /// Current status per stored row, tracking staged-but-unflushed updates
    stored_status: Vec<Status>,
}

impl<'s> Reconciler<'s> {
    pub fn new(snapshot: &'s Snapshot) -> Self {
        let mut companies_by_key = HashMap::new();
        for company in &snapshot.companies {
            // Every stored company has a unique normalized key; on a dirty
            // store the earliest row wins, matching read order.
            companies_by_key
                .entry(normalize_key(&company.name))
                .or_insert_with(|| CompanyEntry {
                    company_id: company.company_id.clone(),
                    canonical_name: company.name.clone(),
                });
        }

        let mut apps_by_strong = HashMap::new();
        let mut apps_by_fallback = HashMap::new();
        let mut stored_status = Vec::with_capacity(snapshot.applications.len());
        for (row, app) in snapshot.applications.iter().enumerate() {
            let slot = AppSlot::Stored {
                row,
                staged_update: None,
            };
            if !app.company_id.is_empty() && !app.job_id.is_empty() {
                apps_by_strong
                    .entry((app.company_id.clone(), app.job_id.clone()))
                    .or_insert(slot);
            }
            apps_by_fallback
                .entry(fallback_key(&app.company, &app.role))
                .or_insert(slot);
            stored_status.push(app.status);
        }

        Self {
            snapshot,
            batch: WriteBatch::new(),
            companies_by_key,
            apps_by_strong,
            apps_by_fallback,
            stored_status,
        }
    }

    /// Reconcile one record dated `date` (display format, e.g. 01/15/2025).
    pub fn reconcile(
        &mut self,
        record: &ExtractedRecord,
        date: &str,
    ) -> Result<ReconcileOutcome, MessageFailure> {
        let key = normalize_key(&record.company);
        if key == UNKNOWN_KEY || key.is_empty() {
            return Err(MessageFailure::KeyMissing);
        }

        let (entry, company_outcome) = self.resolve_company(&key, &record.company);
        let company_id = entry.company_id.clone();
        // Canonical spelling never regresses to a newer variant
        let display_name = entry.canonical_name.clone();

        let fb_key = fallback_key(&display_name, &record.job_title);
        let app_outcome = self.resolve_application(
            &company_id,
            None,
            fb_key,
            record,
            &display_name,
            date,
        );

        Ok(ReconcileOutcome {
            company: company_outcome,
            application: app_outcome.0,
            company_id,
            job_id: app_outcome.1,
        })
    }

    /// Exact normalized-key company lookup against snapshot plus staged;
    /// stages a new company when nothing matches.
    fn resolve_company(&mut self, key: &str, raw_name: &str) -> (&CompanyEntry, CompanyOutcome) {
        if self.companies_by_key.contains_key(key) {
            let entry = &self.companies_by_key[key];
            debug!(company_id = %entry.company_id, "company matched by normalized key");
            return (entry, CompanyOutcome::Existing);
        }

        // Monotonic counter seeded from snapshot size plus staged count
        // keeps ids unique within the run and continuous across runs.
        let seq = self.snapshot.companies.len() + self.batch.new_companies.len() + 1;
        let company_id = format!("C{seq}");
        let canonical_name = raw_name.trim().to_string();

        self.batch.new_companies.push(CompanyRow {
            name: canonical_name.clone(),
            company_id: company_id.clone(),
            role: String::new(),
        });
        debug!(%company_id, name = %canonical_name, "staged new company");

        let entry = self
            .companies_by_key
            .entry(key.to_string())
            .or_insert(CompanyEntry {
                company_id,
                canonical_name,
            });
        (entry, CompanyOutcome::Created)
    }

    /// Two-tier application lookup: strong key first when a job id is
    /// known, then the normalized fallback tuple.
    fn lookup_slot(
        &self,
        company_id: &str,
        job_id: Option<&str>,
        fb_key: &FallbackKey,
    ) -> Option<AppSlot> {
        if let Some(jid) = job_id {
            if let Some(slot) = self
                .apps_by_strong
                .get(&(company_id.to_string(), jid.to_string()))
            {
                return Some(*slot);
            }
        }
        self.apps_by_fallback.get(fb_key).copied()
    }

    fn resolve_application(
        &mut self,
        company_id: &str,
        job_id: Option<&str>,
        fb_key: FallbackKey,
        record: &ExtractedRecord,
        display_name: &str,
        date: &str,
    ) -> (AppOutcome, String) {
        match self.lookup_slot(company_id, job_id, &fb_key) {
            Some(AppSlot::Stored { row, staged_update }) => {
                let stored_job_id = self.snapshot.applications[row].job_id.clone();
                if self.stored_status[row] == record.status {
                    debug!(row, "application matched, status unchanged");
                    return (AppOutcome::Unchanged, stored_job_id);
                }

                // Status plus last-updated touch only; a second change in
                // the same run rewrites the staged cells instead of
                // appending duplicates.
                match staged_update {
                    Some(index) => {
                        self.batch.updates[index].value = record.status.as_str().to_string();
                        self.batch.updates[index + 1].value = date.to_string();
                    }
                    None => {
                        let index = self.batch.updates.len();
                        self.batch.updates.push(CellUpdate::application(
                            row,
                            AppColumn::Status,
                            record.status.as_str(),
                        ));
                        self.batch.updates.push(CellUpdate::application(
                            row,
                            AppColumn::LastUpdated,
                            date,
                        ));
                        self.remember_staged_update(row, index);
                    }
                }
                self.stored_status[row] = record.status;
                debug!(row, status = %record.status, "staged application update");
                (AppOutcome::Updated, stored_job_id)
            }
            Some(AppSlot::Staged { index }) => {
                let app = &mut self.batch.new_applications[index];
                let job_id = app.job_id.clone();
                if app.status == record.status {
                    debug!(index, "duplicate staged application, collapsed");
                    (AppOutcome::Unchanged, job_id)
                } else {
                    app.status = record.status;
                    app.last_updated = date.to_string();
                    debug!(index, status = %record.status, "rewrote staged application");
                    (AppOutcome::Updated, job_id)
                }
            }
            None => {
                let seq =
                    self.snapshot.applications.len() + self.batch.new_applications.len() + 1;
                let job_id = format!("J{seq}");
                let index = self.batch.new_applications.len();

                self.batch.new_applications.push(ApplicationRow {
                    status: record.status,
                    company: display_name.to_string(),
                    date_applied: date.to_string(),
                    last_updated: date.to_string(),
                    link: String::new(),
                    role: record.job_title.trim().to_string(),
                    company_id: company_id.to_string(),
                    job_id: job_id.clone(),
                });

                let slot = AppSlot::Staged { index };
                self.apps_by_strong
                    .insert((company_id.to_string(), job_id.clone()), slot);
                self.apps_by_fallback.insert(fb_key, slot);
                debug!(%job_id, "staged new application");
                (AppOutcome::Created, job_id)
            }
        }
    }

    /// Point both lookup tiers at the staged update for `row`.
    fn remember_staged_update(&mut self, row: usize, index: usize) {
        let updated = AppSlot::Stored {
            row,
            staged_update: Some(index),
        };
        for slot in self
            .apps_by_strong
            .values_mut()
            .chain(self.apps_by_fallback.values_mut())
        {
            if let AppSlot::Stored { row: r, .. } = slot {
                if *r == row {
                    *slot = updated;
                }
            }
        }
    }

    /// Hand the staged writes to the flush step.
    pub fn into_batch(self) -> WriteBatch {
        self.batch
    }

    /// Staged-write counts: (new companies, updates, new applications).
    pub fn staged_counts(&self) -> (usize, usize, usize) {
        (
            self.batch.new_companies.len(),
            self.batch.updates.len() / 2,
            self.batch.new_applications.len(),
        )
    }
}

/// Fallback composite key: normalized company + lowercased trimmed role.
fn fallback_key(company: &str, role: &str) -> FallbackKey {
    (normalize_key(company), role.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(company: &str, title: &str, status: Status) -> ExtractedRecord {
        ExtractedRecord {
            job_title: title.to_string(),
            company: company.to_string(),
            status,
        }
    }

    fn stored_app(company: &str, role: &str, status: Status, cid: &str, jid: &str) -> ApplicationRow {
        ApplicationRow {
            status,
            company: company.to_string(),
            date_applied: "01/01/2025".to_string(),
            last_updated: "01/01/2025".to_string(),
            link: String::new(),
            role: role.to_string(),
            company_id: cid.to_string(),
            job_id: jid.to_string(),
        }
    }

    fn snapshot_one_app() -> Snapshot {
        Snapshot {
            companies: vec![CompanyRow {
                name: "Acme Corp".to_string(),
                company_id: "C1".to_string(),
                role: String::new(),
            }],
            applications: vec![stored_app("Acme Corp", "SWE Intern", Status::Received, "C1", "J1")],
        }
    }

    #[test]
    fn test_new_company_and_application() {
        let snapshot = Snapshot::default();
        let mut rec = Reconciler::new(&snapshot);
        let outcome = rec
            .reconcile(&record("Globex", "Analyst", Status::Received), "02/01/2025")
            .unwrap();
        assert_eq!(outcome.company, CompanyOutcome::Created);
        assert_eq!(outcome.application, AppOutcome::Created);
        assert_eq!(outcome.company_id, "C1");
        assert_eq!(outcome.job_id, "J1");

        let batch = rec.into_batch();
        assert_eq!(batch.new_companies.len(), 1);
        assert_eq!(batch.new_applications.len(), 1);
        assert!(batch.updates.is_empty());
    }

    #[test]
    fn test_same_status_is_noop() {
        let snapshot = snapshot_one_app();
        let mut rec = Reconciler::new(&snapshot);
        let outcome = rec
            .reconcile(
                &record("Acme Corp", "SWE Intern", Status::Received),
                "02/01/2025",
            )
            .unwrap();
        assert_eq!(outcome.company, CompanyOutcome::Existing);
        assert_eq!(outcome.application, AppOutcome::Unchanged);
        assert!(rec.into_batch().is_empty());
    }

    #[test]
    fn test_status_change_updates_stored_row() {
        let snapshot = snapshot_one_app();
        let mut rec = Reconciler::new(&snapshot);
        let outcome = rec
            .reconcile(
                &record("Acme Corp", "SWE Intern", Status::Interview),
                "02/01/2025",
            )
            .unwrap();
        assert_eq!(outcome.application, AppOutcome::Updated);
        assert_eq!(outcome.job_id, "J1");

        let batch = rec.into_batch();
        assert!(batch.new_applications.is_empty());
        assert_eq!(batch.updates.len(), 2);
        assert_eq!(batch.updates[0].row, 0);
        assert_eq!(batch.updates[0].col, AppColumn::Status.index());
        assert_eq!(batch.updates[0].value, "Interview");
        assert_eq!(batch.updates[1].col, AppColumn::LastUpdated.index());
        assert_eq!(batch.updates[1].value, "02/01/2025");
    }

    #[test]
    fn test_company_matches_across_suffix_and_case() {
        let snapshot = snapshot_one_app();
        let mut rec = Reconciler::new(&snapshot);
        let outcome = rec
            .reconcile(
                &record("ACME corp.", "Data Intern", Status::Received),
                "02/01/2025",
            )
            .unwrap();
        assert_eq!(outcome.company, CompanyOutcome::Existing);
        assert_eq!(outcome.company_id, "C1");

        // New application row carries the stored canonical spelling
        let batch = rec.into_batch();
        assert_eq!(batch.new_applications[0].company, "Acme Corp");
    }

    #[test]
    fn test_in_run_dedup_collapses_to_one_staged_row() {
        let snapshot = Snapshot::default();
        let mut rec = Reconciler::new(&snapshot);
        rec.reconcile(&record("Globex", "Analyst", Status::Received), "02/01/2025")
            .unwrap();
        let second = rec
            .reconcile(&record("Globex Inc.", "Analyst", Status::Received), "02/02/2025")
            .unwrap();
        assert_eq!(second.company, CompanyOutcome::Existing);
        assert_eq!(second.application, AppOutcome::Unchanged);

        let batch = rec.into_batch();
        assert_eq!(batch.new_companies.len(), 1);
        assert_eq!(batch.new_applications.len(), 1);
    }

    #[test]
    fn test_in_run_status_change_rewrites_staged_row() {
        let snapshot = Snapshot::default();
        let mut rec = Reconciler::new(&snapshot);
        rec.reconcile(&record("Globex", "Analyst", Status::Received), "02/01/2025")
            .unwrap();
        let second = rec
            .reconcile(&record("Globex", "Analyst", Status::Rejected), "02/02/2025")
            .unwrap();
        assert_eq!(second.application, AppOutcome::Updated);

        let batch = rec.into_batch();
        assert_eq!(batch.new_applications.len(), 1);
        assert_eq!(batch.new_applications[0].status, Status::Rejected);
        assert_eq!(batch.new_applications[0].last_updated, "02/02/2025");
        // The original application date is preserved
        assert_eq!(batch.new_applications[0].date_applied, "02/01/2025");
    }

    #[test]
    fn test_double_status_change_rewrites_staged_update() {
        let snapshot = snapshot_one_app();
        let mut rec = Reconciler::new(&snapshot);
        rec.reconcile(
            &record("Acme Corp", "SWE Intern", Status::Reviewing),
            "02/01/2025",
        )
        .unwrap();
        rec.reconcile(
            &record("Acme Corp", "SWE Intern", Status::Interview),
            "02/02/2025",
        )
        .unwrap();

        // Still exactly one status + one touch, carrying the latest values
        let batch = rec.into_batch();
        assert_eq!(batch.updates.len(), 2);
        assert_eq!(batch.updates[0].value, "Interview");
        assert_eq!(batch.updates[1].value, "02/02/2025");
    }

    #[test]
    fn test_unknown_company_is_key_missing() {
        let snapshot = Snapshot::default();
        let mut rec = Reconciler::new(&snapshot);
        let err = rec
            .reconcile(&record("Unknown", "SWE", Status::Received), "02/01/2025")
            .unwrap_err();
        assert!(matches!(err, MessageFailure::KeyMissing));
        assert!(rec.into_batch().is_empty());
    }

    #[test]
    fn test_id_minting_continues_from_snapshot() {
        let snapshot = snapshot_one_app();
        let mut rec = Reconciler::new(&snapshot);
        let outcome = rec
            .reconcile(&record("Globex", "Analyst", Status::Received), "02/01/2025")
            .unwrap();
        assert_eq!(outcome.company_id, "C2");
        assert_eq!(outcome.job_id, "J2");
    }

    #[test]
    fn test_strong_key_preferred_over_fallback() {
        // Two stored rows for the same company/role, distinct job ids: the
        // strong key must hit its exact row.
        let snapshot = Snapshot {
            companies: vec![CompanyRow {
                name: "Acme".to_string(),
                company_id: "C1".to_string(),
                role: String::new(),
            }],
            applications: vec![
                stored_app("Acme", "SWE", Status::Received, "C1", "J1"),
                stored_app("Acme", "SWE", Status::Rejected, "C1", "J2"),
            ],
        };
        let rec = Reconciler::new(&snapshot);
        let fb = fallback_key("Acme", "SWE");
        match rec.lookup_slot("C1", Some("J2"), &fb) {
            Some(AppSlot::Stored { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected stored row 1, got {other:?}"),
        }
        // Without a job id the fallback tuple resolves to the first row
        match rec.lookup_slot("C1", None, &fb) {
            Some(AppSlot::Stored { row, .. }) => assert_eq!(row, 0),
            other => panic!("expected stored row 0, got {other:?}"),
        }
    }
}
