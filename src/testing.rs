//! Test doubles for the pipeline's collaborator seams
//!
//! Scripted, deterministic implementations of the mail, model, and store
//! traits so pipeline behavior is testable without a mail provider, a
//! model daemon, or a real backend. Failure injection flags cover the
//! degraded paths (read miss, partial flush failure).

use chrono::{TimeZone, Utc};
use std::cell::{Cell, RefCell};

use crate::error::{MailResult, ModelError, ModelResult, StoreError, StoreResult};
use crate::mail::payload::MessagePayload;
use crate::mail::{MailSource, Message};
use crate::model::ModelInvoker;
use crate::store::{ApplicationRow, CellUpdate, CompanyRow, SheetStore, Snapshot, Table};

/// In-memory two-table store with failure injection.
#[derive(Default)]
pub struct MemoryStore {
    companies: RefCell<Vec<CompanyRow>>,
    applications: RefCell<Vec<ApplicationRow>>,
    pub fail_reads: Cell<bool>,
    pub fail_company_appends: Cell<bool>,
    pub fail_application_appends: Cell<bool>,
    pub fail_updates: Cell<bool>,
    reads: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        *store.companies.borrow_mut() = snapshot.companies;
        *store.applications.borrow_mut() = snapshot.applications;
        store
    }

    /// How many snapshot reads the store has served.
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    fn injected(kind: &'static str) -> StoreError {
        StoreError::Backend(format!("injected {kind} failure").into())
    }
}

impl SheetStore for MemoryStore {
    fn read_snapshot(&self) -> StoreResult<Snapshot> {
        if self.fail_reads.get() {
            return Err(Self::injected("read"));
        }
        self.reads.set(self.reads.get() + 1);
        Ok(Snapshot {
            companies: self.companies.borrow().clone(),
            applications: self.applications.borrow().clone(),
        })
    }

    fn append_companies(&self, rows: &[CompanyRow]) -> StoreResult<()> {
        if self.fail_company_appends.get() {
            return Err(Self::injected("company append"));
        }
        self.companies.borrow_mut().extend_from_slice(rows);
        Ok(())
    }

    fn append_applications(&self, rows: &[ApplicationRow]) -> StoreResult<()> {
        if self.fail_application_appends.get() {
            return Err(Self::injected("application append"));
        }
        self.applications.borrow_mut().extend_from_slice(rows);
        Ok(())
    }

    fn update_cells(&self, updates: &[CellUpdate]) -> StoreResult<()> {
        if self.fail_updates.get() {
            return Err(Self::injected("update"));
        }
        for update in updates {
            match update.table {
                Table::Applications => {
                    let mut apps = self.applications.borrow_mut();
                    let row = apps.get_mut(update.row).ok_or_else(|| StoreError::Update {
                        table: "applications",
                        source: format!("row {} out of range", update.row).into(),
                    })?;
                    apply_application_cell(row, update.col, &update.value);
                }
                Table::Companies => {
                    let mut companies = self.companies.borrow_mut();
                    let row = companies
                        .get_mut(update.row)
                        .ok_or_else(|| StoreError::Update {
                            table: "companies",
                            source: format!("row {} out of range", update.row).into(),
                        })?;
                    apply_company_cell(row, update.col, &update.value);
                }
            }
        }
        Ok(())
    }
}

fn apply_application_cell(row: &mut ApplicationRow, col: usize, value: &str) {
    use crate::extract::Status;
    match col {
        0 => row.status = Status::parse(value).unwrap_or(Status::Draft),
        1 => row.company = value.to_string(),
        2 => row.date_applied = value.to_string(),
        3 => row.last_updated = value.to_string(),
        4 => row.link = value.to_string(),
        5 => row.role = value.to_string(),
        6 => row.company_id = value.to_string(),
        7 => row.job_id = value.to_string(),
        _ => {}
    }
}

fn apply_company_cell(row: &mut CompanyRow, col: usize, value: &str) {
    match col {
        0 => row.name = value.to_string(),
        1 => row.company_id = value.to_string(),
        2 => row.role = value.to_string(),
        _ => {}
    }
}

/// Scripted model: pops one canned reply per call, in order.
#[derive(Default)]
pub struct ScriptedModel {
    replies: RefCell<Vec<String>>,
    pub fail_calls: Cell<bool>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: RefCell::new(replies.into_iter().rev().map(String::from).collect()),
            fail_calls: Cell::new(false),
            prompts: RefCell::new(vec![]),
        }
    }

    /// Prompts the pipeline actually sent, for assertions.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl ModelInvoker for ScriptedModel {
    fn generate(&self, prompt: &str) -> ModelResult<String> {
        if self.fail_calls.get() {
            return Err(ModelError::MalformedReply("injected failure".to_string()));
        }
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop()
            .ok_or_else(|| ModelError::MalformedReply("script exhausted".to_string()))
    }
}

/// In-memory mailbox with processed/quarantined tracking.
#[derive(Default)]
pub struct MemoryMailbox {
    messages: RefCell<Vec<Message>>,
    processed: RefCell<Vec<String>>,
    quarantined: RefCell<Vec<String>>,
}

impl MemoryMailbox {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: RefCell::new(messages),
            ..Self::default()
        }
    }

    pub fn processed_ids(&self) -> Vec<String> {
        self.processed.borrow().clone()
    }

    pub fn quarantined_ids(&self) -> Vec<String> {
        self.quarantined.borrow().clone()
    }
}

impl MailSource for MemoryMailbox {
    fn list_unprocessed(&self) -> MailResult<Vec<Message>> {
        let processed = self.processed.borrow();
        let quarantined = self.quarantined.borrow();
        let mut messages: Vec<Message> = self
            .messages
            .borrow()
            .iter()
            .filter(|m| !processed.contains(&m.id) && !quarantined.contains(&m.id))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }

    fn mark_processed(&self, ids: &[String]) -> MailResult<()> {
        self.processed.borrow_mut().extend(ids.iter().cloned());
        Ok(())
    }

    fn quarantine(&self, ids: &[String]) -> MailResult<()> {
        self.quarantined.borrow_mut().extend(ids.iter().cloned());
        Ok(())
    }
}

/// A plain-text message dated by an offset in minutes, for tests.
pub fn plain_message(id: &str, subject: &str, body: &str, minute: u32) -> Message {
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine;

    Message {
        id: id.to_string(),
        subject: subject.to_string(),
        sender: "jobs@example.com".to_string(),
        sent_at: Utc
            .with_ymd_and_hms(2025, 1, 15, 9, minute, 0)
            .single()
            .unwrap_or_else(Utc::now),
        payload: MessagePayload::Leaf {
            content_type: "text/plain".to_string(),
            size: body.len() as u64,
            data: Some(URL_SAFE.encode(body)),
        },
    }
}
