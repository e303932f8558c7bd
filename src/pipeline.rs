//! The per-run extraction and reconciliation loop
//!
//! One run: list unprocessed mail, recover a body and a structured record
//! per message, reconcile against the cached snapshot, then flush the
//! staged writes in one grouped pass and label the consumed messages.
//! Messages are handled strictly oldest-first and every failure is
//! contained to its message; nothing aborts the run.

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::error::{MailError, MessageFailure};
use crate::extract::parse_reply;
use crate::mail::payload::extract_text;
use crate::mail::{MailSource, Message};
use crate::model::{build_prompt, ModelInvoker};
use crate::reconcile::{AppOutcome, CompanyOutcome, Reconciler};
use crate::store::cache::SnapshotCache;
use crate::store::SheetStore;

/// What happened in one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub listed: usize,
    pub processed: usize,
    pub empty_bodies: usize,
    pub parse_failures: usize,
    pub key_missing: usize,
    pub model_errors: usize,
    pub companies_created: usize,
    pub applications_created: usize,
    pub applications_updated: usize,
    pub unchanged: usize,
    pub flush_succeeded: bool,
}

/// One pipeline instance per store target; runs must not execute
/// concurrently against the same target.
pub struct Pipeline<'a> {
    mail: &'a dyn MailSource,
    model: &'a dyn ModelInvoker,
    store: &'a dyn SheetStore,
    cache: SnapshotCache<'a, dyn SheetStore + 'a>,
    quarantine_failures: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        mail: &'a dyn MailSource,
        model: &'a dyn ModelInvoker,
        store: &'a dyn SheetStore,
        cache_ttl: Duration,
        quarantine_failures: bool,
    ) -> Self {
        Self {
            mail,
            model,
            store,
            cache: SnapshotCache::new(store, cache_ttl),
            quarantine_failures,
        }
    }

    /// Execute one full pass over the unprocessed messages.
    pub fn run(&mut self) -> Result<RunSummary, MailError> {
        let mut summary = RunSummary::default();

        let mut messages = self.mail.list_unprocessed()?;
        messages.sort_by_key(|m| m.sent_at);
        summary.listed = messages.len();
        info!(count = messages.len(), "listed unprocessed messages");

        let now = Utc::now();
        let cached = self.cache.read(now);
        if !cached.valid {
            info!("no usable snapshot; treating every entity as new");
        }
        let snapshot = cached.snapshot.clone();

        let mut reconciler = Reconciler::new(&snapshot);
        let mut processed_ids = vec![];
        let mut failed_ids = vec![];

        for message in &messages {
            match self.handle_message(message, &mut reconciler, &mut summary) {
                Ok(()) => processed_ids.push(message.id.clone()),
                Err(failure) => {
                    self.record_failure(message, failure, &mut summary, &mut failed_ids);
                }
            }
        }

        let (staged_companies, staged_updates, staged_applications) = reconciler.staged_counts();
        debug!(
            staged_companies,
            staged_updates, staged_applications, "staging complete"
        );

        let report = reconciler.into_batch().flush(self.store);
        summary.flush_succeeded = report.fully_succeeded();

        if summary.flush_succeeded {
            self.mail.mark_processed(&processed_ids)?;
            summary.processed = processed_ids.len();
            // Appended rows must be visible to the next run
            self.cache.invalidate();
        } else {
            warn!("flush failed; leaving messages unprocessed for retry");
        }

        if self.quarantine_failures {
            self.mail.quarantine(&failed_ids)?;
        }

        info!(
            processed = summary.processed,
            parse_failures = summary.parse_failures,
            new_companies = summary.companies_created,
            new_applications = summary.applications_created,
            updates = summary.applications_updated,
            unchanged = summary.unchanged,
            "run complete"
        );
        Ok(summary)
    }

    fn handle_message(
        &self,
        message: &Message,
        reconciler: &mut Reconciler,
        summary: &mut RunSummary,
    ) -> Result<(), MessageFailure> {
        let body = extract_text(&message.payload);
        if body.is_empty() {
            // Detectable but non-fatal; the model still sees the subject
            debug!(message_id = %message.id, "body extraction yielded no text");
            summary.empty_bodies += 1;
        }

        let prompt = build_prompt(&message.subject, &body);
        let raw_reply = self.model.generate(&prompt)?;

        let Some((record, strategy)) = parse_reply(&raw_reply) else {
            return Err(MessageFailure::ParseFailure { raw_reply });
        };
        debug!(message_id = %message.id, strategy, "record recovered");

        let date = message.sent_at.format("%m/%d/%Y").to_string();
        let outcome = reconciler.reconcile(&record, &date)?;

        if outcome.company == CompanyOutcome::Created {
            summary.companies_created += 1;
        }
        match outcome.application {
            AppOutcome::Created => summary.applications_created += 1,
            AppOutcome::Updated => summary.applications_updated += 1,
            AppOutcome::Unchanged => summary.unchanged += 1,
        }
        Ok(())
    }

    /// Log the failure with enough context for offline diagnosis and keep
    /// the message eligible for retry (or quarantine, per config).
    fn record_failure(
        &self,
        message: &Message,
        failure: MessageFailure,
        summary: &mut RunSummary,
        failed_ids: &mut Vec<String>,
    ) {
        match &failure {
            MessageFailure::ParseFailure { raw_reply } => {
                warn!(
                    message_id = %message.id,
                    subject = %message.subject,
                    sender = %message.sender,
                    raw_reply = %raw_reply,
                    "parse failure: no strategy recovered a record"
                );
                summary.parse_failures += 1;
                failed_ids.push(message.id.clone());
            }
            MessageFailure::KeyMissing => {
                warn!(
                    message_id = %message.id,
                    subject = %message.subject,
                    "extracted record has no usable company"
                );
                summary.key_missing += 1;
                failed_ids.push(message.id.clone());
            }
            MessageFailure::Model(err) => {
                // Transport errors are transient; never quarantine them
                warn!(message_id = %message.id, error = %err, "model call failed");
                summary.model_errors += 1;
            }
        }
    }
}
