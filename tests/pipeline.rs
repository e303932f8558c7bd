//! End-to-end pipeline runs against in-memory collaborators.

use chrono::Duration;

use apptrack::extract::Status;
use apptrack::mail::MailSource;
use apptrack::pipeline::Pipeline;
use apptrack::store::{ApplicationRow, CompanyRow, SheetStore, Snapshot};
use apptrack::testing::{plain_message, MemoryMailbox, MemoryStore, ScriptedModel};

fn reply(job: &str, company: &str, status: &str) -> String {
    format!(
        "```\n{{\"Job Name\": \"{job}\", \"Company\": \"{company}\", \"Status\": \"{status}\"}}\n```"
    )
}

fn seeded_store() -> MemoryStore {
    MemoryStore::with_snapshot(Snapshot {
        companies: vec![CompanyRow {
            name: "Acme Corp".to_string(),
            company_id: "C1".to_string(),
            role: String::new(),
        }],
        applications: vec![ApplicationRow {
            status: Status::Received,
            company: "Acme Corp".to_string(),
            date_applied: "01/01/2025".to_string(),
            last_updated: "01/01/2025".to_string(),
            link: String::new(),
            role: "SWE Intern".to_string(),
            company_id: "C1".to_string(),
            job_id: "J1".to_string(),
        }],
    })
}

#[test]
fn first_run_creates_company_and_application() {
    let mailbox = MemoryMailbox::new(vec![plain_message(
        "m1",
        "Your application to Acme Corp",
        "Thanks for applying!",
        0,
    )]);
    let model = ScriptedModel::new(vec![&reply("SWE Intern", "Acme Corp", "Received")]);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.listed, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.companies_created, 1);
    assert_eq!(summary.applications_created, 1);
    assert!(summary.flush_succeeded);

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.companies.len(), 1);
    assert_eq!(snapshot.companies[0].company_id, "C1");
    assert_eq!(snapshot.companies[0].name, "Acme Corp");
    assert_eq!(snapshot.applications.len(), 1);
    assert_eq!(snapshot.applications[0].job_id, "J1");
    assert_eq!(snapshot.applications[0].status, Status::Received);
    assert_eq!(snapshot.applications[0].date_applied, "01/15/2025");

    assert_eq!(mailbox.processed_ids(), vec!["m1".to_string()]);
}

#[test]
fn rerun_with_no_new_messages_writes_nothing() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Acme", "body", 0)]);
    let model = ScriptedModel::new(vec![&reply("SWE", "Acme", "Received")]);
    let store = MemoryStore::new();

    let mut first = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    first.run().unwrap();

    let model = ScriptedModel::new(vec![]);
    let mut second = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = second.run().unwrap();

    assert_eq!(summary.listed, 0);
    assert!(summary.flush_succeeded);
    assert!(model.prompts().is_empty());

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.companies.len(), 1);
    assert_eq!(snapshot.applications.len(), 1);
}

#[test]
fn same_status_message_is_a_noop() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Acme update", "body", 0)]);
    let model = ScriptedModel::new(vec![&reply("SWE Intern", "Acme Corp", "Received")]);
    let store = seeded_store();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.applications_created, 0);
    assert_eq!(summary.applications_updated, 0);
    assert_eq!(summary.processed, 1);

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.applications.len(), 1);
    assert_eq!(snapshot.applications[0].last_updated, "01/01/2025");
}

#[test]
fn status_change_updates_stored_row_in_place() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Interview invite", "body", 0)]);
    // Variant spelling still resolves to the stored company
    let model = ScriptedModel::new(vec![&reply("SWE Intern", "ACME corp.", "Interview")]);
    let store = seeded_store();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.applications_updated, 1);
    assert_eq!(summary.companies_created, 0);

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.applications.len(), 1);
    assert_eq!(snapshot.applications[0].status, Status::Interview);
    assert_eq!(snapshot.applications[0].last_updated, "01/15/2025");
    assert_eq!(snapshot.applications[0].date_applied, "01/01/2025");
    // Canonical spelling never regresses
    assert_eq!(snapshot.companies[0].name, "Acme Corp");
}

#[test]
fn duplicate_messages_in_one_run_collapse() {
    let mailbox = MemoryMailbox::new(vec![
        plain_message("m1", "Applied to Globex", "body", 0),
        plain_message("m2", "Globex confirmation", "body", 1),
    ]);
    let model = ScriptedModel::new(vec![
        &reply("Analyst", "Globex", "Received"),
        &reply("Analyst", "Globex Inc.", "Received"),
    ]);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.companies_created, 1);
    assert_eq!(summary.applications_created, 1);
    assert_eq!(summary.unchanged, 1);

    // Only one snapshot fetch for the whole run; asserted before the
    // verification read below bumps the counter
    assert_eq!(store.read_count(), 1);

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.companies.len(), 1);
    assert_eq!(snapshot.applications.len(), 1);
}

#[test]
fn parse_failure_leaves_message_unprocessed() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Newsletter", "body", 0)]);
    let model = ScriptedModel::new(vec!["I could not find any application details here."]);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.parse_failures, 1);
    assert_eq!(summary.processed, 0);
    assert!(summary.flush_succeeded);
    assert!(mailbox.processed_ids().is_empty());
    assert!(mailbox.quarantined_ids().is_empty());
    assert!(store.read_snapshot().unwrap().applications.is_empty());
}

#[test]
fn parse_failure_quarantined_when_configured() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Newsletter", "body", 0)]);
    let model = ScriptedModel::new(vec!["no json here"]);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), true);
    pipeline.run().unwrap();

    assert_eq!(mailbox.quarantined_ids(), vec!["m1".to_string()]);
    assert!(mailbox.processed_ids().is_empty());
    // Quarantined messages are gone from the next listing
    assert!(mailbox.list_unprocessed().unwrap().is_empty());
}

#[test]
fn flush_failure_leaves_messages_eligible_for_retry() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Acme", "body", 0)]);
    let model = ScriptedModel::new(vec![&reply("SWE", "Acme", "Received")]);
    let store = MemoryStore::new();
    store.fail_application_appends.set(true);

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert!(!summary.flush_succeeded);
    assert_eq!(summary.processed, 0);
    assert!(mailbox.processed_ids().is_empty());
    assert_eq!(mailbox.list_unprocessed().unwrap().len(), 1);
}

#[test]
fn model_error_skips_message_without_quarantine() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Acme", "body", 0)]);
    let model = ScriptedModel::new(vec![]);
    model.fail_calls.set(true);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), true);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.model_errors, 1);
    assert_eq!(summary.processed, 0);
    // Transport errors are transient, never quarantined
    assert!(mailbox.quarantined_ids().is_empty());
    assert_eq!(mailbox.list_unprocessed().unwrap().len(), 1);
}

#[test]
fn snapshot_read_failure_still_processes_as_new() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "Acme", "body", 0)]);
    let model = ScriptedModel::new(vec![&reply("SWE", "Acme", "Received")]);
    let store = MemoryStore::new();
    store.fail_reads.set(true);

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.companies_created, 1);
    assert_eq!(summary.applications_created, 1);
    assert!(summary.flush_succeeded);

    store.fail_reads.set(false);
    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.applications.len(), 1);
}

#[test]
fn placeholder_company_counts_as_key_missing() {
    let mailbox = MemoryMailbox::new(vec![plain_message("m1", "???", "body", 0)]);
    let model = ScriptedModel::new(vec![&reply("SWE", "Unknown", "Received")]);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.key_missing, 1);
    assert_eq!(summary.processed, 0);
    assert!(store.read_snapshot().unwrap().companies.is_empty());
}

#[test]
fn one_bad_message_never_blocks_the_rest() {
    let mailbox = MemoryMailbox::new(vec![
        plain_message("m1", "Applied to Acme", "body", 0),
        plain_message("m2", "Newsletter", "body", 1),
        plain_message("m3", "Globex decision", "body", 2),
    ]);
    let model = ScriptedModel::new(vec![
        &reply("SWE", "Acme", "Received"),
        "sorry, that email does not contain an application",
        &reply("Analyst", "Globex", "Rejected"),
    ]);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.listed, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.parse_failures, 1);
    assert_eq!(summary.companies_created, 2);
    assert_eq!(summary.applications_created, 2);

    let mut processed = mailbox.processed_ids();
    processed.sort();
    assert_eq!(processed, vec!["m1".to_string(), "m3".to_string()]);

    let snapshot = store.read_snapshot().unwrap();
    assert_eq!(snapshot.applications.len(), 2);
    assert_eq!(snapshot.applications[1].status, Status::Rejected);
}

#[test]
fn prompts_carry_subject_and_body() {
    let mailbox = MemoryMailbox::new(vec![plain_message(
        "m1",
        "Your Acme application",
        "We received your application.",
        0,
    )]);
    let model = ScriptedModel::new(vec![&reply("SWE", "Acme", "Received")]);
    let store = MemoryStore::new();

    let mut pipeline = Pipeline::new(&mailbox, &model, &store, Duration::minutes(15), false);
    pipeline.run().unwrap();

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Your Acme application"));
    assert!(prompts[0].contains("We received your application."));
}
