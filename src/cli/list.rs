//! List command implementation

use anyhow::Result;

use crate::extract::normalize::normalize_key;
use crate::extract::Status;
use crate::store::{SheetStore, SqliteStore};

pub fn run(store: &SqliteStore, status: Option<String>, company: Option<String>) -> Result<()> {
    let status_filter = match status.as_deref() {
        Some(raw) => match Status::parse(raw) {
            Some(status) => Some(status),
            None => {
                println!("Unknown status '{raw}'. Expected one of: Received, Rejected, Reviewing, Interview, Accepted, Draft.");
                return Ok(());
            }
        },
        None => None,
    };
    let company_filter = company.as_deref().map(normalize_key);

    let snapshot = store.read_snapshot()?;
    let applications: Vec<_> = snapshot
        .applications
        .iter()
        .filter(|app| status_filter.map(|f| app.status == f).unwrap_or(true))
        .filter(|app| {
            company_filter
                .as_deref()
                .map(|key| normalize_key(&app.company) == key)
                .unwrap_or(true)
        })
        .collect();

    if applications.is_empty() {
        println!("No applications found. Run 'apptrack run' first.");
        return Ok(());
    }

    println!(
        "{:<11} {:<24} {:<12} {:<12} {:<8} {:<8} {}",
        "Status", "Company", "Applied", "Updated", "Co. ID", "Job ID", "Role"
    );
    println!("{}", "-".repeat(100));

    for app in applications {
        let company = truncated(&app.company, 22);

        println!(
            "{:<11} {:<24} {:<12} {:<12} {:<8} {:<8} {}",
            app.status.as_str(),
            company,
            app.date_applied,
            app.last_updated,
            app.company_id,
            app.job_id,
            app.role,
        );
    }

    Ok(())
}

/// Cut `name` to at most `max` characters for column display, counting
/// characters rather than bytes so multibyte names never split mid-char.
fn truncated(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let cut: String = name.chars().take(max - 3).collect();
    format!("{cut}...")
}
