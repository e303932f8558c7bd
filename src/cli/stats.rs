//! Stats command implementation

use anyhow::Result;

use crate::extract::Status;
use crate::store::{SheetStore, SqliteStore};

pub fn run(store: &SqliteStore) -> Result<()> {
    let snapshot = store.read_snapshot()?;

    println!("Companies:    {}", snapshot.companies.len());
    println!("Applications: {}", snapshot.applications.len());

    if snapshot.applications.is_empty() {
        return Ok(());
    }

    println!("\nBy status:");
    for status in [
        Status::Received,
        Status::Reviewing,
        Status::Interview,
        Status::Accepted,
        Status::Rejected,
        Status::Draft,
    ] {
        let count = snapshot
            .applications
            .iter()
            .filter(|app| app.status == status)
            .count();
        if count > 0 {
            println!("  {:<11} {}", status.as_str(), count);
        }
    }

    Ok(())
}
