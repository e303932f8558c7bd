//! Companies command implementation

use anyhow::Result;

use crate::extract::normalize::{closest_match, normalize_key};
use crate::store::{SheetStore, SqliteStore};

pub fn run(store: &SqliteStore) -> Result<()> {
    let snapshot = store.read_snapshot()?;

    if snapshot.companies.is_empty() {
        println!("No companies found. Run 'apptrack run' first.");
        return Ok(());
    }

    println!("{:<8} {:<30} {}", "ID", "Company", "Applications");
    println!("{}", "-".repeat(60));

    for company in &snapshot.companies {
        let count = snapshot
            .applications
            .iter()
            .filter(|app| app.company_id == company.company_id)
            .count();
        println!("{:<8} {:<30} {}", company.company_id, company.name, count);
    }

    // Surface likely duplicates: rows created before the normalizer knew
    // about a spelling variant.
    for (i, company) in snapshot.companies.iter().enumerate() {
        let key = normalize_key(&company.name);
        let earlier: Vec<String> = snapshot.companies[..i]
            .iter()
            .map(|c| c.name.clone())
            .collect();

        let exact = snapshot.companies[..i]
            .iter()
            .find(|c| normalize_key(&c.name) == key);
        if let Some(dup) = exact {
            println!(
                "\n⚠ '{}' and '{}' resolve to the same company key.",
                company.name, dup.name
            );
        } else if let Some(near) = closest_match(&company.name, &earlier, 0.8) {
            println!(
                "\n⚠ '{}' looks similar to '{}'; possible duplicate.",
                company.name, near
            );
        }
    }

    Ok(())
}
