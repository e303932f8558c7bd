//! Run command implementation

use anyhow::Result;

use crate::config::Config;
use crate::mail::FileMailbox;
use crate::model::OllamaInvoker;
use crate::pipeline::Pipeline;
use crate::store::SqliteStore;

pub fn run(config: &Config, store: &SqliteStore) -> Result<()> {
    let mailbox = FileMailbox::new(config.mailbox_path());
    if !mailbox.is_available() {
        println!(
            "Mailbox not found at {}. Run 'apptrack init' first.",
            config.mailbox_path().display()
        );
        return Ok(());
    }

    let model = OllamaInvoker::new(&config.model.endpoint, &config.model.name)?;

    let mut pipeline = Pipeline::new(
        &mailbox,
        &model,
        store,
        config.cache_ttl(),
        config.mailbox.quarantine_failures,
    );

    println!("Checking mailbox at {}...\n", config.mailbox_path().display());
    let summary = pipeline.run()?;

    if summary.listed == 0 {
        println!("No new messages.");
        return Ok(());
    }

    println!("Messages seen:        {}", summary.listed);
    println!("Processed:            {}", summary.processed);
    println!("New companies:        {}", summary.companies_created);
    println!("New applications:     {}", summary.applications_created);
    println!("Status updates:       {}", summary.applications_updated);
    println!("Unchanged:            {}", summary.unchanged);

    if summary.parse_failures > 0 {
        println!("Parse failures:       {}", summary.parse_failures);
    }
    if summary.key_missing > 0 {
        println!("Missing company:      {}", summary.key_missing);
    }
    if summary.model_errors > 0 {
        println!("Model errors:         {}", summary.model_errors);
    }

    if !summary.flush_succeeded {
        println!("\n⚠ Some writes failed; messages were left unprocessed for retry.");
    } else {
        println!("\n✅ Run complete!");
    }
    Ok(())
}
