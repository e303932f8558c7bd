//! Init command implementation

use anyhow::Result;

use crate::config::Config;
use crate::store::SqliteStore;

/// Create the mailbox directory, the store database, and a starter config
/// file so a first `apptrack run` has everything it needs.
pub fn run(config: &Config, config_path: &str) -> Result<()> {
    let mailbox_path = config.mailbox_path();
    if mailbox_path.exists() {
        println!("Mailbox already exists: {}", mailbox_path.display());
    } else {
        std::fs::create_dir_all(&mailbox_path)?;
        println!("Created mailbox: {}", mailbox_path.display());
    }

    let store_path = config.store_path();
    SqliteStore::open(&store_path)?;
    println!("Initialized store: {}", store_path.display());

    let expanded = shellexpand::tilde(config_path).to_string();
    let path = std::path::Path::new(&expanded);
    if path.exists() {
        println!("Config already exists: {}", path.display());
    } else {
        let content = serde_yaml::to_string(config)?;
        std::fs::write(path, content)?;
        println!("Wrote config: {}", path.display());
    }

    println!("\nDrop provider message JSON files into the mailbox, then run 'apptrack run'.");
    Ok(())
}
