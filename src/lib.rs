pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod mail;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod store;

pub mod testing;

pub use config::Config;
pub use pipeline::{Pipeline, RunSummary};
pub use store::{SheetStore, SqliteStore};
