//! Command implementations for the apptrack binary

pub mod companies;
pub mod init;
pub mod list;
pub mod run;
pub mod stats;
