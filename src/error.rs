//! Typed errors for the tracking pipeline.
//!
//! Uses `thiserror` for library errors; the CLI layer wraps these in
//! `anyhow` at the boundary.

use thiserror::Error;

/// Errors that can occur while talking to a sheet store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the two-table snapshot failed
    #[error("snapshot read failed: {0}")]
    Read(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Appending rows to a table failed
    #[error("append to {table} failed: {source}")]
    Append {
        table: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A targeted cell update failed
    #[error("cell update on {table} failed: {source}")]
    Update {
        table: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Backend-specific failure (open, schema init, ...)
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn read(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Read(Box::new(err))
    }

    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

/// Errors that can occur while listing or labeling mail.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("mailbox unavailable: {0}")]
    Unavailable(String),

    #[error("message {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("mailbox state error: {0}")]
    State(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors that can occur while invoking the language model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model call failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("model reply was malformed: {0}")]
    MalformedReply(String),
}

impl ModelError {
    pub fn request(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ModelError::Request(Box::new(err))
    }
}

/// Why a single message was set aside during a run.
///
/// None of these abort the run; the message is skipped and, except for
/// model transport errors, stays eligible for a future retry.
#[derive(Debug, Error)]
pub enum MessageFailure {
    /// Every parse strategy was exhausted; carries the raw model text
    /// for offline diagnosis.
    #[error("no parse strategy recovered a record")]
    ParseFailure { raw_reply: String },

    /// The extracted record had no usable company value.
    #[error("extracted record has no usable company name")]
    KeyMissing,

    /// The model call itself failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type MailResult<T> = std::result::Result<T, MailError>;
pub type ModelResult<T> = std::result::Result<T, ModelError>;
