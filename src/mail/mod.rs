//! Mail source seam and the file-backed mailbox
//!
//! The pipeline consumes messages through `MailSource`; the bundled
//! implementation reads provider-shaped JSON files from a directory and
//! keeps a processed/quarantined ledger beside them, so runs against the
//! same mailbox never re-ingest consumed messages.

pub mod payload;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{MailError, MailResult};

use payload::{MessagePayload, RawPart};

/// One fetched message. Immutable once listed; scope is a single run.
#[derive(Debug, Clone)]
pub struct Message {
    /// Stable provider-assigned id
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub sent_at: DateTime<Utc>,
    pub payload: MessagePayload,
}

/// Collaborator contract for listing and labeling mail.
pub trait MailSource {
    /// Messages not yet consumed, in ascending sent-at order.
    fn list_unprocessed(&self) -> MailResult<Vec<Message>>;

    /// Label messages as consumed; they disappear from future listings.
    fn mark_processed(&self, ids: &[String]) -> MailResult<()>;

    /// Move messages into the quarantine bucket so they stop being
    /// retried. Sources without such a bucket may leave this a no-op.
    fn quarantine(&self, _ids: &[String]) -> MailResult<()> {
        Ok(())
    }
}

/// Wire shape of one mailbox message file.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    subject: String,

    #[serde(rename = "from", default)]
    sender: String,

    /// Epoch milliseconds, as delivered by the provider
    #[serde(rename = "internalDate", default)]
    internal_date: i64,

    payload: RawPart,
}

/// Processed/quarantined ledger persisted next to the message files.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MailboxState {
    #[serde(default)]
    processed: BTreeSet<String>,

    #[serde(default)]
    quarantined: BTreeSet<String>,
}

/// A directory of message JSON files plus a `state.json` ledger.
pub struct FileMailbox {
    base_path: PathBuf,
}

impl FileMailbox {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn is_available(&self) -> bool {
        self.base_path.exists()
    }

    fn state_path(&self) -> PathBuf {
        self.base_path.join("state.json")
    }

    fn load_state(&self) -> MailResult<MailboxState> {
        let path = self.state_path();
        if !path.exists() {
            return Ok(MailboxState::default());
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| MailError::State(Box::new(e)))
    }

    fn save_state(&self, state: &MailboxState) -> MailResult<()> {
        let content =
            serde_json::to_string_pretty(state).map_err(|e| MailError::State(Box::new(e)))?;
        std::fs::write(self.state_path(), content)?;
        Ok(())
    }

    fn read_message(&self, path: &Path) -> MailResult<Message> {
        let content = std::fs::read_to_string(path)?;
        let raw: RawMessage =
            serde_json::from_str(&content).map_err(|e| MailError::Malformed {
                id: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let id = raw.id.unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string()
        });

        let sent_at = Utc
            .timestamp_millis_opt(raw.internal_date)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Message {
            id,
            subject: raw.subject,
            sender: raw.sender,
            sent_at,
            payload: raw.payload.into(),
        })
    }
}

impl MailSource for FileMailbox {
    fn list_unprocessed(&self) -> MailResult<Vec<Message>> {
        if !self.base_path.exists() {
            return Err(MailError::Unavailable(
                self.base_path.display().to_string(),
            ));
        }

        let state = self.load_state()?;
        let mut messages = vec![];

        for entry in std::fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if path.file_name().map(|n| n == "state.json").unwrap_or(false) {
                    continue;
                }
                match self.read_message(&path) {
                    Ok(message) => {
                        if !state.processed.contains(&message.id)
                            && !state.quarantined.contains(&message.id)
                        {
                            messages.push(message);
                        }
                    }
                    Err(err) => {
                        // One malformed file never blocks the mailbox
                        warn!(path = %path.display(), error = %err, "skipping unreadable message");
                    }
                }
            }
        }

        // Oldest first; reconciliation depends on chronological staging
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }

    fn mark_processed(&self, ids: &[String]) -> MailResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut state = self.load_state()?;
        state.processed.extend(ids.iter().cloned());
        self.save_state(&state)
    }

    fn quarantine(&self, ids: &[String]) -> MailResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut state = self.load_state()?;
        state.quarantined.extend(ids.iter().cloned());
        self.save_state(&state)
    }
}
