//! Structured-record recovery from free-form model replies
//!
//! Models reliably wrap their answers in prose or malformed code fences,
//! so recovery is an ordered list of strategies, cheapest first, each a
//! pure function `&str -> Option<ExtractedRecord>`. The first success wins;
//! when all fail the caller gets a definite failure, never a half-populated
//! record.

pub mod normalize;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Application status as reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Received,
    Rejected,
    Reviewing,
    Interview,
    Accepted,
    Draft,
}

impl Status {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "received" => Some(Status::Received),
            "rejected" => Some(Status::Rejected),
            "reviewing" => Some(Status::Reviewing),
            "interview" => Some(Status::Interview),
            "accepted" => Some(Status::Accepted),
            "draft" => Some(Status::Draft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Received => "Received",
            Status::Rejected => "Rejected",
            Status::Reviewing => "Reviewing",
            Status::Interview => "Interview",
            Status::Accepted => "Accepted",
            Status::Draft => "Draft",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured record recovered from a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    /// Position title; may be empty when the email never names one
    pub job_title: String,
    pub company: String,
    pub status: Status,
}

/// Wire shape of the reply the model is instructed to produce.
#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(rename = "Job Name", alias = "Job Title", alias = "Role", default)]
    job_name: String,

    #[serde(rename = "Company", alias = "Company Name")]
    company: String,

    #[serde(rename = "Status")]
    status: String,
}

impl RawReply {
    /// Validate into a record; a blank company or unrecognized status
    /// makes the whole strategy fail rather than passing junk downstream.
    fn validate(self) -> Option<ExtractedRecord> {
        let company = self.company.trim().to_string();
        if company.is_empty() {
            return None;
        }
        let status = Status::parse(&self.status)?;
        Some(ExtractedRecord {
            job_title: self.job_name.trim().to_string(),
            company,
            status,
        })
    }
}

/// Parse strategies in cost order. First success wins.
const STRATEGIES: &[(&str, fn(&str) -> Option<ExtractedRecord>)] = &[
    ("whole", parse_whole),
    ("fenced", parse_fenced),
    ("braced", parse_braced),
    ("fields", parse_fields),
];

/// Recover a record from a raw model reply, reporting which strategy
/// succeeded so parse quality is observable per run.
pub fn parse_reply(raw: &str) -> Option<(ExtractedRecord, &'static str)> {
    for (name, strategy) in STRATEGIES {
        if let Some(record) = strategy(raw) {
            return Some((record, name));
        }
    }
    None
}

/// Strategy 1: the entire trimmed blob is a JSON document.
fn parse_whole(raw: &str) -> Option<ExtractedRecord> {
    let reply: RawReply = serde_json::from_str(raw.trim()).ok()?;
    reply.validate()
}

/// Strategy 2: a fenced block, optionally tagged (```json ... ```).
fn parse_fenced(raw: &str) -> Option<ExtractedRecord> {
    let fence = Regex::new(r"(?s)```(?:json)?(.*?)```").unwrap();
    let inner = fence.captures(raw)?.get(1)?.as_str().trim();
    let reply: RawReply = serde_json::from_str(inner).ok()?;
    reply.validate()
}

/// Strategy 3: the first balanced `{...}` span, brace-counted outside of
/// string literals.
fn parse_braced(raw: &str) -> Option<ExtractedRecord> {
    let span = balanced_brace_span(raw)?;
    let reply: RawReply = serde_json::from_str(span).ok()?;
    reply.validate()
}

/// Strategy 4: independent field-level extraction. Succeeds only when both
/// company and status are recovered; the job title defaults to empty.
fn parse_fields(raw: &str) -> Option<ExtractedRecord> {
    let job_name = capture_field(raw, "Job Name").unwrap_or_default();
    let company = capture_field(raw, "Company")?;
    let status = capture_field(raw, "Status")?;
    RawReply {
        job_name,
        company,
        status,
    }
    .validate()
}

fn capture_field(raw: &str, key: &str) -> Option<String> {
    let pattern = Regex::new(&format!(r#""{}"\s*:\s*"([^"]*)""#, regex::escape(key))).unwrap();
    pattern
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Find the first balanced top-level brace span in `raw`.
fn balanced_brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
