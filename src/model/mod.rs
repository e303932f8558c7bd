//! Language model invocation seam
//!
//! The model is an opaque function from (subject, body) to free text; the
//! pipeline only depends on this trait, so tests substitute a scripted
//! implementation and never touch a real daemon.

mod ollama;

pub use ollama::OllamaInvoker;

use crate::error::ModelResult;

/// System prompt: the model is a JSON extraction tool and nothing else.
pub const SYSTEM_PROMPT: &str = "You are a JSON extraction tool ONLY. You must NEVER provide \
explanations, descriptions, or any text outside the requested JSON format. ONLY output valid \
JSON inside triple backticks.";

/// Invoke the model with a prepared prompt, returning its raw reply text.
pub trait ModelInvoker {
    fn generate(&self, prompt: &str) -> ModelResult<String>;
}

/// Build the extraction prompt for one email.
pub fn build_prompt(subject: &str, body: &str) -> String {
    format!(
        r#"CRITICAL INSTRUCTIONS:
1. ONLY return a JSON object in the EXACT format shown below
2. DO NOT include any explanations or descriptions
3. DO NOT describe the HTML structure
4. DO NOT engage in conversation
5. Triple backticks MUST wrap your JSON response

EXTRACT these fields:
- "Job Name": Position title with ID if present
- "Company": Company name (extract from domain or signature if needed)
- "Status": EXACTLY one of: "Received", "Rejected", "Reviewing", "Interview", "Accepted", or "Draft"

STATUS DEFINITIONS:
- "Received": Initial application acknowledgements, thank you messages
- "Rejected": Clear rejections ("not moving forward", "other candidates", etc)
- "Reviewing": Application under consideration, next steps pending
- "Interview": Interview invitations or scheduling
- "Accepted": Offers extended or accepted
- "Draft": Only when status is completely unclear

YOUR RESPONSE MUST BE ONLY:
```
{{
    "Job Name": "extracted job title",
    "Company": "extracted company name",
    "Status": "one of the allowed status values"
}}
```

EMAIL SUBJECT:
{subject}

EMAIL BODY:
{body}"#
    )
}
