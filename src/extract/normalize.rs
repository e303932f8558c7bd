//! Company name normalization for identity matching
//!
//! Normalized keys are used purely for equality matching and are never
//! displayed; the canonical spelling stored on first sight wins for display.

/// Sentinel key for names that carry no signal.
pub const UNKNOWN_KEY: &str = "unknown";

/// Legal-entity suffixes stripped from the tail of a name, most specific
/// first so "corp." wins over "co".
const LEGAL_SUFFIXES: &[&str] = &[
    "corporation",
    "company",
    "corp.",
    "corp",
    "inc.",
    "inc",
    "llc.",
    "llc",
    "ltd.",
    "ltd",
    "co.",
    "co",
];

/// Map a raw company string to its normalized matching key.
///
/// Each pass: sentinel check, lowercase, strip one trailing legal suffix,
/// strip everything that is neither alphanumeric nor whitespace, collapse
/// and trim whitespace. Passes repeat until nothing changes, so stacked
/// suffixes ("Acme Co Inc") cannot leave a key that would shrink again on
/// re-normalization. Idempotent.
pub fn normalize_key(raw: &str) -> String {
    let mut key = normalize_once(raw);
    loop {
        let next = normalize_once(&key);
        if next == key {
            return key;
        }
        key = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN_KEY) {
        return UNKNOWN_KEY.to_string();
    }

    let mut name = trimmed.to_lowercase();

    for suffix in LEGAL_SUFFIXES {
        if let Some(stem) = strip_trailing_suffix(&name, suffix) {
            name = stem;
            break;
        }
    }

    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove `suffix` from the end of `name` if it stands as its own word.
/// Returns the stem, or None when the suffix is absent or embedded
/// ("zinc" must not lose "inc").
fn strip_trailing_suffix(name: &str, suffix: &str) -> Option<String> {
    let stem = name.strip_suffix(suffix)?;
    match stem.chars().last() {
        // The whole name is just the suffix; leave it alone.
        None => None,
        Some(c) if c.is_alphanumeric() => None,
        Some(_) => Some(stem.to_string()),
    }
}

/// Find the closest candidate to `name` above `cutoff` similarity.
///
/// Counterpart of difflib's get_close_matches(n=1) for checking free-text
/// names against the backend company list. The reconciliation path itself
/// uses exact normalized-key equality; this is only for caller-side checks.
pub fn closest_match<'a>(name: &str, candidates: &'a [String], cutoff: f64) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let score = strsim::normalized_levenshtein(name, candidate);
        if score >= cutoff && best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate.as_str(), score));
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_and_case_insensitive() {
        assert_eq!(normalize_key("Wex Inc."), "wex");
        assert_eq!(normalize_key("WEX Inc"), "wex");
        assert_eq!(normalize_key("wex"), "wex");
    }

    #[test]
    fn test_punctuation_stripped() {
        assert_eq!(normalize_key("Foo-Bar, LLC"), "foo bar");
        assert_eq!(normalize_key("O'Neil & Sons Ltd."), "o neil sons");
    }

    #[test]
    fn test_stacked_suffixes_all_removed() {
        // Each pass peels one trailing suffix until the key is stable
        assert_eq!(normalize_key("Acme Co Inc"), "acme");
        assert_eq!(normalize_key("Trading Company Co."), "trading");
    }

    #[test]
    fn test_embedded_suffix_not_stripped() {
        assert_eq!(normalize_key("Zinc"), "zinc");
        assert_eq!(normalize_key("Cisco"), "cisco");
    }

    #[test]
    fn test_unknown_sentinel() {
        assert_eq!(normalize_key(""), UNKNOWN_KEY);
        assert_eq!(normalize_key("   "), UNKNOWN_KEY);
        assert_eq!(normalize_key("Unknown"), UNKNOWN_KEY);
        assert_eq!(normalize_key("UNKNOWN"), UNKNOWN_KEY);
    }

    #[test]
    fn test_idempotent() {
        for raw in [
            "Wex Inc.",
            "Foo-Bar, LLC",
            "Acme",
            "unknown",
            "J & J Corp",
            "Acme Co Inc",
            "Acme Co, Inc.",
            "Trading Company Co.",
        ] {
            let once = normalize_key(raw);
            assert_eq!(normalize_key(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_bare_suffix_is_kept() {
        // A company literally named "Co" must not normalize to empty
        assert_eq!(normalize_key("Co"), "co");
    }

    #[test]
    fn test_closest_match() {
        let candidates = vec![
            "Acme Corp".to_string(),
            "Globex".to_string(),
            "Initech".to_string(),
        ];
        assert_eq!(closest_match("Acme Corp.", &candidates, 0.8), Some("Acme Corp"));
        assert_eq!(closest_match("Umbrella", &candidates, 0.8), None);
    }
}
