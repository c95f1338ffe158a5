//! Vendor-name canonicalization.
//!
//! The grouping key is derived from the raw name in three steps:
//!
//! 1. Keep only the text before the first `\`, `/`, newline, or run of three
//!    or more whitespace characters.
//! 2. Drop a parenthesized suffix at the very end.
//! 3. Unless the name is entirely ASCII letters, cut at the first whitespace
//!    run followed by a Latin letter (trailing transliterations).
//!
//! Steps 2 and 3 repeat until the name stops changing, so
//! `normalize_name(normalize_name(x)) == normalize_name(x)`.

use std::sync::OnceLock;

use regex::Regex;

fn segment_delimiter() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\\/\n]|\s{3,}").unwrap())
}

fn trailing_parenthetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^)]+\)$").unwrap())
}

fn latin_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z]+$").unwrap())
}

fn trailing_latin() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+[A-Za-z].*$").unwrap())
}

pub fn normalize_name(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let widened = raw.replace('（', "(").replace('）', ")");

    let mut name = match segment_delimiter().find(&widened) {
        Some(m) => widened[..m.start()].trim().to_string(),
        None => widened.trim().to_string(),
    };

    loop {
        let next = strip_annotations(&name);
        if next == name {
            return name;
        }
        name = next;
    }
}

fn strip_annotations(name: &str) -> String {
    let without_suffix = trailing_parenthetical().replace(name, "");
    let trimmed = without_suffix.trim();

    if latin_only().is_match(trimmed) {
        return trimmed.to_string();
    }
    trailing_latin().replace(trimmed, "").trim().to_string()
}
