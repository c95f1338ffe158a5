//! Set-valued fields: splitting delimited text into trimmed, de-duplicated tokens.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::model::FieldValue;

/// Pick the separator that yields the most non-blank segments.
///
/// Separators are tried in priority order and only a strictly larger count
/// replaces the current best, so the earlier separator wins ties.
pub fn best_separator<'a>(text: &str, separators: &'a [String]) -> Option<&'a str> {
    let mut best: Option<&'a str> = None;
    let mut best_count = 0usize;

    for sep in separators {
        if sep.is_empty() || !text.contains(sep.as_str()) {
            continue;
        }
        let count = text.split(sep.as_str()).filter(|s| !s.trim().is_empty()).count();
        if count > best_count {
            best_count = count;
            best = Some(sep.as_str());
        }
    }

    best
}

/// Cumulative token set. Adding the same value twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSet {
    tokens: BTreeSet<String>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the tokens of one field value. Absent values add nothing.
    pub fn extend_from(&mut self, value: Option<&FieldValue>, separators: &[String]) {
        match value {
            None => {}
            Some(FieldValue::List(items)) => {
                for item in items {
                    self.insert_token(item);
                }
            }
            Some(FieldValue::Text(text)) => self.insert_text(text, separators),
        }
    }

    pub fn insert_text(&mut self, text: &str, separators: &[String]) {
        match best_separator(text, separators) {
            Some(sep) => {
                for segment in text.split(sep) {
                    self.insert_token(segment);
                }
            }
            None => self.insert_token(text),
        }
    }

    fn insert_token(&mut self, raw: &str) {
        let token = raw.trim();
        if !token.is_empty() {
            self.tokens.insert(token.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Output form: a JSON array, or `""` when the set is empty.
    pub fn into_json(self) -> Value {
        if self.is_empty() {
            Value::String(String::new())
        } else {
            Value::Array(self.tokens.into_iter().map(Value::String).collect())
        }
    }
}
