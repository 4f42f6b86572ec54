//! Attribute Lines
//!
//! Splits a single `Key = Value` line into its parts and handles the
//! comma-separated lists used by multi-valued attributes.

use std::fmt::Display;

/// A `(key, value)` pair parsed from one configuration line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    key: String,
    value: String,
}

impl Attribute {
    /// Parse a line on its first `=`, trimming both sides.
    ///
    /// Returns `None` when there is no `=` or the key is empty.
    pub fn parse(line: &str) -> Option<Self> {
        let (key, value) = line.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        Some(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }

    /// Key as written in the input
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Value with surrounding whitespace removed
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Split a comma-separated value, dropping empty tokens
pub fn split(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join values with `", "` for human-readable output
pub fn join<I>(values: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
