//! Structured `User-Agent` header.
//!
//! The API expects the agent as space-separated `Key/Value` components, e.g.
//! `Ewarehousing/0.1.0 Rust/1.75`. Keys are camel-cased and neither keys nor
//! values may contain whitespace.

use std::fmt;

/// Ordered set of user-agent components
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent {
    components: Vec<(String, String)>,
}

impl UserAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a component
    ///
    /// With `sanitize` set, the key is split on whitespace and each fragment
    /// capitalized before concatenation, and whitespace runs inside the value
    /// become single underscores. Without it the caller is responsible for
    /// the format. Replacing a key keeps its original position.
    pub fn set(&mut self, key: &str, value: &str, sanitize: bool) {
        let (key, value) = if sanitize {
            (sanitize_key(key), sanitize_value(value))
        } else {
            (key.to_string(), value.to_string())
        };

        match self.components.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.components.push((key, value)),
        }
    }

    /// Value stored for `key`, if any
    pub fn get(&self, key: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}/{}", key, value)?;
        }
        Ok(())
    }
}

fn sanitize_key(key: &str) -> String {
    key.split_whitespace().map(capitalize).collect()
}

fn sanitize_value(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        value.split_whitespace().collect::<Vec<_>>().join("_")
    } else {
        value.to_string()
    }
}

/// Uppercase the first character and lowercase the rest
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
