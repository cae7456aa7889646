//! Flat key/value inputs: query strings and form bodies.

use super::errors::{ValidationError, ValidationErrors};

/// Decoded key/value pairs from a single request source (`query` or `body`)
#[derive(Debug, Clone)]
pub struct FieldSet {
    source: &'static str,
    /// Form semantics treat an empty value as if the key were absent
    blank_is_missing: bool,
    pairs: Vec<(String, String)>,
}

impl FieldSet {
    pub const fn new(source: &'static str, blank_is_missing: bool) -> Self {
        Self {
            source,
            blank_is_missing,
            pairs: Vec::new(),
        }
    }

    /// Percent-decode an `application/x-www-form-urlencoded` payload
    pub fn from_urlencoded(source: &'static str, blank_is_missing: bool, input: &[u8]) -> Self {
        let mut set = Self::new(source, blank_is_missing);
        set.pairs = form_urlencoded::parse(input).into_owned().collect();
        set
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Last value supplied for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !(self.blank_is_missing && v.is_empty()))
    }

    /// Required string value; records a validation error when absent
    pub fn required_str(&self, name: &str, errors: &mut ValidationErrors) -> Option<String> {
        if let Some(value) = self.get(name) {
            Some(value.to_string())
        } else {
            errors.push(ValidationError::missing(self.source, name));
            None
        }
    }

    /// Required integer value; records a validation error when absent or malformed
    pub fn required_int(&self, name: &str, errors: &mut ValidationErrors) -> Option<i64> {
        let Some(raw) = self.get(name) else {
            errors.push(ValidationError::missing(self.source, name));
            return None;
        };
        if let Ok(value) = raw.trim().parse::<i64>() {
            Some(value)
        } else {
            errors.push(ValidationError::not_an_integer(self.source, name));
            None
        }
    }
}
