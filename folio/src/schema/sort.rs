//! Sort-key schema: logical sort names mapped to backend sort paths.

use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::normalize_key;

/// One logical sort key. A key may expand to several backend paths
/// (e.g. a date sorted by year field then month field).
#[derive(Debug, Clone)]
pub struct SortKeyDefinition {
    pub name: &'static str,
    key_pattern: Regex,
    fields: Vec<String>,
}

impl SortKeyDefinition {
    pub fn new(name: &'static str, fields: &[&str]) -> Result<Self> {
        Self::with_pattern(name, &regex::escape(&normalize_key(name)), fields)
    }

    /// Accept alternate spellings, e.g. `"relevance|score"`.
    pub fn with_pattern(name: &'static str, pattern: &str, fields: &[&str]) -> Result<Self> {
        let key_pattern = Regex::new(&format!("^(?i:{pattern})$"))
            .map_err(|e| Error::Schema(format!("bad sort key pattern '{pattern}': {e}")))?;
        Ok(Self {
            name,
            key_pattern,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        })
    }

    pub fn matches(&self, raw: &str) -> bool {
        self.key_pattern.is_match(&normalize_key(raw))
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

#[derive(Debug, Clone)]
pub struct SortKeySchema {
    keys: Vec<SortKeyDefinition>,
}

impl SortKeySchema {
    pub fn new(keys: Vec<SortKeyDefinition>) -> Self {
        Self { keys }
    }

    pub fn lookup(&self, raw: &str) -> Option<&SortKeyDefinition> {
        self.keys.iter().find(|k| k.matches(raw))
    }

    pub fn keys(&self) -> impl Iterator<Item = &SortKeyDefinition> {
        self.keys.iter()
    }

    /// Valid names for error messages.
    pub fn names(&self) -> Vec<&'static str> {
        self.keys.iter().map(|k| k.name).collect()
    }
}
