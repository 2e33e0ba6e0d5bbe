use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Bad request: {0}")]
    BadRequest(BadRequest),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Everything wrong with one request, collected in a single pass.
///
/// The validator never aborts on the first finding; it keeps scanning and
/// merges all findings into one of these, so the caller can fix the whole
/// request at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadRequest {
    pub unknown_keys: Vec<String>,
    pub invalid_values: Vec<InvalidValue>,
    pub missing_keys: Vec<String>,
    pub conflicts: Vec<String>,
}

/// One rejected key/value pair with the definition's error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    pub key: String,
    pub value: String,
    pub message: String,
}

impl BadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.unknown_keys.is_empty()
            && self.invalid_values.is_empty()
            && self.missing_keys.is_empty()
            && self.conflicts.is_empty()
    }

    pub fn unknown_key(&mut self, key: impl Into<String>) {
        self.unknown_keys.push(key.into());
    }

    pub fn invalid_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.invalid_values.push(InvalidValue {
            key: key.into(),
            value: value.into(),
            message: message.into(),
        });
    }

    pub fn missing_key(&mut self, key: impl Into<String>) {
        self.missing_keys.push(key.into());
    }

    pub fn conflict(&mut self, message: impl Into<String>) {
        self.conflicts.push(message.into());
    }

    /// Ok when nothing was recorded, otherwise the merged error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::BadRequest(self))
        }
    }
}

impl fmt::Display for BadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.unknown_keys.is_empty() {
            parts.push(format!(
                "unknown parameter(s): {}",
                self.unknown_keys.join(", ")
            ));
        }
        for iv in &self.invalid_values {
            parts.push(format!("parameter '{}' {} (got '{}')", iv.key, iv.message, iv.value));
        }
        if !self.missing_keys.is_empty() {
            parts.push(format!(
                "missing required parameter(s): {}",
                self.missing_keys.join(", ")
            ));
        }
        parts.extend(self.conflicts.iter().cloned());
        write!(f, "{}", parts.join("; "))
    }
}

impl From<BadRequest> for Error {
    fn from(findings: BadRequest) -> Self {
        Error::BadRequest(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_findings_are_ok() {
        assert!(BadRequest::new().into_result().is_ok());
    }

    #[test]
    fn all_findings_appear_in_one_message() {
        let mut findings = BadRequest::new();
        findings.unknown_key("tittles");
        findings.invalid_value("publicationYear", "twenty", "must be a number");
        findings.missing_key("query");
        let err = findings.into_result().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("tittles"));
        assert!(msg.contains("publicationYear"));
        assert!(msg.contains("twenty"));
        assert!(msg.contains("query"));
    }
}
