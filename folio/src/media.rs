//! Content negotiation for the search endpoints.

use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Json,
    JsonLd,
    Csv,
}

impl MediaType {
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Json => "application/json; charset=utf-8",
            MediaType::JsonLd => "application/ld+json",
            MediaType::Csv => "text/csv; charset=utf-8",
        }
    }

    /// Match a single media range. Parameters after ';' are tolerated
    /// and ignored, so "application/json;version=2024" negotiates fine.
    fn from_range(range: &str) -> Option<MediaType> {
        let essence = range.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "" | "*/*" | "application/*" | "application/json" => Some(MediaType::Json),
            "application/ld+json" => Some(MediaType::JsonLd),
            "text/csv" => Some(MediaType::Csv),
            _ => None,
        }
    }

    /// Resolve an Accept header to a response media type.
    ///
    /// A missing header means JSON. The first recognized range wins;
    /// a header with no recognized range at all is rejected.
    pub fn negotiate(accept: Option<&str>) -> Result<MediaType> {
        let header = match accept {
            None => return Ok(MediaType::Json),
            Some(h) if h.trim().is_empty() => return Ok(MediaType::Json),
            Some(h) => h,
        };
        header
            .split(',')
            .find_map(MediaType::from_range)
            .ok_or_else(|| Error::UnsupportedMediaType(header.to_string()))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}
