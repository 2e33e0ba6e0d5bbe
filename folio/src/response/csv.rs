//! CSV rendering for exports and `text/csv` responses.
//!
//! The output is aimed at spreadsheet imports: a UTF-8 byte-order mark,
//! semicolon delimiter, every field quoted, CRLF line endings and no
//! header row.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::Result;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// One flattened document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvRow {
    pub url: String,
    pub title: String,
    pub publication_date: String,
    pub category: String,
    pub contributors: String,
}

/// Render rows to finished CSV bytes.
pub fn write_rows(rows: &[CsvRow]) -> Result<Vec<u8>> {
    let mut out = Vec::from(UTF8_BOM);
    {
        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::CRLF)
            .has_headers(false)
            .from_writer(&mut out);
        for row in rows {
            writer.write_record([
                row.url.as_str(),
                row.title.as_str(),
                row.publication_date.as_str(),
                row.category.as_str(),
                row.contributors.as_str(),
            ])?;
        }
        writer.flush()?;
    }
    Ok(out)
}
