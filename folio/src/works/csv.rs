//! Flattening work documents to export rows.

use serde_json::Value;

use crate::response::csv::CsvRow;

/// One work document to one export row. Missing fields become empty
/// columns rather than errors; exports are best effort per hit.
pub fn row(doc: &Value) -> CsvRow {
    CsvRow {
        url: scalar(&doc["id"]),
        title: scalar(&doc["entityDescription"]["mainTitle"]),
        publication_date: publication_date(doc),
        category: scalar(&doc["entityDescription"]["reference"]["publicationInstance"]["type"]),
        contributors: contributors(doc),
    }
}

/// Year, month and day joined with '-'; parts absent on the right are
/// dropped, so a year-only date stays "2021".
fn publication_date(doc: &Value) -> String {
    let date = &doc["entityDescription"]["publicationDate"];
    ["year", "month", "day"]
        .iter()
        .map(|part| scalar(&date[*part]))
        .take_while(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn contributors(doc: &Value) -> String {
    doc["entityDescription"]["contributors"]
        .as_array()
        .map(|list| {
            list.iter()
                .map(|c| scalar(&c["identity"]["name"]))
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// Indexes store years both as strings and numbers; render either.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
