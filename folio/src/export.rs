//! Bulk export: a bounded cursor walk flattened to one CSV document.

use serde_json::Value;

use crate::error::{BadRequest, Result};
use crate::media::MediaType;
use crate::query::{compiler, validator};
use crate::response::{self, csv};
use crate::service::SearchService;
use crate::works;

impl SearchService {
    /// Collect up to `export_max_pages` result pages into CSV bytes.
    ///
    /// Pages are fetched with cursor pagination so deep result sets do
    /// not pay the offset cost; larger sets are truncated at the cap.
    pub async fn export(&self, raw_pairs: &[(String, String)]) -> Result<Vec<u8>> {
        let profile = &self.export_profile;
        let mut query =
            validator::validate(profile, raw_pairs, MediaType::Csv, self.works_url.clone())?;

        // The walk re-issues the query page after page, which only works
        // under a stable order.
        if let Some(sort_value) = query.get(profile.policy.sort) {
            if validator::resolves_to_relevance(profile, sort_value) {
                let mut findings = BadRequest::new();
                findings.conflict("export requires a stable sort, not relevance");
                findings.into_result()?;
            }
        }
        query = query.with_param(profile.policy.aggregation, "none");

        let mut rows = Vec::new();
        for page in 0..self.export_max_pages {
            let body = compiler::compile(profile, &query)?;
            let raw = self.execute(&body).await?;
            if raw.hits.hits.is_empty() {
                break;
            }

            let sources: Vec<Value> = raw.hits.hits.iter().map(|h| h.source.clone()).collect();
            let docs = response::apply_mutators(sources, &self.mutators);
            rows.extend(docs.iter().map(works::csv::row));

            let cursor = raw
                .hits
                .hits
                .last()
                .map(|hit| response::cursor_of(&hit.sort))
                .unwrap_or_default();
            if cursor.is_empty() {
                tracing::debug!(page, "export page carried no cursor, stopping");
                break;
            }
            query = query
                .without(profile.policy.from)
                .with_param(profile.policy.search_after, cursor);
        }

        csv::write_rows(&rows)
    }
}
