//! Ties the pipeline together: validate, compile, execute, shape.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::backend::{RawSearchResponse, SearchBackend};
use crate::config::Config;
use crate::error::Result;
use crate::media::MediaType;
use crate::query::dsl::SearchRequestBody;
use crate::query::{compiler, validator, SearchProfile};
use crate::response::{self, csv, DocumentMutator, PagedSearchResult};
use crate::works::{self, WorkParam};

pub struct SearchService {
    pub(crate) profile: SearchProfile<WorkParam>,
    pub(crate) export_profile: SearchProfile<WorkParam>,
    pub(crate) backend: Arc<dyn SearchBackend>,
    pub(crate) mutators: Vec<Box<dyn DocumentMutator>>,
    pub(crate) works_url: Url,
    pub(crate) export_max_pages: u32,
}

/// A finished response body, ready for the HTTP layer.
pub enum SearchOutcome {
    Json(MediaType, PagedSearchResult),
    Csv(Vec<u8>),
}

impl SearchOutcome {
    pub fn content_type(&self) -> &'static str {
        match self {
            SearchOutcome::Json(media, _) => media.mime(),
            SearchOutcome::Csv(_) => MediaType::Csv.mime(),
        }
    }
}

impl SearchService {
    pub fn new(config: &Config, backend: Arc<dyn SearchBackend>) -> Result<Self> {
        let works_url = Url::parse(&format!(
            "{}/works",
            config.server.public_base_url.trim_end_matches('/')
        ))?;
        Ok(Self {
            profile: works::profile(&config.search)?,
            export_profile: works::export_profile(&config.search)?,
            backend,
            mutators: works::mutators::all(),
            works_url,
            export_max_pages: config.search.export_max_pages,
        })
    }

    /// Answer one search request in the negotiated media type.
    pub async fn search(
        &self,
        raw_pairs: &[(String, String)],
        media: MediaType,
    ) -> Result<SearchOutcome> {
        let mut query =
            validator::validate(&self.profile, raw_pairs, media, self.works_url.clone())?;
        if media == MediaType::Csv {
            // aggregations have no place in a flat file
            query = query.with_param(self.profile.policy.aggregation, "none");
        }
        let body = compiler::compile(&self.profile, &query)?;
        metrics::counter!("folio_searches_total").increment(1);
        let raw = self.execute(&body).await?;

        match media {
            MediaType::Csv => {
                let sources: Vec<Value> =
                    raw.hits.hits.iter().map(|h| h.source.clone()).collect();
                let docs = response::apply_mutators(sources, &self.mutators);
                let rows: Vec<csv::CsvRow> = docs.iter().map(works::csv::row).collect();
                Ok(SearchOutcome::Csv(csv::write_rows(&rows)?))
            }
            _ => Ok(SearchOutcome::Json(
                media,
                response::format(&self.profile, &query, &raw, &self.mutators),
            )),
        }
    }

    pub(crate) async fn execute(&self, body: &SearchRequestBody) -> Result<RawSearchResponse> {
        match self.backend.execute(body).await {
            Ok(raw) => Ok(raw),
            Err(err) => {
                metrics::counter!("folio_backend_failures_total").increment(1);
                tracing::warn!(error = %err, "search backend call failed");
                Err(err)
            }
        }
    }
}
