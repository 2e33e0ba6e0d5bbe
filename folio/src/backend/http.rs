//! reqwest-backed transport to the search engine.

use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{RawSearchResponse, SearchBackend, TokenProvider};
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::query::dsl::SearchRequestBody;

pub struct HttpBackend {
    client: reqwest::Client,
    search_url: String,
    tokens: TokenProvider,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, tokens: TokenProvider) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            search_url: format!("{}/{}/_search", base, config.works_index),
            tokens,
        })
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn execute(&self, body: &SearchRequestBody) -> Result<RawSearchResponse> {
        let mut request = self.client.post(&self.search_url).json(body);
        if let Some(token) = self.tokens.bearer().await? {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Backend { status, message });
        }
        Ok(response.json().await?)
    }
}
