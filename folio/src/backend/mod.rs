//! Search engine transport: the backend trait, its HTTP implementation
//! and bearer-token handling.

mod http;
mod response;
mod token;

pub use http::HttpBackend;
pub use response::{RawAggregation, RawBucket, RawHit, RawHits, RawSearchResponse, TotalHits};
pub use token::TokenProvider;

use async_trait::async_trait;

use crate::error::Result;
use crate::query::dsl::SearchRequestBody;

/// One search round trip. Implementations own connection details; the
/// service layer only sees the typed request and response.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn execute(&self, body: &SearchRequestBody) -> Result<RawSearchResponse>;
}
