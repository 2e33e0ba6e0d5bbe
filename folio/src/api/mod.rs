//! HTTP surface: axum routes over the search service.

pub mod error;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::error::{Error, Result};
use crate::media::MediaType;
use crate::service::{SearchOutcome, SearchService};

use self::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
}

pub struct ApiServer {
    service: Arc<SearchService>,
    cors_config: CorsConfig,
}

impl ApiServer {
    pub fn new(service: Arc<SearchService>) -> Self {
        Self::with_cors(service, CorsConfig::default())
    }

    pub fn with_cors(service: Arc<SearchService>, cors_config: CorsConfig) -> Self {
        Self {
            service,
            cors_config,
        }
    }

    /// GET /search/works - parameters in the query string
    async fn search_works(
        State(state): State<AppState>,
        headers: HeaderMap,
        RawQuery(query): RawQuery,
    ) -> std::result::Result<Response, ApiError> {
        let media = MediaType::negotiate(accept_header(&headers))?;
        let pairs = parse_pairs(query.as_deref().unwrap_or(""));
        let outcome = state.service.search(&pairs, media).await?;
        respond(outcome)
    }

    /// POST /search/works - form-encoded parameters in the body
    async fn search_works_form(
        State(state): State<AppState>,
        headers: HeaderMap,
        RawQuery(query): RawQuery,
        body: Bytes,
    ) -> std::result::Result<Response, ApiError> {
        let media = MediaType::negotiate(accept_header(&headers))?;
        let pairs = if body.is_empty() {
            parse_pairs(query.as_deref().unwrap_or(""))
        } else {
            parse_pairs_from(&body)
        };
        let outcome = state.service.search(&pairs, media).await?;
        respond(outcome)
    }

    /// GET /search/works/export - full result set as CSV
    async fn export_works(
        State(state): State<AppState>,
        RawQuery(query): RawQuery,
    ) -> std::result::Result<Response, ApiError> {
        let pairs = parse_pairs(query.as_deref().unwrap_or(""));
        let bytes = state.service.export(&pairs).await?;
        Ok(csv_response(bytes))
    }

    async fn health() -> StatusCode {
        StatusCode::OK
    }

    fn build_cors_layer(&self) -> CorsLayer {
        if !self.cors_config.enabled {
            return CorsLayer::new();
        }

        let origins: Vec<HeaderValue> = self
            .cors_config
            .origins
            .iter()
            .filter_map(|o| {
                if o == "*" {
                    // Wildcard handled separately
                    None
                } else {
                    o.parse().ok()
                }
            })
            .collect();

        let has_wildcard = self.cors_config.origins.iter().any(|o| o == "*");

        let cors = if has_wildcard {
            CorsLayer::new().allow_origin(tower_http::cors::Any)
        } else if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(origins)
        };

        cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }

    pub fn router(&self) -> Router {
        let app_state = AppState {
            service: self.service.clone(),
        };

        let cors = self.build_cors_layer();

        Router::new()
            .route(
                "/search/works",
                get(Self::search_works).post(Self::search_works_form),
            )
            .route("/search/works/export", get(Self::export_works))
            .route("/health", get(Self::health))
            .with_state(app_state)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

fn accept_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ACCEPT).and_then(|v| v.to_str().ok())
}

/// Decode a query string into raw pairs, percent-decoding once.
fn parse_pairs(query: &str) -> Vec<(String, String)> {
    parse_pairs_from(query.as_bytes())
}

fn parse_pairs_from(input: &[u8]) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn respond(outcome: SearchOutcome) -> std::result::Result<Response, ApiError> {
    match outcome {
        SearchOutcome::Json(media, result) => {
            let bytes = serde_json::to_vec(&result).map_err(Error::from)?;
            Ok(([(header::CONTENT_TYPE, media.mime())], bytes).into_response())
        }
        SearchOutcome::Csv(bytes) => Ok(csv_response(bytes)),
    }
}

fn csv_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, MediaType::Csv.mime())], bytes).into_response()
}
