//! Export walks: page caps, cursor exhaustion, sort guards.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use folio::backend::{RawSearchResponse, SearchBackend};
use folio::error::{Error, Result};
use folio::query::dsl::SearchRequestBody;
use folio::service::SearchService;
use folio::Config;
use serde_json::json;

/// Replays a fixed sequence of engine responses and counts the calls.
struct ScriptedBackend {
    pages: Mutex<VecDeque<RawSearchResponse>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(pages: Vec<RawSearchResponse>) -> Arc<Self> {
        Arc::new(Self {
            pages: Mutex::new(pages.into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn execute(&self, _body: &SearchRequestBody) -> Result<RawSearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Backend {
                status: 500,
                message: "script ran dry".to_string(),
            })
    }
}

fn page(ids: &[&str], with_cursor: bool) -> RawSearchResponse {
    let hits: Vec<serde_json::Value> = ids
        .iter()
        .map(|id| {
            let mut hit = json!({
                "_id": id,
                "_source": {
                    "identifier": id,
                    "entityDescription": {"mainTitle": format!("Work {id}")}
                },
            });
            if with_cursor {
                hit["sort"] = json!(["2024-01-01T00:00:00Z", id]);
            }
            hit
        })
        .collect();
    serde_json::from_value(json!({
        "took": 1,
        "hits": {"total": {"value": 1000, "relation": "eq"}, "hits": hits}
    }))
    .unwrap()
}

fn service(backend: Arc<ScriptedBackend>, max_pages: u32) -> SearchService {
    let mut config = Config::default();
    config.search.export_max_pages = max_pages;
    let backend: Arc<dyn SearchBackend> = backend;
    SearchService::new(&config, backend).unwrap()
}

fn csv_lines(bytes: &[u8]) -> usize {
    String::from_utf8(bytes.to_vec()).unwrap().matches("\r\n").count()
}

#[tokio::test]
async fn the_walk_stops_at_the_page_cap() {
    let backend = ScriptedBackend::new(vec![
        page(&["a", "b"], true),
        page(&["c", "d"], true),
        page(&["e", "f"], true),
        page(&["g", "h"], true),
        page(&["i", "j"], true),
    ]);
    let service = service(backend.clone(), 3);
    let bytes = service.export(&[]).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    assert_eq!(csv_lines(&bytes), 6);
}

#[tokio::test]
async fn an_empty_page_ends_the_walk_early() {
    let backend = ScriptedBackend::new(vec![page(&["a"], true), page(&[], true)]);
    let service = service(backend.clone(), 4);
    let bytes = service.export(&[]).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    assert_eq!(csv_lines(&bytes), 1);
}

#[tokio::test]
async fn a_page_without_cursors_ends_the_walk() {
    let backend = ScriptedBackend::new(vec![page(&["a", "b"], false)]);
    let service = service(backend.clone(), 4);
    let bytes = service.export(&[]).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(csv_lines(&bytes), 2);
}

#[tokio::test]
async fn relevance_sorted_exports_are_rejected_before_any_call() {
    let backend = ScriptedBackend::new(vec![page(&["a"], true)]);
    let service = service(backend.clone(), 4);
    let err = service
        .export(&[("sort".to_string(), "relevance".to_string())])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exported_rows_flatten_the_documents() {
    let backend = ScriptedBackend::new(vec![page(&["a"], false)]);
    let service = service(backend.clone(), 4);
    let bytes = service.export(&[]).await.unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.starts_with('\u{feff}'));
    assert!(text.contains("\"Work a\""));
}
