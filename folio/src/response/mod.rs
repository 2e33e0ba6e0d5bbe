//! Response shaping: the paginated JSON envelope with facets and links.
//!
//! Everything here is a pure function of the validated query and the raw
//! engine response, so a request always renders the same envelope.

pub mod csv;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::backend::{RawBucket, RawSearchResponse};
use crate::query::{compiler, validator, SearchProfile, ValidatedQuery};

/// JSON-LD context of the result envelope.
pub const PAGED_CONTEXT: &str =
    "https://api.foliosearch.org/contexts/paginated-search-result.json";

/// Rewrites one hit into zero or more outgoing documents.
pub trait DocumentMutator: Send + Sync {
    fn apply(&self, hit: Value) -> Vec<Value>;
}

/// One aggregation bucket, reshaped for callers: a drill-down URI, the
/// bucket key, its count and any display labels by locale.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Facet {
    pub id: Url,
    pub key: String,
    pub count: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// The search response envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedSearchResult {
    #[serde(rename = "@context")]
    pub context: &'static str,
    /// Canonical URI of this request
    pub id: Url,
    pub total_hits: u64,
    pub hits: Vec<Value>,
    pub next_results: Option<Url>,
    pub next_search_after_results: Option<Url>,
    pub previous_results: Option<Url>,
    pub aggregations: BTreeMap<String, Vec<Facet>>,
}

/// Assemble the envelope for one JSON response.
pub fn format<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
    raw: &RawSearchResponse,
    mutators: &[Box<dyn DocumentMutator>],
) -> PagedSearchResult {
    let policy = &profile.policy;
    let (from, size) = compiler::pagination(profile, query);
    let total = raw.hits.total.value;

    let sources: Vec<Value> = raw.hits.hits.iter().map(|h| h.source.clone()).collect();
    let hits = apply_mutators(sources, mutators);

    let next_results = if from + size < total {
        let next_from = (from + size).to_string();
        Some(page_link(
            profile,
            query,
            &[(policy.from, Some(next_from.as_str()))],
        ))
    } else {
        None
    };

    let previous_results = if from >= size {
        let prev_from = (from - size).to_string();
        Some(page_link(
            profile,
            query,
            &[(policy.from, Some(prev_from.as_str()))],
        ))
    } else {
        None
    };

    // A cursor link only makes sense under a stable order; relevance
    // re-scores every page and would be rejected on follow anyway.
    let relevance = query
        .get(policy.sort)
        .map(|sort| validator::resolves_to_relevance(profile, sort))
        .unwrap_or(false);
    let next_search_after_results = if relevance {
        None
    } else {
        raw.hits
            .hits
            .last()
            .map(|hit| cursor_of(&hit.sort))
            .filter(|cursor| !cursor.is_empty())
            .map(|cursor| {
                page_link(
                    profile,
                    query,
                    &[
                        (policy.from, None),
                        (policy.search_after, Some(cursor.as_str())),
                    ],
                )
            })
    };

    PagedSearchResult {
        context: PAGED_CONTEXT,
        id: page_link(profile, query, &[]),
        total_hits: total,
        hits,
        next_results,
        next_search_after_results,
        previous_results,
        aggregations: facets(profile, query, raw),
    }
}

/// Run the mutator chain over every hit, in order.
pub fn apply_mutators(hits: Vec<Value>, mutators: &[Box<dyn DocumentMutator>]) -> Vec<Value> {
    let mut docs = hits;
    for mutator in mutators {
        docs = docs.into_iter().flat_map(|doc| mutator.apply(doc)).collect();
    }
    docs
}

/// Join the engine's echoed sort values into the cursor's wire form.
pub fn cursor_of(sort: &[Value]) -> String {
    sort.iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Rebuild the request URI with canonical parameter spellings, applying
/// the given replacements. `Some` replaces (or appends) the parameter's
/// value, `None` drops it.
fn page_link<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
    overrides: &[(P, Option<&str>)],
) -> Url {
    let mut pairs = url::form_urlencoded::Serializer::new(String::new());
    for (param, value) in query.iter() {
        match overrides.iter().find(|(p, _)| *p == param) {
            Some((_, Some(replacement))) => {
                pairs.append_pair(profile.name_of(param), replacement);
            }
            Some((_, None)) => {}
            None => {
                pairs.append_pair(profile.name_of(param), value);
            }
        }
    }
    for (param, value) in overrides {
        if let Some(v) = value {
            if !query.contains(*param) {
                pairs.append_pair(profile.name_of(*param), v);
            }
        }
    }
    finish_link(query, pairs.finish())
}

/// The request URI plus one extra filter pair.
fn drill_down_link<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
    param: P,
    key: &str,
) -> Url {
    let mut pairs = url::form_urlencoded::Serializer::new(String::new());
    for (p, value) in query.iter() {
        pairs.append_pair(profile.name_of(p), value);
    }
    pairs.append_pair(profile.name_of(param), key);
    finish_link(query, pairs.finish())
}

fn finish_link<P: Copy + Ord>(query: &ValidatedQuery<P>, encoded: String) -> Url {
    let mut url = query.base_url.clone();
    url.set_query(if encoded.is_empty() {
        None
    } else {
        Some(&encoded)
    });
    url
}

fn facets<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
    raw: &RawSearchResponse,
) -> BTreeMap<String, Vec<Facet>> {
    let mut out = BTreeMap::new();
    for (name, agg) in &raw.aggregations {
        let Some(param) = profile.facet_params.get(name) else {
            tracing::debug!(aggregation = %name, "no drill-down parameter, skipping");
            continue;
        };
        let list = agg
            .buckets
            .iter()
            .map(|bucket| {
                let key = bucket_key(&bucket.key);
                Facet {
                    id: drill_down_link(profile, query, *param, &key),
                    key,
                    count: bucket.doc_count,
                    labels: bucket_labels(bucket),
                }
            })
            .collect();
        out.insert(name.clone(), list);
    }
    out
}

fn bucket_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `label_*` single-bucket sub-aggregations carry display names.
fn bucket_labels(bucket: &RawBucket) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    for (name, value) in &bucket.sub {
        let Some(locale) = name.strip_prefix("label_") else {
            continue;
        };
        if let Some(label) = value["buckets"][0]["key"].as_str() {
            labels.insert(locale.to_string(), label.to_string());
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::media::MediaType;
    use crate::works::{self, WorkParam};
    use serde_json::json;

    fn setup(list: &[(&str, &str)]) -> (SearchProfile<WorkParam>, ValidatedQuery<WorkParam>) {
        let profile = works::profile(&SearchConfig::default()).unwrap();
        let pairs: Vec<(String, String)> = list
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let query = validator::validate(
            &profile,
            &pairs,
            MediaType::Json,
            Url::parse("https://api.example.org/search/works").unwrap(),
        )
        .unwrap();
        (profile, query)
    }

    fn raw(total: u64, hits: Vec<Value>) -> RawSearchResponse {
        serde_json::from_value(json!({
            "took": 3,
            "hits": {"total": {"value": total, "relation": "eq"}, "hits": hits}
        }))
        .unwrap()
    }

    fn hit(id: &str, sort: Value) -> Value {
        json!({"_id": id, "_source": {"identifier": id}, "sort": sort})
    }

    fn param_of(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn window_links_follow_the_offset_math() {
        let (profile, query) = setup(&[("from", "990"), ("size", "20"), ("sort", "createdDate")]);
        let result = format(&profile, &query, &raw(1000, vec![]), &[]);
        // 990 + 20 >= 1000: no next page
        assert!(result.next_results.is_none());
        let prev = result.previous_results.unwrap();
        assert_eq!(param_of(&prev, "from").as_deref(), Some("970"));
        assert_eq!(param_of(&prev, "size").as_deref(), Some("20"));
    }

    #[test]
    fn the_first_page_has_no_previous_link() {
        let (profile, query) = setup(&[]);
        let result = format(&profile, &query, &raw(25, vec![]), &[]);
        assert!(result.previous_results.is_none());
        let next = result.next_results.unwrap();
        assert_eq!(param_of(&next, "from").as_deref(), Some("10"));
    }

    #[test]
    fn the_id_link_is_the_canonical_request() {
        let (profile, query) = setup(&[("CATEGORY", "AcademicArticle"), ("page", "2")]);
        let result = format(&profile, &query, &raw(100, vec![]), &[]);
        // canonical spelling and page already folded into from
        assert_eq!(
            param_of(&result.id, "category").as_deref(),
            Some("AcademicArticle")
        );
        assert_eq!(param_of(&result.id, "from").as_deref(), Some("20"));
        assert!(param_of(&result.id, "page").is_none());
    }

    #[test]
    fn the_cursor_link_swaps_offset_for_search_after() {
        let (profile, query) = setup(&[("sort", "modifiedDate"), ("from", "10")]);
        let hits = vec![hit("a", json!([111, "a"])), hit("b", json!([222, "b"]))];
        let result = format(&profile, &query, &raw(50, hits), &[]);
        let link = result.next_search_after_results.unwrap();
        assert_eq!(param_of(&link, "searchAfter").as_deref(), Some("222,b"));
        assert!(param_of(&link, "from").is_none());
    }

    #[test]
    fn relevance_sorted_responses_carry_no_cursor_link() {
        // sort defaults to relevance
        let (profile, query) = setup(&[("query", "x")]);
        let hits = vec![hit("a", json!([1.5, "a"]))];
        let result = format(&profile, &query, &raw(50, hits), &[]);
        assert!(result.next_search_after_results.is_none());
    }

    #[test]
    fn no_hits_means_no_cursor_link() {
        let (profile, query) = setup(&[("sort", "modifiedDate")]);
        let result = format(&profile, &query, &raw(0, vec![]), &[]);
        assert!(result.next_search_after_results.is_none());
        assert!(result.next_results.is_none());
    }

    #[test]
    fn facets_get_drill_down_uris_and_labels() {
        let (profile, query) = setup(&[("query", "glacier")]);
        let mut raw = raw(10, vec![]);
        raw.aggregations = serde_json::from_value(json!({
            "type": {
                "buckets": [{"key": "AcademicArticle", "doc_count": 7}]
            },
            "topLevelOrganisation": {
                "buckets": [{
                    "key": "https://api.foliosearch.org/organisation/185",
                    "doc_count": 3,
                    "label_en": {"buckets": [{"key": "The Library", "doc_count": 3}]},
                    "label_nb": {"buckets": [{"key": "Biblioteket", "doc_count": 3}]}
                }]
            }
        }))
        .unwrap();
        let result = format(&profile, &query, &raw, &[]);

        let types = &result.aggregations["type"];
        assert_eq!(types[0].key, "AcademicArticle");
        assert_eq!(types[0].count, 7);
        assert_eq!(
            param_of(&types[0].id, "category").as_deref(),
            Some("AcademicArticle")
        );
        // the original query survives in the drill-down
        assert_eq!(param_of(&types[0].id, "query").as_deref(), Some("glacier"));

        let orgs = &result.aggregations["topLevelOrganisation"];
        assert_eq!(orgs[0].labels["en"], "The Library");
        assert_eq!(orgs[0].labels["nb"], "Biblioteket");
        assert_eq!(
            param_of(&orgs[0].id, "unit").as_deref(),
            Some("https://api.foliosearch.org/organisation/185")
        );
    }

    #[test]
    fn mutators_can_expand_and_drop_hits() {
        struct Split;
        impl DocumentMutator for Split {
            fn apply(&self, hit: Value) -> Vec<Value> {
                if hit["identifier"] == json!("drop") {
                    vec![]
                } else {
                    vec![hit.clone(), hit]
                }
            }
        }
        let (profile, query) = setup(&[("sort", "modifiedDate")]);
        let hits = vec![hit("keep", json!([1])), hit("drop", json!([2]))];
        let mutators: Vec<Box<dyn DocumentMutator>> = vec![Box::new(Split)];
        let result = format(&profile, &query, &raw(2, hits), &mutators);
        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.hits[0]["identifier"], json!("keep"));
    }

    #[test]
    fn the_envelope_serializes_with_wire_names() {
        let (profile, query) = setup(&[]);
        let result = format(&profile, &query, &raw(0, vec![]), &[]);
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["@context"], json!(PAGED_CONTEXT));
        assert_eq!(v["totalHits"], json!(0));
        assert!(v["nextResults"].is_null());
        assert!(v["nextSearchAfterResults"].is_null());
        assert!(v["previousResults"].is_null());
        assert!(v["aggregations"].is_object());
        assert!(v["hits"].is_array());
        assert!(v["id"].is_string());
    }
}
