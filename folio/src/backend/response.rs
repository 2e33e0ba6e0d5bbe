//! Deserialize side of the engine protocol: the slice of a search
//! response the formatter consumes. Unknown fields are ignored.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct RawSearchResponse {
    #[serde(default)]
    pub took: u64,
    pub hits: RawHits,
    #[serde(default)]
    pub aggregations: BTreeMap<String, RawAggregation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHits {
    pub total: TotalHits,
    #[serde(default)]
    pub hits: Vec<RawHit>,
}

/// `{"value": 123, "relation": "eq"}`
#[derive(Debug, Clone, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    #[serde(default = "default_relation")]
    pub relation: String,
}

fn default_relation() -> String {
    "eq".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
    /// Sort values the engine echoed back; these feed the cursor
    #[serde(default)]
    pub sort: Vec<Value>,
}

/// A terms aggregation result. Everything beyond the bucket list, and
/// everything inside a bucket beyond key and count, stays raw JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAggregation {
    #[serde(default)]
    pub buckets: Vec<RawBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBucket {
    pub key: Value,
    #[serde(default)]
    pub doc_count: u64,
    /// Sub-aggregations and engine extras like `key_as_string`
    #[serde(flatten)]
    pub sub: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn a_full_engine_response_parses() {
        let raw: RawSearchResponse = serde_json::from_value(json!({
            "took": 7,
            "timed_out": false,
            "_shards": {"total": 1, "successful": 1},
            "hits": {
                "total": {"value": 42, "relation": "eq"},
                "max_score": null,
                "hits": [{
                    "_index": "works",
                    "_id": "0123",
                    "_score": null,
                    "_source": {"identifier": "0123"},
                    "sort": [20210315, "0123"]
                }]
            },
            "aggregations": {
                "topLevelOrganisation": {
                    "doc_count_error_upper_bound": 0,
                    "buckets": [{
                        "key": "https://api.foliosearch.org/organisation/185",
                        "doc_count": 12,
                        "label_en": {"buckets": [{"key": "The Library", "doc_count": 12}]}
                    }]
                }
            }
        }))
        .unwrap();

        assert_eq!(raw.took, 7);
        assert_eq!(raw.hits.total.value, 42);
        assert_eq!(raw.hits.hits.len(), 1);
        assert_eq!(raw.hits.hits[0].sort, vec![json!(20210315), json!("0123")]);

        let agg = &raw.aggregations["topLevelOrganisation"];
        assert_eq!(agg.buckets[0].doc_count, 12);
        assert_eq!(
            agg.buckets[0].sub["label_en"]["buckets"][0]["key"],
            json!("The Library")
        );
    }

    #[test]
    fn numeric_bucket_keys_parse() {
        let agg: RawAggregation = serde_json::from_value(json!({
            "buckets": [{"key": 2021, "doc_count": 3, "key_as_string": "2021"}]
        }))
        .unwrap();
        assert_eq!(agg.buckets[0].key, json!(2021));
        assert_eq!(agg.buckets[0].sub["key_as_string"], json!("2021"));
    }

    #[test]
    fn missing_total_relation_defaults_to_eq() {
        let total: TotalHits = serde_json::from_value(json!({"value": 5})).unwrap();
        assert_eq!(total.relation, "eq");
    }
}
