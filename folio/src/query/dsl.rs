//! Search-engine query DSL, serialize side.
//!
//! The compiler emits these types; the transport posts them verbatim.
//! Maps are `BTreeMap` on purpose: compiling the same validated query
//! twice must yield byte-identical bodies.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Root search request body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchRequestBody {
    pub query: QueryNode,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aggs: BTreeMap<String, AggNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortEntry>,
    pub from: u64,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,
    pub track_total_hits: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum QueryNode {
    Match(BTreeMap<String, MatchParams>),
    MatchPhrasePrefix(BTreeMap<String, MatchPhrasePrefixParams>),
    MultiMatch(MultiMatchParams),
    Term(BTreeMap<String, TermParams>),
    Terms(BTreeMap<String, Vec<Value>>),
    Fuzzy(BTreeMap<String, FuzzyParams>),
    Range(BTreeMap<String, RangeParams>),
    Exists(ExistsParams),
    Bool(BoolNode),
    HasParent(Box<HasParentParams>),
    HasChild(Box<HasChildParams>),
}

impl QueryNode {
    pub fn term(field: &str, value: &str) -> QueryNode {
        let mut m = BTreeMap::new();
        m.insert(
            field.to_string(),
            TermParams {
                value: Value::String(value.to_string()),
                boost: None,
                name: None,
            },
        );
        QueryNode::Term(m)
    }

    pub fn term_boosted(field: &str, value: &str, boost: f32) -> QueryNode {
        let mut m = BTreeMap::new();
        m.insert(
            field.to_string(),
            TermParams {
                value: Value::String(value.to_string()),
                boost: Some(boost),
                name: None,
            },
        );
        QueryNode::Term(m)
    }

    pub fn terms(field: &str, values: &[String]) -> QueryNode {
        let mut m = BTreeMap::new();
        m.insert(
            field.to_string(),
            values.iter().map(|v| Value::String(v.clone())).collect(),
        );
        QueryNode::Terms(m)
    }

    pub fn fuzzy(field: &str, value: &str) -> QueryNode {
        let mut m = BTreeMap::new();
        m.insert(
            field.to_string(),
            FuzzyParams {
                value: value.to_string(),
                fuzziness: Some("AUTO".to_string()),
                transpositions: None,
                name: None,
            },
        );
        QueryNode::Fuzzy(m)
    }

    pub fn match_all_terms(field: &str, text: &str, boost: Option<f32>) -> QueryNode {
        let mut m = BTreeMap::new();
        m.insert(
            field.to_string(),
            MatchParams {
                query: text.to_string(),
                operator: Some("and".to_string()),
                boost,
                name: None,
            },
        );
        QueryNode::Match(m)
    }

    pub fn phrase_prefix(field: &str, text: &str, boost: Option<f32>) -> QueryNode {
        let mut m = BTreeMap::new();
        m.insert(
            field.to_string(),
            MatchPhrasePrefixParams {
                query: text.to_string(),
                boost,
                name: None,
            },
        );
        QueryNode::MatchPhrasePrefix(m)
    }

    pub fn exists(field: &str) -> QueryNode {
        QueryNode::Exists(ExistsParams {
            field: field.to_string(),
            name: None,
        })
    }

    /// Tag this node so backend responses can attribute matches to the
    /// originating parameter. Nodes without a slot of their own get
    /// wrapped in a bool.
    pub fn named(self, name: &str) -> QueryNode {
        let tag = Some(name.to_string());
        match self {
            QueryNode::Bool(mut b) => {
                b.name = tag;
                QueryNode::Bool(b)
            }
            QueryNode::Exists(mut e) => {
                e.name = tag;
                QueryNode::Exists(e)
            }
            QueryNode::MultiMatch(mut m) => {
                m.name = tag;
                QueryNode::MultiMatch(m)
            }
            QueryNode::HasParent(mut p) => {
                p.name = tag;
                QueryNode::HasParent(p)
            }
            QueryNode::HasChild(mut c) => {
                c.name = tag;
                QueryNode::HasChild(c)
            }
            QueryNode::Term(mut m) if m.len() == 1 => {
                for params in m.values_mut() {
                    params.name = tag.clone();
                }
                QueryNode::Term(m)
            }
            QueryNode::Match(mut m) if m.len() == 1 => {
                for params in m.values_mut() {
                    params.name = tag.clone();
                }
                QueryNode::Match(m)
            }
            QueryNode::MatchPhrasePrefix(mut m) if m.len() == 1 => {
                for params in m.values_mut() {
                    params.name = tag.clone();
                }
                QueryNode::MatchPhrasePrefix(m)
            }
            QueryNode::Fuzzy(mut m) if m.len() == 1 => {
                for params in m.values_mut() {
                    params.name = tag.clone();
                }
                QueryNode::Fuzzy(m)
            }
            QueryNode::Range(mut m) if m.len() == 1 => {
                for params in m.values_mut() {
                    params.name = tag.clone();
                }
                QueryNode::Range(m)
            }
            other => QueryNode::Bool(BoolNode {
                must: vec![other],
                name: tag,
                ..BoolNode::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchParams {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchPhrasePrefixParams {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MultiMatchParams {
    pub query: String,
    pub fields: Vec<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TermParams {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FuzzyParams {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transpositions: Option<bool>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RangeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExistsParams {
    pub field: String,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BoolNode {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<QueryNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f32>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl BoolNode {
    /// OR of the given nodes.
    pub fn any_of(nodes: Vec<QueryNode>) -> BoolNode {
        BoolNode {
            should: nodes,
            minimum_should_match: Some(1),
            ..BoolNode::default()
        }
    }

    /// AND of the given nodes.
    pub fn all_of(nodes: Vec<QueryNode>) -> BoolNode {
        BoolNode {
            must: nodes,
            ..BoolNode::default()
        }
    }

    /// NOT of the given nodes.
    pub fn none_of(nodes: Vec<QueryNode>) -> BoolNode {
        BoolNode {
            must_not: nodes,
            ..BoolNode::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HasParentParams {
    pub parent_type: String,
    pub query: QueryNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<bool>,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HasChildParams {
    #[serde(rename = "type")]
    pub child_type: String,
    pub query: QueryNode,
    #[serde(rename = "_name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One sort entry, `{"field": {"order": "desc"}}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SortEntry(pub BTreeMap<String, SortSpec>);

impl SortEntry {
    pub fn new(field: &str, order: SortOrder) -> SortEntry {
        let mut m = BTreeMap::new();
        m.insert(field.to_string(), SortSpec { order });
        SortEntry(m)
    }

    pub fn field(&self) -> Option<&str> {
        self.0.keys().next().map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SortSpec {
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Terms aggregation with optional sub-aggregations.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AggNode {
    pub terms: TermsAgg,
    #[serde(rename = "aggs", skip_serializing_if = "BTreeMap::is_empty")]
    pub sub: BTreeMap<String, AggNode>,
}

impl AggNode {
    pub fn terms(field: &str, size: u64) -> AggNode {
        AggNode {
            terms: TermsAgg {
                field: field.to_string(),
                size,
            },
            sub: BTreeMap::new(),
        }
    }

    pub fn with_sub(mut self, name: &str, sub: AggNode) -> AggNode {
        self.sub.insert(name.to_string(), sub);
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TermsAgg {
    pub field: String,
    pub size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn term_query_wire_shape() {
        let node = QueryNode::term("identifier.keyword", "abc").named("id");
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"term": {"identifier.keyword": {"value": "abc", "_name": "id"}}})
        );
    }

    #[test]
    fn bool_skips_empty_lists() {
        let node = QueryNode::Bool(BoolNode::any_of(vec![QueryNode::exists("a")]));
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"bool": {"should": [{"exists": {"field": "a"}}], "minimum_should_match": 1}})
        );
    }

    #[test]
    fn naming_wraps_nodes_without_a_slot() {
        let node = QueryNode::terms("f", &["x".to_string()]).named("cat");
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"bool": {"must": [{"terms": {"f": ["x"]}}], "_name": "cat"}})
        );
    }

    #[test]
    fn request_body_field_order_is_stable() {
        let body = SearchRequestBody {
            query: QueryNode::term("a", "b"),
            aggs: BTreeMap::new(),
            sort: vec![SortEntry::new("_score", SortOrder::Desc)],
            from: 0,
            size: 10,
            search_after: None,
            track_total_hits: true,
        };
        let one = serde_json::to_string(&body).unwrap();
        let two = serde_json::to_string(&body.clone()).unwrap();
        assert_eq!(one, two);
        assert!(one.find("\"query\"").unwrap() < one.find("\"sort\"").unwrap());
        assert!(one.find("\"sort\"").unwrap() < one.find("\"from\"").unwrap());
    }

    #[test]
    fn aggregation_tree_shape() {
        let agg = AggNode::terms("org.id.keyword", 20)
            .with_sub("label_en", AggNode::terms("org.labels.en.keyword", 1));
        assert_eq!(
            serde_json::to_value(&agg).unwrap(),
            json!({
                "terms": {"field": "org.id.keyword", "size": 20},
                "aggs": {"label_en": {"terms": {"field": "org.labels.en.keyword", "size": 1}}}
            })
        );
    }
}
