//! Query pipeline: validate raw parameters, compile to the backend DSL.

pub mod clauses;
pub mod compiler;
pub mod dsl;
pub mod validator;

use std::collections::BTreeMap;

use url::Url;

use crate::error::Result;
use crate::media::MediaType;
use crate::query::dsl::{AggNode, QueryNode};
use crate::schema::{ParameterDefinition, ParameterSchema, SortKeySchema};

/// Clause builder injected by an endpoint for `ParamKind::Custom`
/// parameters. Gets the definition and the split values, returns the
/// fragments to combine.
pub type CustomClauseFn<P> =
    Box<dyn Fn(&ParameterDefinition<P>, &[String]) -> Result<Vec<QueryNode>> + Send + Sync>;

/// Control-parameter roles and endpoint defaults the validator applies.
pub struct RequestPolicy<P> {
    pub from: P,
    pub size: P,
    pub page: P,
    pub sort: P,
    pub aggregation: P,
    pub search_after: P,
    /// Applied when the key is absent
    pub defaults: Vec<(P, String)>,
    /// Required keys without a default; absence is a finding
    pub required: Vec<P>,
    pub max_size: u64,
}

impl<P: Copy + Eq> RequestPolicy<P> {
    pub fn default_of(&self, param: P) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(p, _)| *p == param)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_control(&self, param: P) -> bool {
        param == self.from
            || param == self.size
            || param == self.page
            || param == self.sort
            || param == self.aggregation
            || param == self.search_after
    }
}

/// Everything one endpoint family knows about querying its index:
/// the parameter catalog, sort keys, policy, base filters, static
/// aggregations and any custom clause builders.
pub struct SearchProfile<P> {
    pub schema: ParameterSchema<P>,
    pub sort_schema: SortKeySchema,
    pub policy: RequestPolicy<P>,
    /// ANDed into every query; callers never control these
    pub base_filters: Vec<QueryNode>,
    pub aggregations: BTreeMap<String, AggNode>,
    /// Aggregation name to the parameter a facet drills down into
    pub facet_params: BTreeMap<String, P>,
    /// Appended to every sort for a stable tie-break
    pub tie_break_field: String,
    pub custom_builders: BTreeMap<P, CustomClauseFn<P>>,
}

impl<P: Copy + Ord> SearchProfile<P> {
    pub fn definition(&self, param: P) -> Option<&ParameterDefinition<P>> {
        self.schema.get(param)
    }

    /// Canonical spelling for links and error messages.
    pub fn name_of(&self, param: P) -> &'static str {
        self.schema.get(param).map(|d| d.name).unwrap_or("unknown")
    }
}

/// The immutable outcome of one successful validation pass.
///
/// Keys are canonical parameter identities, values are the merged value
/// strings. Iteration order is the parameter enum's order, so everything
/// derived from one of these (query bodies, links) is deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery<P> {
    params: BTreeMap<P, String>,
    pub media: MediaType,
    /// Endpoint URL without a query string
    pub base_url: Url,
}

impl<P: Copy + Ord> ValidatedQuery<P> {
    pub fn new(params: BTreeMap<P, String>, media: MediaType, base_url: Url) -> Self {
        Self {
            params,
            media,
            base_url,
        }
    }

    pub fn get(&self, param: P) -> Option<&str> {
        self.params.get(&param).map(|s| s.as_str())
    }

    pub fn contains(&self, param: P) -> bool {
        self.params.contains_key(&param)
    }

    /// Merged value split into individual values. Empty segments are
    /// dropped, surrounding whitespace trimmed.
    pub fn values(&self, param: P) -> Vec<String> {
        self.get(param)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn number(&self, param: P) -> Option<i64> {
        self.get(param).and_then(|v| v.parse().ok())
    }

    pub fn iter(&self) -> impl Iterator<Item = (P, &str)> {
        self.params.iter().map(|(p, v)| (*p, v.as_str()))
    }

    pub fn with_param(&self, param: P, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.params.insert(param, value.into());
        next
    }

    pub fn without(&self, param: P) -> Self {
        let mut next = self.clone();
        next.params.remove(&param);
        next
    }
}
