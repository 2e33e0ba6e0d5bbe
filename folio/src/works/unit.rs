//! Clause builder for the `unit` parameter.
//!
//! Accepts either a full organisation URI or a bare unit code; codes are
//! rewritten to the canonical URI form. The clause requires the work's
//! top-level organisation and boosts hits where a contributor is
//! affiliated with the unit directly.

use crate::error::{Error, Result};
use crate::query::dsl::{BoolNode, QueryNode};
use crate::query::CustomClauseFn;
use crate::schema::ParameterDefinition;
use crate::works::WorkParam;

const ORGANISATION_URI_BASE: &str = "https://api.foliosearch.org/organisation";
const DIRECT_AFFILIATION_FIELD: &str = "entityDescription.contributors.affiliations.id.keyword";
const DIRECT_AFFILIATION_BOOST: f32 = 10.0;

pub(super) fn builder() -> CustomClauseFn<WorkParam> {
    Box::new(|def, values| fragments(def, values))
}

fn fragments(
    def: &ParameterDefinition<WorkParam>,
    values: &[String],
) -> Result<Vec<QueryNode>> {
    let fields = def.search_fields(false);
    let field = fields
        .first()
        .ok_or_else(|| Error::Schema(format!("parameter '{}' has no search fields", def.name)))?;
    Ok(values
        .iter()
        .map(|value| {
            let uri = canonical_uri(value);
            QueryNode::Bool(BoolNode {
                must: vec![QueryNode::term(field, &uri)],
                should: vec![QueryNode::term_boosted(
                    DIRECT_AFFILIATION_FIELD,
                    &uri,
                    DIRECT_AFFILIATION_BOOST,
                )],
                ..BoolNode::default()
            })
        })
        .collect())
}

/// Bare unit codes become canonical organisation URIs; URIs pass through.
fn canonical_uri(value: &str) -> String {
    if value.starts_with("https://") || value.starts_with("http://") {
        value.to_string()
    } else {
        format!("{ORGANISATION_URI_BASE}/{value}")
    }
}
