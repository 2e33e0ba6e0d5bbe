//! Exact and approximate keyword matching.

use crate::query::dsl::{BoolNode, QueryNode};
use crate::schema::ParameterDefinition;

/// One exact-match fragment per value; a value present in any of the
/// definition's fields counts as a match.
pub fn term_fragments<P: Copy>(def: &ParameterDefinition<P>, values: &[String]) -> Vec<QueryNode> {
    let fields = def.search_fields(false);
    values
        .iter()
        .map(|value| per_field(&fields, |f| QueryNode::term(f, value)))
        .collect()
}

/// Like [`term_fragments`] but tolerant of typos: fuzzy matching against
/// the analyzed field variant.
pub fn fuzzy_fragments<P: Copy>(def: &ParameterDefinition<P>, values: &[String]) -> Vec<QueryNode> {
    let fields = def.search_fields(true);
    values
        .iter()
        .map(|value| per_field(&fields, |f| QueryNode::fuzzy(f, value)))
        .collect()
}

fn per_field(fields: &[String], make: impl Fn(&str) -> QueryNode) -> QueryNode {
    let mut nodes: Vec<QueryNode> = fields.iter().map(|f| make(f)).collect();
    if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        QueryNode::Bool(BoolNode::any_of(nodes))
    }
}
