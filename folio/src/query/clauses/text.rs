//! Analyzed text matching.
//!
//! Each value matches either as a phrase the document starts to complete
//! (phrase prefix, slightly boosted so exact openings rank first) or by
//! containing every term. AcrossFields kinds instead match terms spread
//! over several fields as if they were one.

use crate::query::dsl::{BoolNode, MultiMatchParams, QueryNode};
use crate::schema::{ParamKind, ParameterDefinition};

const PHRASE_PREFIX_BOOST_BUMP: f32 = 0.1;

fn base_boost(boost: f32) -> Option<f32> {
    if (boost - 1.0).abs() < f32::EPSILON {
        None
    } else {
        Some(boost)
    }
}

/// One fragment per value.
pub fn fragments<P: Copy>(def: &ParameterDefinition<P>, values: &[String]) -> Vec<QueryNode> {
    let fields = def.search_fields(true);
    values
        .iter()
        .map(|value| {
            if def.kind == ParamKind::AcrossFields {
                across_fields(def, &fields, value)
            } else {
                per_field_union(def, &fields, value)
            }
        })
        .collect()
}

fn across_fields<P: Copy>(
    def: &ParameterDefinition<P>,
    fields: &[String],
    value: &str,
) -> QueryNode {
    QueryNode::MultiMatch(MultiMatchParams {
        query: value.to_string(),
        fields: fields.to_vec(),
        match_type: Some("cross_fields".to_string()),
        operator: Some("and".to_string()),
        boost: base_boost(def.boost),
        name: None,
    })
}

fn per_field_union<P: Copy>(
    def: &ParameterDefinition<P>,
    fields: &[String],
    value: &str,
) -> QueryNode {
    let mut should = Vec::with_capacity(fields.len() * 2);
    for field in fields {
        should.push(QueryNode::phrase_prefix(
            field,
            value,
            Some(def.boost + PHRASE_PREFIX_BOOST_BUMP),
        ));
    }
    for field in fields {
        should.push(QueryNode::match_all_terms(
            field,
            value,
            base_boost(def.boost),
        ));
    }
    if should.len() == 1 {
        should.remove(0)
    } else {
        QueryNode::Bool(BoolNode::any_of(should))
    }
}
