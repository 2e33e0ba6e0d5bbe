//! Parent/child joins.
//!
//! A join definition names another parameter as its sub query; the inner
//! clause is compiled recursively from that definition with the same
//! values. The relation name is the definition's first field.

use crate::error::{Error, Result};
use crate::query::clauses;
use crate::query::dsl::{HasChildParams, HasParentParams, QueryNode};
use crate::query::SearchProfile;
use crate::schema::{ParamOperator, ParameterDefinition};

pub fn fragment<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    def: &ParameterDefinition<P>,
    values: &[String],
    depth: u32,
) -> Result<QueryNode> {
    let sub_param = def.sub_query.ok_or_else(|| {
        Error::Schema(format!("join parameter '{}' has no sub query", def.name))
    })?;
    let sub_def = profile.definition(sub_param).ok_or_else(|| {
        Error::Schema(format!(
            "join parameter '{}' points at an undefined sub query",
            def.name
        ))
    })?;
    let relation = def
        .search_fields(false)
        .first()
        .cloned()
        .ok_or_else(|| Error::Schema(format!("join parameter '{}' names no relation", def.name)))?;

    let inner = clauses::build(profile, sub_def, values, depth + 1)?;

    match def.operator {
        ParamOperator::PartOf => Ok(QueryNode::HasParent(Box::new(HasParentParams {
            parent_type: relation,
            query: inner,
            score: None,
            name: None,
        }))),
        ParamOperator::HasParts => Ok(QueryNode::HasChild(Box::new(HasChildParams {
            child_type: relation,
            query: inner,
            name: None,
        }))),
        other => Err(Error::Schema(format!(
            "join builder called with operator {other:?} for '{}'",
            def.name
        ))),
    }
}
