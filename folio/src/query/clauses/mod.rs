//! Clause builders, dispatched on the definition's operator.
//!
//! Every builder returns fragments for one parameter; [`build`] combines
//! them according to the operator and the compiler tags the result with
//! the parameter's canonical name.

pub mod exists;
pub mod join;
pub mod keyword;
pub mod range;
pub mod text;

use crate::error::{Error, Result};
use crate::query::dsl::{BoolNode, QueryNode};
use crate::query::SearchProfile;
use crate::schema::{ParamKind, ParamOperator, ParameterDefinition};

/// Joins nest one level: a sub query may not itself be a join.
const MAX_JOIN_DEPTH: u32 = 1;

/// Build the combined clause for one validated parameter.
pub fn build<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    def: &ParameterDefinition<P>,
    values: &[String],
    depth: u32,
) -> Result<QueryNode> {
    if depth > MAX_JOIN_DEPTH {
        return Err(Error::Schema(format!(
            "parameter '{}' nests sub queries deeper than {} level(s)",
            def.name, MAX_JOIN_DEPTH
        )));
    }
    match def.operator {
        ParamOperator::AllOf
        | ParamOperator::NotAllOf
        | ParamOperator::AnyOf
        | ParamOperator::NotAnyOf => {
            let fragments = match def.kind {
                ParamKind::Text | ParamKind::FreeText | ParamKind::AcrossFields => {
                    text::fragments(def, values)
                }
                ParamKind::Keyword | ParamKind::Number | ParamKind::Date => {
                    keyword::term_fragments(def, values)
                }
                ParamKind::FuzzyKeyword => keyword::fuzzy_fragments(def, values),
                kind => {
                    return Err(Error::Schema(format!(
                        "parameter '{}' maps kind {:?} to operator {:?}",
                        def.name, kind, def.operator
                    )))
                }
            };
            combine(def.operator, def.name, fragments)
        }
        ParamOperator::Between | ParamOperator::GreaterThanOrEqual | ParamOperator::LessThan => {
            range::fragment(def, values)
        }
        ParamOperator::Exists => exists::fragment(def, values),
        ParamOperator::HasParts | ParamOperator::PartOf => {
            join::fragment(profile, def, values, depth)
        }
        ParamOperator::NotApplicable => match profile.custom_builders.get(&def.param) {
            Some(builder) => combine(ParamOperator::AnyOf, def.name, builder(def, values)?),
            None => Err(Error::Schema(format!(
                "parameter '{}' has no clause builder",
                def.name
            ))),
        },
    }
}

/// Combine per-value fragments according to the operator.
pub fn combine(
    operator: ParamOperator,
    name: &str,
    mut fragments: Vec<QueryNode>,
) -> Result<QueryNode> {
    if fragments.is_empty() {
        return Err(Error::Schema(format!(
            "parameter '{name}' produced no clause fragments"
        )));
    }
    let positive = if fragments.len() == 1 {
        fragments.remove(0)
    } else if operator.joins_any() {
        QueryNode::Bool(BoolNode::any_of(fragments))
    } else {
        QueryNode::Bool(BoolNode::all_of(fragments))
    };
    if operator.is_negated() {
        Ok(QueryNode::Bool(BoolNode::none_of(vec![positive])))
    } else {
        Ok(positive)
    }
}
