//! Presence checks over one or more fields.
//!
//! A truthy value asks for documents where any of the fields is set; a
//! falsy value for documents where none of them are.

use crate::error::{Error, Result};
use crate::query::dsl::{BoolNode, QueryNode};
use crate::schema::ParameterDefinition;

pub fn fragment<P: Copy>(def: &ParameterDefinition<P>, values: &[String]) -> Result<QueryNode> {
    let fields = def.search_fields(false);
    if fields.is_empty() {
        return Err(Error::Schema(format!(
            "parameter '{}' has no search fields",
            def.name
        )));
    }
    let truthy = values
        .first()
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let mut nodes: Vec<QueryNode> = fields.iter().map(|f| QueryNode::exists(f)).collect();
    if truthy {
        if nodes.len() == 1 {
            Ok(nodes.remove(0))
        } else {
            Ok(QueryNode::Bool(BoolNode::any_of(nodes)))
        }
    } else {
        Ok(QueryNode::Bool(BoolNode::none_of(nodes)))
    }
}
