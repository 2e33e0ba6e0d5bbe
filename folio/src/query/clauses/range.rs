//! Range clauses: bounded intervals and single-ended comparisons.
//!
//! Value arity is part of the schema contract here. A Between parameter
//! whose value pattern lets anything other than exactly two values
//! through is misconfigured, and that surfaces as a schema error rather
//! than an empty or half-open query.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::query::dsl::{BoolNode, QueryNode, RangeParams};
use crate::schema::{ParamOperator, ParameterDefinition};

pub fn fragment<P: Copy>(def: &ParameterDefinition<P>, values: &[String]) -> Result<QueryNode> {
    let params = match def.operator {
        ParamOperator::Between => {
            if values.len() != 2 {
                return Err(Error::Schema(format!(
                    "parameter '{}' requires exactly two values, got {}",
                    def.name,
                    values.len()
                )));
            }
            RangeParams {
                gte: Some(scalar(&values[0])),
                lte: Some(scalar(&values[1])),
                ..RangeParams::default()
            }
        }
        ParamOperator::GreaterThanOrEqual => RangeParams {
            gte: Some(scalar(single(def, values)?)),
            ..RangeParams::default()
        },
        ParamOperator::LessThan => RangeParams {
            lt: Some(scalar(single(def, values)?)),
            ..RangeParams::default()
        },
        other => {
            return Err(Error::Schema(format!(
                "range builder called with operator {other:?} for '{}'",
                def.name
            )))
        }
    };

    let fields = def.search_fields(false);
    if fields.is_empty() {
        return Err(Error::Schema(format!(
            "parameter '{}' has no search fields",
            def.name
        )));
    }
    let mut nodes: Vec<QueryNode> = fields
        .iter()
        .map(|f| {
            let mut m = std::collections::BTreeMap::new();
            m.insert(f.clone(), params.clone());
            QueryNode::Range(m)
        })
        .collect();
    if nodes.len() == 1 {
        Ok(nodes.remove(0))
    } else {
        Ok(QueryNode::Bool(BoolNode::any_of(nodes)))
    }
}

fn single<'a, P: Copy>(def: &ParameterDefinition<P>, values: &'a [String]) -> Result<&'a str> {
    match values {
        [one] => Ok(one),
        _ => Err(Error::Schema(format!(
            "parameter '{}' requires exactly one value, got {}",
            def.name,
            values.len()
        ))),
    }
}

/// Numeric bounds go out as numbers, dates as strings.
fn scalar(value: &str) -> Value {
    value
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamKind;
    use serde_json::json;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct P;

    fn def(op: ParamOperator, fields: &[&str]) -> ParameterDefinition<P> {
        ParameterDefinition::builder(P, "window", ParamKind::Number, op)
            .fields(fields)
            .build()
            .unwrap()
    }

    #[test]
    fn between_spans_both_bounds() {
        let d = def(ParamOperator::Between, &["year"]);
        let node = fragment(&d, &["2019".to_string(), "2022".to_string()]).unwrap();
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"range": {"year": {"gte": 2019, "lte": 2022}}})
        );
    }

    #[test]
    fn between_with_wrong_arity_is_a_schema_error() {
        let d = def(ParamOperator::Between, &["year"]);
        let err = fragment(&d, &["2019".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        let err = fragment(
            &d,
            &["1".to_string(), "2".to_string(), "3".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn less_than_is_exclusive() {
        let d = def(ParamOperator::LessThan, &["createdDate"]);
        let node = fragment(&d, &["2024-01-01".to_string()]).unwrap();
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"range": {"createdDate": {"lt": "2024-01-01"}}})
        );
    }

    #[test]
    fn greater_than_or_equal_is_inclusive() {
        let d = def(ParamOperator::GreaterThanOrEqual, &["modifiedDate"]);
        let node = fragment(&d, &["2023".to_string()]).unwrap();
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"range": {"modifiedDate": {"gte": 2023}}})
        );
    }
}
