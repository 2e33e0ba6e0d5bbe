//! Compile a validated query into a backend request body.
//!
//! Pure transformation: content parameters dispatch to clause builders
//! and AND together at the top level, base filters ride along in the
//! filter context, sort and pagination come straight from the control
//! parameters. Compiling the same validated query twice yields
//! byte-identical bodies.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::query::clauses;
use crate::query::dsl::{BoolNode, QueryNode, SearchRequestBody, SortEntry, SortOrder};
use crate::query::{SearchProfile, ValidatedQuery};

pub fn compile<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
) -> Result<SearchRequestBody> {
    let policy = &profile.policy;

    let mut must = Vec::new();
    for (param, _) in query.iter() {
        if policy.is_control(param) {
            continue;
        }
        let def = profile.definition(param).ok_or_else(|| {
            Error::Schema("validated parameter is missing from the schema".to_string())
        })?;
        let values = query.values(param);
        if values.is_empty() {
            continue;
        }
        let clause = clauses::build(profile, def, &values, 0)?;
        must.push(clause.named(def.name));
    }

    let query_node = QueryNode::Bool(BoolNode {
        must,
        filter: profile.base_filters.clone(),
        ..BoolNode::default()
    });

    let aggs = if aggregations_enabled(profile, query) {
        profile.aggregations.clone()
    } else {
        BTreeMap::new()
    };

    let sort = resolve_sort(profile, query)?;
    let (from, size) = pagination(profile, query);
    let search_after = query.get(policy.search_after).map(parse_cursor);

    Ok(SearchRequestBody {
        query: query_node,
        aggs,
        sort,
        // the engine rejects a nonzero offset next to a cursor
        from: if search_after.is_some() { 0 } else { from },
        size,
        search_after,
        track_total_hits: true,
    })
}

fn aggregations_enabled<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
) -> bool {
    query
        .get(profile.policy.aggregation)
        .map(|v| !v.eq_ignore_ascii_case("none"))
        .unwrap_or(true)
}

/// Offset and limit, clamped to sane bounds.
pub fn pagination<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
) -> (u64, u64) {
    let policy = &profile.policy;
    let from = query.number(policy.from).unwrap_or(0).max(0) as u64;
    let default_size = policy
        .default_of(policy.size)
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let size = query.number(policy.size).unwrap_or(default_size).max(0) as u64;
    (from, size.min(policy.max_size))
}

fn resolve_sort<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    query: &ValidatedQuery<P>,
) -> Result<Vec<SortEntry>> {
    let mut entries = Vec::new();
    if let Some(sort_value) = query.get(profile.policy.sort) {
        for segment in sort_value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let mut parts = segment.splitn(2, ':');
            let name = parts.next().unwrap_or(segment).trim();
            let order = match parts.next().map(str::trim) {
                None => SortOrder::Desc,
                Some(o) if o.eq_ignore_ascii_case("asc") => SortOrder::Asc,
                Some(o) if o.eq_ignore_ascii_case("desc") => SortOrder::Desc,
                Some(other) => {
                    return Err(Error::Schema(format!(
                        "sort order '{other}' slipped through validation"
                    )))
                }
            };
            let key = profile.sort_schema.lookup(name).ok_or_else(|| {
                Error::Schema(format!(
                    "sort key '{name}' slipped through validation"
                ))
            })?;
            for field in key.fields() {
                entries.push(SortEntry::new(field, order));
            }
        }
    }
    // stable tie-break so cursor pagination never skips or repeats
    if !entries
        .iter()
        .any(|e| e.field() == Some(profile.tie_break_field.as_str()))
    {
        entries.push(SortEntry::new(&profile.tie_break_field, SortOrder::Asc));
    }
    Ok(entries)
}

/// Cursor segments: numeric sort values travel as numbers, the rest as
/// strings, matching how the engine echoes them back.
fn parse_cursor(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(s.to_string()))
        })
        .collect()
}
