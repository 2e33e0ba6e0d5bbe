//! Single-pass parameter validation.
//!
//! The validator walks the raw key/value pairs once, resolving keys
//! against the schema, decoding and merging values, then checks every
//! merged value. It never stops at the first problem: all findings are
//! collected and returned as one combined error so callers can fix the
//! whole request at once.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{BadRequest, Result};
use crate::media::MediaType;
use crate::query::{SearchProfile, ValidatedQuery};
use crate::schema::{ParamKind, ValueEncoding};

fn is_order_token(value: &str) -> bool {
    value.eq_ignore_ascii_case("asc") || value.eq_ignore_ascii_case("desc")
}

/// Validate raw pairs against the profile and freeze the outcome.
pub fn validate<P: Copy + Ord>(
    profile: &SearchProfile<P>,
    raw_pairs: &[(String, String)],
    media: MediaType,
    base_url: Url,
) -> Result<ValidatedQuery<P>> {
    let mut findings = BadRequest::new();
    let mut merged: BTreeMap<P, String> = BTreeMap::new();

    // Resolve, decode and merge. Unknown keys become findings; the scan
    // always continues to the end of the pair list.
    for (raw_key, raw_value) in raw_pairs {
        let def = profile.schema.lookup(raw_key);
        match def.kind {
            ParamKind::Invalid => {
                if !findings.unknown_keys.iter().any(|k| k == raw_key) {
                    findings.unknown_key(raw_key.clone());
                }
                continue;
            }
            ParamKind::Ignored => {
                tracing::debug!(key = %raw_key, "dropping ignored parameter");
                continue;
            }
            _ => {}
        }

        let decoded = match def.encoding {
            ValueEncoding::UrlDecode => match urlencoding::decode(raw_value) {
                Ok(v) => v.into_owned(),
                Err(_) => {
                    findings.invalid_value(def.name, raw_value.clone(), "is not valid UTF-8");
                    continue;
                }
            },
            ValueEncoding::None => raw_value.clone(),
        };

        // Merge rule: a bare sort-order token extends the previous value
        // with ':', anything else appends with ','. This is what makes
        // `sort=title&sortOrder=asc` compose to `title:asc`.
        merged
            .entry(def.param)
            .and_modify(|existing| {
                if is_order_token(&decoded) {
                    existing.push(':');
                } else {
                    existing.push(',');
                }
                existing.push_str(&decoded);
            })
            .or_insert(decoded);
    }

    let policy = &profile.policy;

    // page is sugar for from: resolve it before defaults fill from in.
    // page itself stays in the map until the value checks have seen it.
    if !merged.contains_key(&policy.from) {
        let page = merged.get(&policy.page).and_then(|v| v.parse::<i64>().ok());
        if let Some(page) = page {
            let size = merged
                .get(&policy.size)
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or_else(|| default_for(profile, policy.size));
            let from = page.saturating_mul(size).max(0);
            merged.insert(policy.from, from.to_string());
        }
    }

    for (param, default) in &policy.defaults {
        merged.entry(*param).or_insert_with(|| default.clone());
    }

    for param in &policy.required {
        if !merged.contains_key(param) {
            findings.missing_key(profile.name_of(*param));
        }
    }

    // Now check every merged value against its definition.
    for (param, value) in &merged {
        let Some(def) = profile.definition(*param) else {
            continue;
        };
        if !def.matches_value(value) {
            findings.invalid_value(def.name, value.clone(), def.error_message.clone());
            continue;
        }
        // digit runs can satisfy the pattern yet overflow an i64;
        // every numeric segment must actually parse
        if def.kind == ParamKind::Number {
            let out_of_range = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .any(|s| s.parse::<i64>().is_err());
            if out_of_range {
                findings.invalid_value(def.name, value.clone(), def.error_message.clone());
                continue;
            }
        }
        if def.kind == ParamKind::SortKey {
            for segment in value.split(',').filter(|s| !s.is_empty()) {
                let name = segment.split(':').next().unwrap_or(segment);
                if profile.sort_schema.lookup(name).is_none() {
                    findings.invalid_value(
                        def.name,
                        segment.to_string(),
                        format!(
                            "is not a valid sort key; valid keys are {}",
                            profile.sort_schema.names().join(", ")
                        ),
                    );
                }
            }
        }
    }

    // page was folded into from above; it does not survive validation
    merged.remove(&policy.page);

    // Cursor pagination needs a stable order: relevance re-scores every
    // page, so searchAfter combined with a relevance sort is rejected.
    if merged.contains_key(&policy.search_after) {
        if let Some(sort_value) = merged.get(&policy.sort) {
            if resolves_to_relevance(profile, sort_value) {
                findings.conflict(format!(
                    "{} cannot be combined with a relevance sort",
                    profile.name_of(policy.search_after)
                ));
            }
        }
    }

    findings.into_result()?;
    Ok(ValidatedQuery::new(merged, media, base_url))
}

/// Whether any segment of the sort value orders by score.
pub fn resolves_to_relevance<P: Copy + Ord>(profile: &SearchProfile<P>, sort_value: &str) -> bool {
    sort_value
        .split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|segment| {
            let name = segment.split(':').next().unwrap_or(segment);
            profile.sort_schema.lookup(name)
        })
        .any(|key| key.fields().iter().any(|f| f == "_score"))
}

fn default_for<P: Copy + Ord>(profile: &SearchProfile<P>, param: P) -> i64 {
    profile
        .policy
        .defaults
        .iter()
        .find(|(p, _)| *p == param)
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::error::Error;
    use crate::works::{self, WorkParam};

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn run(list: &[(&str, &str)]) -> Result<ValidatedQuery<WorkParam>> {
        let profile = works::profile(&SearchConfig::default()).unwrap();
        validate(
            &profile,
            &pairs(list),
            MediaType::Json,
            Url::parse("https://api.example.org/search/works").unwrap(),
        )
    }

    #[test]
    fn sort_and_order_merge_with_colon() {
        let q = run(&[("sort", "title"), ("sortOrder", "asc")]).unwrap();
        assert_eq!(q.get(WorkParam::Sort), Some("title:asc"));
    }

    #[test]
    fn repeated_values_merge_with_comma() {
        let q = run(&[
            ("category", "AcademicArticle"),
            ("category", "AcademicMonograph"),
        ])
        .unwrap();
        assert_eq!(
            q.values(WorkParam::Category),
            vec!["AcademicArticle", "AcademicMonograph"]
        );
    }

    #[test]
    fn mixed_merge_is_left_to_right() {
        let q = run(&[
            ("sort", "title"),
            ("sortOrder", "asc"),
            ("sort", "publicationDate"),
        ])
        .unwrap();
        assert_eq!(q.get(WorkParam::Sort), Some("title:asc,publicationDate"));
    }

    #[test]
    fn page_becomes_from_and_disappears() {
        let q = run(&[("page", "3"), ("size", "20")]).unwrap();
        assert_eq!(q.get(WorkParam::From), Some("60"));
        assert!(!q.contains(WorkParam::Page));
    }

    #[test]
    fn explicit_from_wins_over_page() {
        let q = run(&[("page", "3"), ("from", "5")]).unwrap();
        assert_eq!(q.get(WorkParam::From), Some("5"));
    }

    #[test]
    fn page_is_checked_even_when_from_is_explicit() {
        let err = run(&[("page", "abc"), ("from", "5"), ("query", "x")]).unwrap_err();
        let Error::BadRequest(findings) = err else {
            panic!("expected BadRequest, got {err:?}");
        };
        assert_eq!(findings.invalid_values.len(), 1);
        assert_eq!(findings.invalid_values[0].key, "page");
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        for key in ["from", "size", "page"] {
            let err = run(&[(key, "99999999999999999999")]).unwrap_err();
            assert!(matches!(err, Error::BadRequest(_)), "key {key}");
        }
    }

    #[test]
    fn offset_controls_take_a_single_number() {
        let err = run(&[("from", "1,2")]).unwrap_err();
        let Error::BadRequest(findings) = err else {
            panic!("expected BadRequest, got {err:?}");
        };
        assert_eq!(findings.invalid_values[0].key, "from");
    }

    #[test]
    fn defaults_fill_in_missing_controls() {
        let q = run(&[("query", "climate")]).unwrap();
        assert_eq!(q.get(WorkParam::From), Some("0"));
        assert_eq!(q.get(WorkParam::Size), Some("10"));
        assert_eq!(q.get(WorkParam::Sort), Some("relevance"));
        assert_eq!(q.get(WorkParam::Aggregation), Some("all"));
    }

    #[test]
    fn doi_values_are_percent_decoded() {
        let q = run(&[("doi", "https%3A%2F%2Fdoi.org%2F10.1000%2Fxyz")]).unwrap();
        assert_eq!(q.get(WorkParam::Doi), Some("https://doi.org/10.1000/xyz"));
    }

    #[test]
    fn lang_is_accepted_and_dropped() {
        let q = run(&[("query", "x"), ("lang", "nb")]).unwrap();
        assert!(q.get(WorkParam::Query).is_some());
        // nothing unknown was reported and no lang key survives
        assert_eq!(q.iter().count(), 5);
    }

    #[test]
    fn all_findings_come_back_at_once() {
        let err = run(&[
            ("tittles", "blah"),
            ("size", "many"),
            ("createdBefore", "not-a-date"),
        ])
        .unwrap_err();
        let Error::BadRequest(findings) = err else {
            panic!("expected BadRequest, got {err:?}");
        };
        assert_eq!(findings.unknown_keys, vec!["tittles"]);
        assert_eq!(findings.invalid_values.len(), 2);
    }

    #[test]
    fn unknown_sort_key_is_reported() {
        let err = run(&[("sort", "flavour")]).unwrap_err();
        let Error::BadRequest(findings) = err else {
            panic!("expected BadRequest");
        };
        assert_eq!(findings.invalid_values.len(), 1);
        assert!(findings.invalid_values[0].message.contains("valid keys"));
    }

    #[test]
    fn search_after_with_relevance_sort_is_a_conflict() {
        // sort defaults to relevance, so a bare cursor conflicts
        let err = run(&[("searchAfter", "123,abc")]).unwrap_err();
        let Error::BadRequest(findings) = err else {
            panic!("expected BadRequest");
        };
        assert_eq!(findings.conflicts.len(), 1);

        // an explicit stable sort is fine
        assert!(run(&[("searchAfter", "123,abc"), ("sort", "modifiedDate")]).is_ok());
    }

    #[test]
    fn between_requires_exactly_two_numbers() {
        assert!(run(&[("publicationYearBetween", "2019,2022")]).is_ok());
        let err = run(&[("publicationYearBetween", "2019")]).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
