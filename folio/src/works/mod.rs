//! The works endpoint family.
//!
//! Everything the scholarly-works index accepts lives here: the parameter
//! catalog, sort keys, facet aggregations, base filters and the endpoint
//! policies. The query pipeline itself is generic; this module is the
//! works-specific data it runs on.

pub mod csv;
pub mod mutators;
mod unit;

use std::collections::BTreeMap;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::query::dsl::{AggNode, QueryNode};
use crate::query::{CustomClauseFn, RequestPolicy, SearchProfile};
use crate::schema::{
    ParamKind, ParamOperator, ParameterDefinition, ParameterSchema, SortKeyDefinition,
    SortKeySchema,
};

/// Everything a works request can say. The enum constant is the
/// parameter's identity through validation, compilation and link building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkParam {
    Invalid,
    // content
    Query,
    Title,
    TitleShould,
    ContributorName,
    Category,
    CategoryNot,
    Id,
    Doi,
    Orcid,
    Issn,
    Isbn,
    PublicationYear,
    PublicationYearBetween,
    CreatedBefore,
    CreatedSince,
    ModifiedBefore,
    ModifiedSince,
    HasFile,
    PartOf,
    HasParts,
    Unit,
    Lang,
    // controls
    From,
    Size,
    Page,
    Sort,
    Aggregation,
    SearchAfter,
}

/// Profile for the JSON search endpoint.
pub fn profile(search: &SearchConfig) -> Result<SearchProfile<WorkParam>> {
    build(search, json_defaults(search))
}

/// Profile for the CSV export endpoint: stable default sort, export-sized
/// pages, no aggregations.
pub fn export_profile(search: &SearchConfig) -> Result<SearchProfile<WorkParam>> {
    build(search, export_defaults(search))
}

fn build(
    search: &SearchConfig,
    defaults: Vec<(WorkParam, String)>,
) -> Result<SearchProfile<WorkParam>> {
    let policy = RequestPolicy {
        from: WorkParam::From,
        size: WorkParam::Size,
        page: WorkParam::Page,
        sort: WorkParam::Sort,
        aggregation: WorkParam::Aggregation,
        search_after: WorkParam::SearchAfter,
        defaults,
        required: Vec::new(),
        max_size: search.max_size,
    };
    let mut custom_builders: BTreeMap<WorkParam, CustomClauseFn<WorkParam>> = BTreeMap::new();
    custom_builders.insert(WorkParam::Unit, unit::builder());
    Ok(SearchProfile {
        schema: ParameterSchema::new(definitions()?, WorkParam::Invalid)?,
        sort_schema: sort_keys()?,
        policy,
        base_filters: base_filters(),
        aggregations: aggregations(),
        facet_params: facet_params(),
        tie_break_field: "identifier.keyword".to_string(),
        custom_builders,
    })
}

fn json_defaults(search: &SearchConfig) -> Vec<(WorkParam, String)> {
    vec![
        (WorkParam::From, "0".to_string()),
        (WorkParam::Size, search.default_size.to_string()),
        (WorkParam::Sort, "relevance".to_string()),
        (WorkParam::Aggregation, "all".to_string()),
    ]
}

fn export_defaults(search: &SearchConfig) -> Vec<(WorkParam, String)> {
    vec![
        (WorkParam::From, "0".to_string()),
        (WorkParam::Size, search.export_page_size.to_string()),
        (WorkParam::Sort, "createdDate".to_string()),
        (WorkParam::Aggregation, "none".to_string()),
    ]
}

fn definitions() -> Result<Vec<ParameterDefinition<WorkParam>>> {
    Ok(vec![
        ParameterDefinition::builder(
            WorkParam::Query,
            "query",
            ParamKind::FreeText,
            ParamOperator::AllOf,
        )
        .fields(&[
            "entityDescription.mainTitle",
            "entityDescription.abstract",
            "entityDescription.contributors.identity.name",
            "publisher.name",
        ])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Title,
            "title",
            ParamKind::Text,
            ParamOperator::AllOf,
        )
        .boost(2.0)
        .fields(&["entityDescription.mainTitle"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::TitleShould,
            "titleShould",
            ParamKind::Text,
            ParamOperator::AnyOf,
        )
        .fields(&["entityDescription.mainTitle"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::ContributorName,
            "contributorName",
            ParamKind::AcrossFields,
            ParamOperator::AllOf,
        )
        .fields(&[
            "entityDescription.contributors.identity.name",
            "entityDescription.contributors.identity.alias",
        ])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Category,
            "category",
            ParamKind::Keyword,
            ParamOperator::AnyOf,
        )
        .fields(&["entityDescription.reference.publicationInstance.type.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::CategoryNot,
            "categoryNot",
            ParamKind::Keyword,
            ParamOperator::NotAnyOf,
        )
        .fields(&["entityDescription.reference.publicationInstance.type.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Id,
            "id",
            ParamKind::Keyword,
            ParamOperator::AnyOf,
        )
        .fields(&["identifier.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Doi,
            "doi",
            ParamKind::FuzzyKeyword,
            ParamOperator::AnyOf,
        )
        .fields(&["entityDescription.reference.doi.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Orcid,
            "orcid",
            ParamKind::FuzzyKeyword,
            ParamOperator::AnyOf,
        )
        .fields(&["entityDescription.contributors.identity.orcId.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Issn,
            "issn",
            ParamKind::Keyword,
            ParamOperator::AnyOf,
        )
        .fields(&[
            "entityDescription.reference.publicationContext.onlineIssn.keyword",
            "entityDescription.reference.publicationContext.printIssn.keyword",
        ])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Isbn,
            "isbn",
            ParamKind::Keyword,
            ParamOperator::AnyOf,
        )
        .fields(&["entityDescription.reference.publicationContext.isbnList.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::PublicationYear,
            "publicationYear",
            ParamKind::Keyword,
            ParamOperator::AnyOf,
        )
        .fields(&["entityDescription.publicationDate.year.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::PublicationYearBetween,
            "publicationYearBetween",
            ParamKind::Number,
            ParamOperator::Between,
        )
        .value_pattern(r"[-+]?\d+,[-+]?\d+")
        .error_message("must be two comma separated years, lowest first")
        .fields(&["entityDescription.publicationDate.year"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::CreatedBefore,
            "createdBefore",
            ParamKind::Date,
            ParamOperator::LessThan,
        )
        .fields(&["createdDate"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::CreatedSince,
            "createdSince",
            ParamKind::Date,
            ParamOperator::GreaterThanOrEqual,
        )
        .fields(&["createdDate"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::ModifiedBefore,
            "modifiedBefore",
            ParamKind::Date,
            ParamOperator::LessThan,
        )
        .fields(&["modifiedDate"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::ModifiedSince,
            "modifiedSince",
            ParamKind::Date,
            ParamOperator::GreaterThanOrEqual,
        )
        .fields(&["modifiedDate"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::HasFile,
            "hasFile",
            ParamKind::Boolean,
            ParamOperator::Exists,
        )
        .fields(&["associatedArtifacts.file", "associatedArtifacts.link"])
        .build()?,
        // join relations: a chapter's parent is the anthology it appears in
        ParameterDefinition::builder(
            WorkParam::PartOf,
            "partOf",
            ParamKind::Keyword,
            ParamOperator::PartOf,
        )
        .fields(&["anthology"])
        .sub_query(WorkParam::Id)
        .build()?,
        ParameterDefinition::builder(
            WorkParam::HasParts,
            "hasParts",
            ParamKind::Keyword,
            ParamOperator::HasParts,
        )
        .fields(&["chapter"])
        .sub_query(WorkParam::Id)
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Unit,
            "unit",
            ParamKind::Custom,
            ParamOperator::NotApplicable,
        )
        .fields(&["topLevelOrganisations.id.keyword"])
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Lang,
            "lang",
            ParamKind::Ignored,
            ParamOperator::NotApplicable,
        )
        .build()?,
        // controls
        ParameterDefinition::builder(
            WorkParam::From,
            "from",
            ParamKind::Number,
            ParamOperator::NotApplicable,
        )
        .key_pattern("from|offset")
        .value_pattern(r"[-+]?\d+")
        .error_message("must be a number")
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Size,
            "size",
            ParamKind::Number,
            ParamOperator::NotApplicable,
        )
        .key_pattern("size|results")
        .value_pattern(r"[-+]?\d+")
        .error_message("must be a number")
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Page,
            "page",
            ParamKind::Number,
            ParamOperator::NotApplicable,
        )
        .value_pattern(r"[-+]?\d+")
        .error_message("must be a number")
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Sort,
            "sort",
            ParamKind::SortKey,
            ParamOperator::NotApplicable,
        )
        .key_pattern("sort|orderby|sortorder")
        .build()?,
        ParameterDefinition::builder(
            WorkParam::Aggregation,
            "aggregation",
            ParamKind::Keyword,
            ParamOperator::NotApplicable,
        )
        .value_pattern("all|none")
        .error_message("must be all or none")
        .build()?,
        ParameterDefinition::builder(
            WorkParam::SearchAfter,
            "searchAfter",
            ParamKind::Keyword,
            ParamOperator::NotApplicable,
        )
        .build()?,
    ])
}

fn sort_keys() -> Result<SortKeySchema> {
    Ok(SortKeySchema::new(vec![
        SortKeyDefinition::with_pattern("relevance", "relevance|score", &["_score"])?,
        SortKeyDefinition::new("createdDate", &["createdDate"])?,
        SortKeyDefinition::new("modifiedDate", &["modifiedDate"])?,
        SortKeyDefinition::new("publishedDate", &["publishedDate"])?,
        SortKeyDefinition::new(
            "publicationDate",
            &[
                "entityDescription.publicationDate.year.keyword",
                "entityDescription.publicationDate.month.keyword",
            ],
        )?,
        SortKeyDefinition::new("title", &["entityDescription.mainTitle.keyword"])?,
        SortKeyDefinition::new("id", &["identifier.keyword"])?,
    ]))
}

fn aggregations() -> BTreeMap<String, AggNode> {
    let mut aggs = BTreeMap::new();
    aggs.insert(
        "type".to_string(),
        AggNode::terms(
            "entityDescription.reference.publicationInstance.type.keyword",
            20,
        ),
    );
    aggs.insert(
        "publicationYear".to_string(),
        AggNode::terms("entityDescription.publicationDate.year.keyword", 30),
    );
    aggs.insert(
        "topLevelOrganisation".to_string(),
        AggNode::terms("topLevelOrganisations.id.keyword", 20)
            .with_sub(
                "label_en",
                AggNode::terms("topLevelOrganisations.labels.en.keyword", 1),
            )
            .with_sub(
                "label_nb",
                AggNode::terms("topLevelOrganisations.labels.nb.keyword", 1),
            ),
    );
    aggs
}

/// Which parameter each facet drills down into.
fn facet_params() -> BTreeMap<String, WorkParam> {
    let mut map = BTreeMap::new();
    map.insert("type".to_string(), WorkParam::Category);
    map.insert("publicationYear".to_string(), WorkParam::PublicationYear);
    map.insert("topLevelOrganisation".to_string(), WorkParam::Unit);
    map
}

/// ANDed into every query regardless of what the request says.
fn base_filters() -> Vec<QueryNode> {
    vec![QueryNode::terms(
        "status.keyword",
        &["PUBLISHED".to_string(), "PUBLISHED_METADATA".to_string()],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn works() -> SearchProfile<WorkParam> {
        profile(&SearchConfig::default()).unwrap()
    }

    #[test]
    fn every_canonical_name_resolves_to_exactly_one_definition() {
        let p = works();
        for def in p.schema.definitions() {
            let hits = p.schema.matching(def.name);
            assert_eq!(
                hits.len(),
                1,
                "key '{}' matches {} definitions",
                def.name,
                hits.len()
            );
            assert_eq!(hits[0].param, def.param, "key '{}'", def.name);
        }
    }

    #[test]
    fn aliases_resolve_to_their_parameter() {
        let p = works();
        assert_eq!(p.schema.lookup("offset").param, WorkParam::From);
        assert_eq!(p.schema.lookup("results").param, WorkParam::Size);
        assert_eq!(p.schema.lookup("orderBy").param, WorkParam::Sort);
        assert_eq!(p.schema.lookup("sort_order").param, WorkParam::Sort);
    }

    #[test]
    fn every_facet_has_an_aggregation_and_a_parameter() {
        let p = works();
        for name in p.facet_params.keys() {
            assert!(
                p.aggregations.contains_key(name),
                "facet '{name}' has no aggregation"
            );
        }
        for name in p.aggregations.keys() {
            assert!(
                p.facet_params.contains_key(name),
                "aggregation '{name}' has no drill-down parameter"
            );
        }
        for param in p.facet_params.values() {
            assert!(p.schema.get(*param).is_some());
        }
    }

    #[test]
    fn join_parameters_point_at_the_id_definition() {
        let p = works();
        for param in [WorkParam::PartOf, WorkParam::HasParts] {
            let def = p.schema.get(param).unwrap();
            assert_eq!(def.sub_query, Some(WorkParam::Id));
        }
    }

    #[test]
    fn every_sort_key_name_is_accepted_by_the_sort_definition() {
        let p = works();
        let sort_def = p.schema.get(WorkParam::Sort).unwrap();
        for key in p.sort_schema.keys() {
            assert!(
                sort_def.matches_value(key.name),
                "sort value '{}' fails the sort pattern",
                key.name
            );
            assert!(sort_def.matches_value(&format!("{}:asc", key.name)));
        }
    }

    #[test]
    fn export_profile_defaults_to_a_stable_sort() {
        let p = export_profile(&SearchConfig::default()).unwrap();
        assert_eq!(p.policy.default_of(WorkParam::Sort), Some("createdDate"));
        assert_eq!(p.policy.default_of(WorkParam::Aggregation), Some("none"));
        assert_eq!(p.policy.default_of(WorkParam::Size), Some("500"));
    }

    #[test]
    fn base_filters_pin_published_statuses() {
        let p = works();
        let v = serde_json::to_value(&p.base_filters).unwrap();
        assert_eq!(
            v,
            serde_json::json!([
                {"terms": {"status.keyword": ["PUBLISHED", "PUBLISHED_METADATA"]}}
            ])
        );
    }

    #[test]
    fn unit_has_a_registered_clause_builder() {
        let p = works();
        assert!(p.custom_builders.contains_key(&WorkParam::Unit));
    }
}
