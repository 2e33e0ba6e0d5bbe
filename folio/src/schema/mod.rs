//! Declarative parameter schemas.
//!
//! A schema is a static catalog of [`ParameterDefinition`]s built once at
//! startup and shared read-only. Each definition ties an accepted parameter
//! name to its value syntax, matching semantics and backend field paths;
//! the validator and compiler are driven entirely by these definitions.

pub mod sort;

pub use sort::{SortKeyDefinition, SortKeySchema};

use regex::Regex;

use crate::error::{Error, Result};

/// Value syntax family of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Sentinel for unknown keys
    Invalid,
    /// Accepted and silently dropped
    Ignored,
    Boolean,
    Number,
    Date,
    Keyword,
    /// Keyword with approximate matching
    FuzzyKeyword,
    Text,
    FreeText,
    AcrossFields,
    SortKey,
    /// Clause built by an endpoint-supplied function
    Custom,
}

impl ParamKind {
    /// Pattern the merged value must match. Anchoring and case folding
    /// are applied by the schema when the definition is built.
    pub fn default_value_pattern(&self) -> &'static str {
        match self {
            ParamKind::Boolean => "true|false",
            ParamKind::Number => r"[-+]?\d+(?:,[-+]?\d+)*",
            ParamKind::Date => r"\d{4}(?:-\d{2}){0,2}(?:[T ][0-9:.]+Z?)?",
            ParamKind::SortKey => {
                r"[\w\-.]+(?::(?:asc|desc))?(?:,[\w\-.]+(?::(?:asc|desc))?)*"
            }
            // permissive: syntax is not the gatekeeper for these kinds
            _ => r"[\s\S]+",
        }
    }

    pub fn default_error_message(&self) -> &'static str {
        match self {
            ParamKind::Boolean => "must be a boolean, true or false",
            ParamKind::Number => "must be a number or a comma separated list of numbers",
            ParamKind::Date => "must be a date on the form yyyy, yyyy-MM or yyyy-MM-dd",
            ParamKind::SortKey => "must be a sort key, optionally followed by :asc or :desc",
            _ => "has an invalid value",
        }
    }

    pub fn default_encoding(&self) -> ValueEncoding {
        match self {
            // DOIs and ORCIDs arrive percent-encoded as a rule
            ParamKind::FuzzyKeyword => ValueEncoding::UrlDecode,
            _ => ValueEncoding::None,
        }
    }
}

/// Matching semantics carried into the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamOperator {
    AllOf,
    NotAllOf,
    AnyOf,
    NotAnyOf,
    Between,
    GreaterThanOrEqual,
    LessThan,
    Exists,
    HasParts,
    PartOf,
    NotApplicable,
}

impl ParamOperator {
    /// Negated operators have their clause inverted at the top level.
    pub fn is_negated(&self) -> bool {
        matches!(self, ParamOperator::NotAllOf | ParamOperator::NotAnyOf)
    }

    /// AnyOf-family operators union their values; AllOf-family intersect.
    pub fn joins_any(&self) -> bool {
        matches!(self, ParamOperator::AnyOf | ParamOperator::NotAnyOf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueEncoding {
    #[default]
    None,
    UrlDecode,
}

/// Strip underscores from an incoming key before pattern matching, so
/// `modified_since`, `modifiedSince` and `MODIFIEDSINCE` all resolve to
/// the same definition.
pub fn normalize_key(raw: &str) -> String {
    raw.chars().filter(|c| *c != '_').collect()
}

fn compile_key_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?i:{pattern})$"))
        .map_err(|e| Error::Schema(format!("bad key pattern '{pattern}': {e}")))
}

fn compile_value_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?i:{pattern})$"))
        .map_err(|e| Error::Schema(format!("bad value pattern '{pattern}': {e}")))
}

/// One accepted parameter. `P` is the endpoint's parameter enum; the enum
/// constant is the definition's identity everywhere downstream.
#[derive(Debug, Clone)]
pub struct ParameterDefinition<P> {
    pub param: P,
    /// Canonical spelling, used in links and error messages
    pub name: &'static str,
    pub kind: ParamKind,
    pub operator: ParamOperator,
    key_pattern: Regex,
    value_pattern: Regex,
    pub encoding: ValueEncoding,
    pub boost: f32,
    fields: Vec<String>,
    /// Inner definition compiled recursively by the join builders
    pub sub_query: Option<P>,
    pub error_message: String,
}

impl<P: Copy> ParameterDefinition<P> {
    pub fn builder(
        param: P,
        name: &'static str,
        kind: ParamKind,
        operator: ParamOperator,
    ) -> DefinitionBuilder<P> {
        DefinitionBuilder {
            param,
            name,
            kind,
            operator,
            key_pattern: None,
            value_pattern: None,
            encoding: None,
            boost: 1.0,
            fields: Vec::new(),
            sub_query: None,
            error_message: None,
        }
    }

    /// The sentinel returned by lookup for unknown keys.
    pub fn invalid(param: P) -> Result<Self> {
        // never matches anything: lookup falls through to it explicitly
        Ok(Self {
            param,
            name: "invalid",
            kind: ParamKind::Invalid,
            operator: ParamOperator::NotApplicable,
            key_pattern: compile_key_pattern(r"[^\s\S]")?,
            value_pattern: compile_value_pattern(r"[\s\S]*")?,
            encoding: ValueEncoding::None,
            boost: 1.0,
            fields: Vec::new(),
            sub_query: None,
            error_message: "is not a recognized parameter".to_string(),
        })
    }

    pub fn matches_key(&self, raw_key: &str) -> bool {
        self.key_pattern.is_match(&normalize_key(raw_key))
    }

    pub fn matches_value(&self, value: &str) -> bool {
        self.value_pattern.is_match(value)
    }

    /// Backend field paths. When `strip_keyword_suffix` is set the
    /// `.keyword` suffix is removed so the query hits the analyzed text
    /// variant instead; exact kinds never strip.
    pub fn search_fields(&self, strip_keyword_suffix: bool) -> Vec<String> {
        let strip =
            strip_keyword_suffix && !matches!(self.kind, ParamKind::Keyword | ParamKind::Custom);
        self.fields
            .iter()
            .map(|f| {
                if strip {
                    f.strip_suffix(".keyword").unwrap_or(f).to_string()
                } else {
                    f.clone()
                }
            })
            .collect()
    }
}

pub struct DefinitionBuilder<P> {
    param: P,
    name: &'static str,
    kind: ParamKind,
    operator: ParamOperator,
    key_pattern: Option<String>,
    value_pattern: Option<String>,
    encoding: Option<ValueEncoding>,
    boost: f32,
    fields: Vec<String>,
    sub_query: Option<P>,
    error_message: Option<String>,
}

impl<P: Copy> DefinitionBuilder<P> {
    /// Override the derived key pattern, e.g. to accept aliases:
    /// `"from|offset"`. Write patterns underscore-free; incoming keys
    /// are normalized before matching.
    pub fn key_pattern(mut self, pattern: &str) -> Self {
        self.key_pattern = Some(pattern.to_string());
        self
    }

    pub fn value_pattern(mut self, pattern: &str) -> Self {
        self.value_pattern = Some(pattern.to_string());
        self
    }

    pub fn encoding(mut self, encoding: ValueEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn sub_query(mut self, param: P) -> Self {
        self.sub_query = Some(param);
        self
    }

    pub fn error_message(mut self, message: &str) -> Self {
        self.error_message = Some(message.to_string());
        self
    }

    pub fn build(self) -> Result<ParameterDefinition<P>> {
        let key_pattern = match self.key_pattern {
            Some(p) => compile_key_pattern(&p)?,
            None => compile_key_pattern(&regex::escape(&normalize_key(self.name)))?,
        };
        let value_pattern = match self.value_pattern {
            Some(p) => compile_value_pattern(&p)?,
            None => compile_value_pattern(self.kind.default_value_pattern())?,
        };
        Ok(ParameterDefinition {
            param: self.param,
            name: self.name,
            kind: self.kind,
            operator: self.operator,
            key_pattern,
            value_pattern,
            encoding: self.encoding.unwrap_or_else(|| self.kind.default_encoding()),
            boost: self.boost,
            fields: self.fields,
            sub_query: self.sub_query,
            error_message: self
                .error_message
                .unwrap_or_else(|| self.kind.default_error_message().to_string()),
        })
    }
}

/// The full catalog for one endpoint family.
#[derive(Debug, Clone)]
pub struct ParameterSchema<P> {
    definitions: Vec<ParameterDefinition<P>>,
    invalid: ParameterDefinition<P>,
}

impl<P: Copy + Eq> ParameterSchema<P> {
    pub fn new(definitions: Vec<ParameterDefinition<P>>, invalid_param: P) -> Result<Self> {
        Ok(Self {
            definitions,
            invalid: ParameterDefinition::invalid(invalid_param)?,
        })
    }

    /// Resolve a raw key to its definition. Unknown keys resolve to the
    /// Invalid sentinel; the validator turns those into findings.
    pub fn lookup(&self, raw_key: &str) -> &ParameterDefinition<P> {
        self.definitions
            .iter()
            .find(|d| d.matches_key(raw_key))
            .unwrap_or(&self.invalid)
    }

    /// All definitions a key matches. A well-formed schema yields at most
    /// one; the catalog tests assert that.
    pub fn matching(&self, raw_key: &str) -> Vec<&ParameterDefinition<P>> {
        self.definitions
            .iter()
            .filter(|d| d.matches_key(raw_key))
            .collect()
    }

    pub fn get(&self, param: P) -> Option<&ParameterDefinition<P>> {
        self.definitions.iter().find(|d| d.param == param)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ParameterDefinition<P>> {
        self.definitions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestParam {
        Invalid,
        ModifiedSince,
        From,
    }

    fn schema() -> ParameterSchema<TestParam> {
        let defs = vec![
            ParameterDefinition::builder(
                TestParam::ModifiedSince,
                "modifiedSince",
                ParamKind::Date,
                ParamOperator::GreaterThanOrEqual,
            )
            .fields(&["modifiedDate"])
            .build()
            .unwrap(),
            ParameterDefinition::builder(
                TestParam::From,
                "from",
                ParamKind::Number,
                ParamOperator::NotApplicable,
            )
            .key_pattern("from|offset")
            .build()
            .unwrap(),
        ];
        ParameterSchema::new(defs, TestParam::Invalid).unwrap()
    }

    #[test]
    fn lookup_ignores_case_and_underscores() {
        let s = schema();
        for key in ["modifiedSince", "modified_since", "MODIFIEDSINCE", "Modified_Since"] {
            assert_eq!(s.lookup(key).param, TestParam::ModifiedSince, "key {key}");
        }
    }

    #[test]
    fn lookup_resolves_aliases() {
        let s = schema();
        assert_eq!(s.lookup("offset").param, TestParam::From);
        assert_eq!(s.lookup("OFFSET").param, TestParam::From);
    }

    #[test]
    fn unknown_key_hits_the_sentinel() {
        let s = schema();
        let def = s.lookup("nosuchthing");
        assert_eq!(def.param, TestParam::Invalid);
        assert_eq!(def.kind, ParamKind::Invalid);
    }

    #[test]
    fn kind_defaults_apply() {
        let s = schema();
        let date = s.get(TestParam::ModifiedSince).unwrap();
        assert!(date.matches_value("2023-01-15"));
        assert!(date.matches_value("2023"));
        assert!(!date.matches_value("yesterday"));

        let number = s.get(TestParam::From).unwrap();
        assert!(number.matches_value("42"));
        assert!(number.matches_value("1,2,3"));
        assert!(!number.matches_value("one"));
    }

    #[test]
    fn keyword_suffix_stripping() {
        let def = ParameterDefinition::builder(
            TestParam::From,
            "category",
            ParamKind::FuzzyKeyword,
            ParamOperator::AnyOf,
        )
        .fields(&["type.keyword", "plain"])
        .build()
        .unwrap();
        assert_eq!(def.search_fields(false), vec!["type.keyword", "plain"]);
        assert_eq!(def.search_fields(true), vec!["type", "plain"]);
    }
}
