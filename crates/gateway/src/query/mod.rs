//! Query-string filter translation.
//!
//! This module provides:
//! - OperatorTag: closed set of comparison and structural operators
//! - Filter / FilterSet: normalized predicates handed to the storage layer
//! - resolve_pair: key/value → (field, operator, value)
//! - FilterSet::from_query: raw query string → ordered filters
//! - encode_filters: FilterSet → storage wire format

mod builder;
mod encode;
mod operator;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use encode::encode_filters;
pub use operator::resolve_pair;

/// Operator applied by a [`Filter`].
///
/// Serialized with the exact tokens the storage functions understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorTag {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    /// Substring match.
    #[serde(rename = "~")]
    Like,
    /// Negated substring match.
    #[serde(rename = "!~")]
    NotLike,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "!in")]
    NotIn,
    #[serde(rename = "array_includes")]
    ArrayIncludes,
    #[serde(rename = "!array_includes")]
    NotArrayIncludes,
    #[serde(rename = "array_includes_any")]
    ArrayIncludesAny,
    #[serde(rename = "array_includes_all")]
    ArrayIncludesAll,
    #[serde(rename = "size")]
    Size,
    #[serde(rename = "size>")]
    SizeGt,
    #[serde(rename = "size>=")]
    SizeGte,
    #[serde(rename = "size<")]
    SizeLt,
    #[serde(rename = "size<=")]
    SizeLte,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "!exists")]
    NotExists,
    #[serde(rename = "empty")]
    Empty,
    #[serde(rename = "!empty")]
    NotEmpty,
    /// SQL `LIKE` pattern supplied verbatim by the client.
    #[serde(rename = "like")]
    LikePattern,
    #[serde(rename = "regex")]
    Regex,
}

impl OperatorTag {
    /// Every operator, in declaration order.
    pub const ALL: [OperatorTag; 25] = [
        Self::Eq,
        Self::NotEq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Like,
        Self::NotLike,
        Self::In,
        Self::NotIn,
        Self::ArrayIncludes,
        Self::NotArrayIncludes,
        Self::ArrayIncludesAny,
        Self::ArrayIncludesAll,
        Self::Size,
        Self::SizeGt,
        Self::SizeGte,
        Self::SizeLt,
        Self::SizeLte,
        Self::Exists,
        Self::NotExists,
        Self::Empty,
        Self::NotEmpty,
        Self::LikePattern,
        Self::Regex,
    ];

    /// Wire token for this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "~",
            Self::NotLike => "!~",
            Self::In => "in",
            Self::NotIn => "!in",
            Self::ArrayIncludes => "array_includes",
            Self::NotArrayIncludes => "!array_includes",
            Self::ArrayIncludesAny => "array_includes_any",
            Self::ArrayIncludesAll => "array_includes_all",
            Self::Size => "size",
            Self::SizeGt => "size>",
            Self::SizeGte => "size>=",
            Self::SizeLt => "size<",
            Self::SizeLte => "size<=",
            Self::Exists => "exists",
            Self::NotExists => "!exists",
            Self::Empty => "empty",
            Self::NotEmpty => "!empty",
            Self::LikePattern => "like",
            Self::Regex => "regex",
        }
    }
}

impl fmt::Display for OperatorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate on a named attribute of a stored record.
///
/// Field and value are kept as strings; numeric and boolean interpretation
/// happens in the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: OperatorTag,
    pub value: String,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: OperatorTag, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

/// Ordered filters for one request, in query-string order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterSet(Vec<Filter>);

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) {
        self.0.push(filter);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Filter> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Filter] {
        &self.0
    }
}

impl From<Vec<Filter>> for FilterSet {
    fn from(filters: Vec<Filter>) -> Self {
        Self(filters)
    }
}

impl<'a> IntoIterator for &'a FilterSet {
    type Item = &'a Filter;
    type IntoIter = std::slice::Iter<'a, Filter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
