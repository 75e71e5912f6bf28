//! The visual query model
//!
//! A [`VisualQuery`] is the structured, editable form of a query: a stream
//! selector as a list of label matchers, followed by operations applied in
//! order. Each operation is an id and a list of string parameters.

use smol_str::SmolStr;
use std::fmt;

/// Operation ids produced by the builder and understood by the renderer
pub mod operation_id {
    pub const LINE_CONTAINS: &str = "line-contains";
    pub const LINE_CONTAINS_NOT: &str = "line-contains-not";
    pub const LINE_MATCHES_REGEX: &str = "line-matches-regex";
    pub const LINE_MATCHES_REGEX_NOT: &str = "line-matches-regex-not";
    pub const LINE_FILTER_IP_MATCHES: &str = "line-filter-ip-matches";

    pub const JSON: &str = "json";
    pub const LOGFMT: &str = "logfmt";
    pub const UNPACK: &str = "unpack";
    pub const REGEXP: &str = "regexp";
    pub const PATTERN: &str = "pattern";

    pub const LABEL_FILTER: &str = "label-filter";
    pub const LABEL_FILTER_NO_ERRORS: &str = "label-filter-no-errors";
    pub const LINE_FORMAT: &str = "line_format";
    pub const LABEL_FORMAT: &str = "label_format";
    pub const UNWRAP: &str = "unwrap";
    pub const DECOLORIZE: &str = "decolorize";
    pub const DROP: &str = "drop";
    pub const KEEP: &str = "keep";

    pub const ADDITION: &str = "__addition";
    pub const SUBTRACTION: &str = "__subtraction";
    pub const MULTIPLY_BY: &str = "__multiply_by";
    pub const DIVIDE_BY: &str = "__divide_by";
    pub const MODULO: &str = "__modulo";
    pub const EXPONENT: &str = "__exponent";
    pub const EQUAL_TO: &str = "__equal_to";
    pub const NOT_EQUAL_TO: &str = "__not_equal_to";
    pub const GREATER_THAN: &str = "__greater_than";
    pub const GREATER_OR_EQUAL: &str = "__greater_or_equal";
    pub const LESS_THAN: &str = "__less_than";
    pub const LESS_OR_EQUAL: &str = "__less_or_equal";

    /// Scalar binary operations: id, operator, whether it is a comparison
    pub(crate) const BINARY_SCALAR: &[(&str, &str, bool)] = &[
        (ADDITION, "+", false),
        (SUBTRACTION, "-", false),
        (MULTIPLY_BY, "*", false),
        (DIVIDE_BY, "/", false),
        (MODULO, "%", false),
        (EXPONENT, "^", false),
        (EQUAL_TO, "==", true),
        (NOT_EQUAL_TO, "!=", true),
        (GREATER_THAN, ">", true),
        (GREATER_OR_EQUAL, ">=", true),
        (LESS_THAN, "<", true),
        (LESS_OR_EQUAL, "<=", true),
    ];

    pub(crate) fn binary_scalar_for_operator(operator: &str) -> Option<(&'static str, bool)> {
        BINARY_SCALAR
            .iter()
            .find(|(_, op, _)| *op == operator)
            .map(|(id, _, comparison)| (*id, *comparison))
    }

    pub(crate) fn binary_scalar_for_id(id: &str) -> Option<(&'static str, bool)> {
        BINARY_SCALAR
            .iter()
            .find(|(op_id, _, _)| *op_id == id)
            .map(|(_, op, comparison)| (*op, *comparison))
    }
}

/// Operator of a label matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchOperator {
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Equal,
    #[cfg_attr(feature = "serde", serde(rename = "!="))]
    NotEqual,
    #[cfg_attr(feature = "serde", serde(rename = "=~"))]
    Regex,
    #[cfg_attr(feature = "serde", serde(rename = "!~"))]
    NotRegex,
}

impl MatchOperator {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "=" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "=~" => Some(Self::Regex),
            "!~" => Some(Self::NotRegex),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Regex => "=~",
            Self::NotRegex => "!~",
        }
    }
}

impl fmt::Display for MatchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One matcher of the stream selector
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelMatcher {
    pub label: String,
    #[cfg_attr(feature = "serde", serde(rename = "op"))]
    pub operator: MatchOperator,
    /// Unescaped value, without quotes
    pub value: String,
}

impl LabelMatcher {
    pub fn new(label: impl Into<String>, operator: MatchOperator, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Operation {
    pub id: SmolStr,
    pub params: Vec<String>,
}

impl Operation {
    pub fn new<I, S>(id: impl Into<SmolStr>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// An operation without parameters
    pub fn bare(id: impl Into<SmolStr>) -> Self {
        Self {
            id: id.into(),
            params: Vec::new(),
        }
    }
}

/// `on` or `ignoring` vector matching of a binary operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VectorMatchesType {
    On,
    Ignoring,
}

impl VectorMatchesType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Ignoring => "ignoring",
        }
    }
}

/// The right-hand side of a binary operation that is itself a query
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct BinaryOperand {
    pub operator: SmolStr,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub vector_matches_type: Option<VectorMatchesType>,
    /// Comma separated label list of the `on`/`ignoring` clause
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub vector_matches: Option<String>,
    pub query: VisualQuery,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct VisualQuery {
    pub labels: Vec<LabelMatcher>,
    pub operations: Vec<Operation>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub binary_queries: Option<Vec<BinaryOperand>>,
}

impl VisualQuery {
    /// No labels and no operations
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.operations.is_empty()
    }

    /// Operations without a stream selector.
    ///
    /// The only accepted selector-less form is a single empty line-contains
    /// filter, which is what a freshly created query looks like.
    pub fn is_incomplete(&self) -> bool {
        if !self.labels.is_empty() || self.operations.is_empty() {
            return false;
        }
        !matches!(
            self.operations.as_slice(),
            [op] if op.id == operation_id::LINE_CONTAINS
                && op.params.first().is_none_or(|p| p.is_empty())
        )
    }

    pub(crate) fn push_binary(&mut self, operand: BinaryOperand) {
        self.binary_queries.get_or_insert_with(Vec::new).push(operand);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_without_labels() {
        let query = VisualQuery {
            operations: vec![Operation::bare(operation_id::LOGFMT)],
            ..Default::default()
        };
        assert!(query.is_incomplete());
    }

    #[test]
    fn test_empty_line_contains_is_accepted() {
        let query = VisualQuery {
            operations: vec![Operation::new(operation_id::LINE_CONTAINS, [""])],
            ..Default::default()
        };
        assert!(!query.is_incomplete());
    }

    #[test]
    fn test_labels_make_query_complete() {
        let query = VisualQuery {
            labels: vec![LabelMatcher::new("job", MatchOperator::Equal, "api")],
            operations: vec![Operation::bare(operation_id::JSON)],
            binary_queries: None,
        };
        assert!(!query.is_incomplete());
        assert!(!query.is_empty());
    }

    #[test]
    fn test_binary_scalar_lookup() {
        assert_eq!(
            operation_id::binary_scalar_for_operator(">="),
            Some((operation_id::GREATER_OR_EQUAL, true))
        );
        assert_eq!(
            operation_id::binary_scalar_for_id(operation_id::DIVIDE_BY),
            Some(("/", false))
        );
        assert_eq!(operation_id::binary_scalar_for_operator("and"), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_shape() {
        let query = VisualQuery {
            labels: vec![LabelMatcher::new("job", MatchOperator::Regex, "api.*")],
            operations: vec![Operation::new(operation_id::LINE_CONTAINS, ["x"])],
            binary_queries: None,
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "labels": [{ "label": "job", "op": "=~", "value": "api.*" }],
                "operations": [{ "id": "line-contains", "params": ["x"] }]
            })
        );
    }
}
