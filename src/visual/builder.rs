//! Builds a [`VisualQuery`] from query text
//!
//! The query is masked, parsed, and the tree walked depth-first in document
//! order. Each node kind the builder understands turns into a label matcher or
//! an operation; every other kind is skipped while its children are still
//! visited, so constructs added to the grammar later do not break the walk.

use super::error::ParsingError;
use super::model::{
    BinaryOperand, LabelMatcher, MatchOperator, Operation, VectorMatchesType, VisualQuery,
    operation_id,
};
use crate::parser::ast::{
    AstNode, BinOpExpr, DropLabelsExpr, JsonExpressionParser, KeepLabelsExpr, LabelFilter,
    LabelFilterLeaf, LabelFormatMatcher, LabelParser, LabelsItem, LineFilter, LineFormatExpr,
    Matcher, MetricExpr, MetricKind, RangeAggregationExpr, UnwrapExpr, VectorAggregationExpr,
};
use crate::parser::{SyntaxKind, SyntaxNode, SyntaxToken, kind_to_name, parse};
use crate::template::{mask_placeholders, unmask_placeholders};

const COMBINED_LABEL_FILTER: &str =
    r#"Label filter with comma, "and", "or" not supported in query builder"#;

/// Result of [`build`]: the best query that could be assembled and the
/// parts of the input that could not be represented
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildResult {
    pub query: VisualQuery,
    pub errors: Vec<ParsingError>,
}

/// Build a visual query from query text.
///
/// Never fails: unsupported or malformed parts are reported in
/// [`BuildResult::errors`]. An empty result carries no errors.
pub fn build(expr: &str) -> BuildResult {
    let masked = mask_placeholders(expr);
    let parse = parse(&masked);

    let mut builder = Builder::default();
    let mut query = VisualQuery::default();
    builder.visit(&parse.syntax(), &mut query);

    let mut errors = builder.errors;
    if query.is_empty() {
        errors.clear();
    }

    tracing::debug!(
        labels = query.labels.len(),
        operations = query.operations.len(),
        errors = errors.len(),
        "built visual query"
    );
    BuildResult { query, errors }
}

#[derive(Default)]
struct Builder {
    errors: Vec<ParsingError>,
}

impl Builder {
    fn visit(&mut self, node: &SyntaxNode, query: &mut VisualQuery) {
        match node.kind() {
            SyntaxKind::MATCHER => {
                if let Some(matcher) = Matcher::cast(node.clone()).and_then(|m| label_matcher(&m)) {
                    query.labels.push(matcher);
                }
                self.collect_errors(node);
            }
            SyntaxKind::LINE_FILTER => {
                self.push(query, LineFilter::cast(node.clone()).and_then(|f| line_filter(&f)));
                self.collect_errors(node);
            }
            SyntaxKind::LABEL_PARSER => {
                self.push(query, LabelParser::cast(node.clone()).and_then(|p| label_parser(&p)));
                self.collect_errors(node);
            }
            SyntaxKind::JSON_EXPRESSION_PARSER => {
                self.push(query, JsonExpressionParser::cast(node.clone()).map(|p| json_parser(&p)));
                self.collect_errors(node);
            }
            SyntaxKind::LABEL_FILTER => {
                if let Some(filter) = LabelFilter::cast(node.clone()) {
                    self.label_filter(&filter, query);
                }
                self.collect_errors(node);
            }
            SyntaxKind::LINE_FORMAT_EXPR => {
                self.push(query, LineFormatExpr::cast(node.clone()).map(|e| line_format(&e)));
                self.collect_errors(node);
            }
            SyntaxKind::LABEL_FORMAT_MATCHER => {
                self.push(query, LabelFormatMatcher::cast(node.clone()).map(|m| label_format(&m)));
                self.collect_errors(node);
            }
            SyntaxKind::UNWRAP_EXPR => {
                self.push(query, UnwrapExpr::cast(node.clone()).map(|u| unwrap(&u)));
                self.collect_errors(node);
            }
            SyntaxKind::DECOLORIZE_EXPR => {
                query.operations.push(Operation::bare(operation_id::DECOLORIZE));
            }
            SyntaxKind::DROP_LABELS_EXPR => {
                if let Some(drop) = DropLabelsExpr::cast(node.clone()) {
                    query.operations.push(labels_operation(operation_id::DROP, drop.items()));
                }
                self.collect_errors(node);
            }
            SyntaxKind::KEEP_LABELS_EXPR => {
                if let Some(keep) = KeepLabelsExpr::cast(node.clone()) {
                    query.operations.push(labels_operation(operation_id::KEEP, keep.items()));
                }
                self.collect_errors(node);
            }
            SyntaxKind::RANGE_AGGREGATION_EXPR => {
                if let Some(agg) = RangeAggregationExpr::cast(node.clone()) {
                    self.range_aggregation(&agg, query);
                }
            }
            SyntaxKind::VECTOR_AGGREGATION_EXPR => {
                if let Some(agg) = VectorAggregationExpr::cast(node.clone()) {
                    self.vector_aggregation(&agg, query);
                }
            }
            SyntaxKind::BIN_OP_EXPR => {
                if let Some(bin) = BinOpExpr::cast(node.clone()) {
                    self.binary(&bin, query);
                }
            }
            SyntaxKind::ERROR => {
                if !is_range_error(node) {
                    self.errors.push(make_error(node));
                }
            }
            _ => {
                for child in node.children() {
                    self.visit(&child, query);
                }
            }
        }
    }

    fn push(&mut self, query: &mut VisualQuery, operation: Option<Operation>) {
        if let Some(operation) = operation {
            query.operations.push(operation);
        }
    }

    /// Record every error node below `node`
    fn collect_errors(&mut self, node: &SyntaxNode) {
        let errors = node
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::ERROR && !is_range_error(n))
            .map(|n| make_error(&n));
        self.errors.extend(errors);
    }

    fn label_filter(&mut self, filter: &LabelFilter, query: &mut VisualQuery) {
        if filter.connective().is_some() {
            let mut error = make_error(filter.syntax());
            error.text = format!("{COMBINED_LABEL_FILTER}: {}", error.text);
            self.errors.push(error);
            return;
        }
        if let Some(inner) = filter.parenthesized() {
            self.label_filter(&inner, query);
            return;
        }

        let operation = match filter.leaf() {
            Some(LabelFilterLeaf::Matcher(matcher)) => {
                let label = text(matcher.label());
                let op = text(matcher.op());
                let value = unquote(&text(matcher.value()));
                if label == "__error__" && op == "=" && value.is_empty() {
                    Operation::bare(operation_id::LABEL_FILTER_NO_ERRORS)
                } else {
                    Operation::new(operation_id::LABEL_FILTER, [label, op, value])
                }
            }
            Some(LabelFilterLeaf::Ip(ip)) => Operation::new(
                operation_id::LABEL_FILTER,
                [
                    text(ip.label()),
                    text(ip.op()),
                    "ip".to_string(),
                    unquote(&text(ip.value())),
                ],
            ),
            Some(
                LabelFilterLeaf::Number(f) | LabelFilterLeaf::Duration(f) | LabelFilterLeaf::Bytes(f),
            ) => Operation::new(
                operation_id::LABEL_FILTER,
                [text(f.label()), text(f.op()), text(f.value())],
            ),
            None => return,
        };
        query.operations.push(operation);
    }

    fn range_aggregation(&mut self, agg: &RangeAggregationExpr, query: &mut VisualQuery) {
        let mut params = Vec::new();
        if let Some(number) = agg.param() {
            params.push(text(Some(number)));
        }
        if let Some(range) = agg.log_range().and_then(|l| l.range()) {
            params.push(unmask_placeholders(&range.duration_text()));
        }

        for child in agg.syntax().children() {
            if child.kind() == SyntaxKind::LOG_RANGE_EXPR {
                self.visit(&child, query);
            } else {
                self.collect_errors(&child);
            }
        }

        if let Some(op) = agg.op() {
            query.operations.push(Operation::new(op.text(), params));
        }
    }

    fn vector_aggregation(&mut self, agg: &VectorAggregationExpr, query: &mut VisualQuery) {
        let mut id = text(agg.op());
        let mut params = Vec::new();
        if let Some(number) = agg.param() {
            params.push(text(Some(number)));
        }
        if let Some(grouping) = agg.grouping() {
            match grouping.keyword().map(|k| k.kind()) {
                Some(SyntaxKind::BY_KW) => id = format!("__{id}_by"),
                Some(SyntaxKind::WITHOUT_KW) => id = format!("__{id}_without"),
                _ => {}
            }
            if let Some(labels) = grouping.labels() {
                params.extend(labels.names().map(|t| text(Some(t))));
            }
        }

        for child in agg.syntax().children() {
            if child.kind() == SyntaxKind::METRIC_EXPR {
                self.visit(&child, query);
            } else {
                self.collect_errors(&child);
            }
        }

        query.operations.push(Operation::new(id, params));
    }

    /// A numeric right operand becomes an operation on the current query;
    /// any other right operand becomes a separate binary query.
    fn binary(&mut self, bin: &BinOpExpr, query: &mut VisualQuery) {
        for child in bin.syntax().children() {
            if child.kind() != SyntaxKind::METRIC_EXPR {
                self.collect_errors(&child);
            }
        }

        let (Some(lhs), Some(op)) = (bin.lhs(), bin.op()) else {
            return;
        };
        let operator = op.text();
        let is_bool = bin.bool_modifier().is_some();

        // a leading number has no query to attach to
        if literal(&lhs).is_none() {
            self.visit(lhs.syntax(), query);
        }

        let Some(rhs) = bin.rhs() else {
            return;
        };
        let scalar = operation_id::binary_scalar_for_operator(operator);

        if let (Some(scalar), Some(number)) = (scalar, literal(&rhs)) {
            query.operations.push(binary_scalar(scalar, number, is_bool));
            return;
        }

        if matches!(rhs.kind(), Some(MetricKind::BinOp(_))) {
            // `a + 1 * 2` nests the number under the right operand
            if let (Some(scalar), Some(number)) = (scalar, leftmost_literal(&rhs)) {
                query.operations.push(binary_scalar(scalar, number, is_bool));
            }
            self.visit(rhs.syntax(), query);
            return;
        }

        let modifier = bin.on_or_ignoring();
        let vector_matches_type = modifier
            .as_ref()
            .and_then(|m| m.keyword())
            .map(|k| match k.kind() {
                SyntaxKind::ON_KW => VectorMatchesType::On,
                _ => VectorMatchesType::Ignoring,
            });
        let vector_matches = modifier.and_then(|m| m.labels()).map(|labels| {
            labels
                .names()
                .map(|t| text(Some(t)))
                .collect::<Vec<_>>()
                .join(", ")
        });

        let mut operand = BinaryOperand {
            operator: operator.into(),
            vector_matches_type,
            vector_matches,
            query: VisualQuery::default(),
        };
        self.visit(rhs.syntax(), &mut operand.query);
        query.push_binary(operand);
    }
}

// =============================================================================
// Node extraction
// =============================================================================

fn label_matcher(matcher: &Matcher) -> Option<LabelMatcher> {
    let label = text(Some(matcher.label()?));
    let operator = MatchOperator::from_token(matcher.op()?.text())?;
    let value = unquote(&text(matcher.value()));
    Some(LabelMatcher::new(label, operator, value))
}

fn line_filter(filter: &LineFilter) -> Option<Operation> {
    let op = filter.op()?;
    let value = unquote(&text(filter.value()));
    if filter.is_ip() {
        return Some(Operation::new(
            operation_id::LINE_FILTER_IP_MATCHES,
            [op.text().to_string(), value],
        ));
    }

    let id = match op.kind() {
        SyntaxKind::PIPE_EQ => operation_id::LINE_CONTAINS,
        SyntaxKind::BANG_EQ => operation_id::LINE_CONTAINS_NOT,
        SyntaxKind::PIPE_TILDE => operation_id::LINE_MATCHES_REGEX,
        SyntaxKind::BANG_TILDE => operation_id::LINE_MATCHES_REGEX_NOT,
        _ => return None,
    };
    Some(Operation::new(id, [value]))
}

fn label_parser(parser: &LabelParser) -> Option<Operation> {
    let keyword = parser.keyword()?;
    let params: Vec<String> = parser
        .value()
        .map(|value| unquote(&text(Some(value))))
        .into_iter()
        .collect();
    Some(Operation::new(keyword.text(), params))
}

fn json_parser(parser: &JsonExpressionParser) -> Operation {
    let params = parser
        .extractions()
        .map(|e| format!("{}={}", text(e.label()), text(e.value())));
    Operation::new(operation_id::JSON, params)
}

fn line_format(expr: &LineFormatExpr) -> Operation {
    Operation::new(operation_id::LINE_FORMAT, [unquote(&text(expr.value()))])
}

fn label_format(matcher: &LabelFormatMatcher) -> Operation {
    let target = match matcher.target() {
        Some(token) if token.kind() == SyntaxKind::STRING => unquote(&text(Some(token))),
        other => text(other),
    };
    Operation::new(
        operation_id::LABEL_FORMAT,
        [text(matcher.label()), text(matcher.op()), target],
    )
}

fn unwrap(expr: &UnwrapExpr) -> Operation {
    Operation::new(
        operation_id::UNWRAP,
        [text(expr.label()), text(expr.conversion())],
    )
}

fn labels_operation(id: &str, items: impl Iterator<Item = LabelsItem>) -> Operation {
    let params = items.map(|item| match item {
        LabelsItem::Name(token) => text(Some(token)),
        LabelsItem::Matcher(matcher) => format!(
            "{}{}{}",
            text(matcher.label()),
            text(matcher.op()),
            text(matcher.value())
        ),
    });
    Operation::new(id, params)
}

fn binary_scalar((id, comparison): (&str, bool), number: String, is_bool: bool) -> Operation {
    let mut params = vec![number];
    if comparison && is_bool {
        params.push("bool".to_string());
    }
    Operation::new(id, params)
}

/// The number of a literal operand, with its sign
fn literal(expr: &MetricExpr) -> Option<String> {
    match expr.kind()? {
        MetricKind::Literal(literal) => Some(literal.value()),
        _ => None,
    }
}

fn leftmost_literal(expr: &MetricExpr) -> Option<String> {
    let mut current = expr.clone();
    loop {
        match current.kind()? {
            MetricKind::BinOp(bin) => current = bin.lhs()?,
            MetricKind::Literal(literal) => return Some(literal.value()),
            _ => return None,
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Unmasked text of a token, empty when missing
fn text(token: Option<SyntaxToken>) -> String {
    token
        .map(|t| unmask_placeholders(t.text()))
        .unwrap_or_default()
}

/// Strip the quotes of a string literal.
///
/// Double-quoted strings also lose their `\"` and `\\` escapes; backticks
/// are removed as-is.
fn unquote(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        raw[1..raw.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    } else {
        raw.replace('`', "")
    }
}

/// Interval placeholders inside `[...]` are not durations; ignore them
fn is_range_error(node: &SyntaxNode) -> bool {
    node.parent()
        .is_some_and(|parent| parent.kind() == SyntaxKind::RANGE)
}

fn make_error(node: &SyntaxNode) -> ParsingError {
    let range = node.text_range();
    ParsingError {
        text: unmask_placeholders(&node.text().to_string()),
        from: range.start().into(),
        to: range.end().into(),
        parent_type: node.parent().map(|p| kind_to_name(p.kind()).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(expr: &str) -> Vec<(String, Vec<String>)> {
        build(expr)
            .query
            .operations
            .into_iter()
            .map(|op| (op.id.to_string(), op.params))
            .collect()
    }

    fn op(id: &str, params: &[&str]) -> (String, Vec<String>) {
        (
            id.to_string(),
            params.iter().map(|p| p.to_string()).collect(),
        )
    }

    #[test]
    fn test_build_selector() {
        let result = build(r#"{job="api", env=~"prod|dev", path!="/a\"b"}"#);
        assert!(result.errors.is_empty());
        assert_eq!(
            result.query.labels,
            vec![
                LabelMatcher::new("job", MatchOperator::Equal, "api"),
                LabelMatcher::new("env", MatchOperator::Regex, "prod|dev"),
                LabelMatcher::new("path", MatchOperator::NotEqual, "/a\"b"),
            ]
        );
    }

    #[test]
    fn test_build_line_filters() {
        assert_eq!(
            ops(r#"{a="b"} |= "x" != `y` |~ "z.*" !~ "w" |= ip("10.0.0.0/8")"#),
            vec![
                op(operation_id::LINE_CONTAINS, &["x"]),
                op(operation_id::LINE_CONTAINS_NOT, &["y"]),
                op(operation_id::LINE_MATCHES_REGEX, &["z.*"]),
                op(operation_id::LINE_MATCHES_REGEX_NOT, &["w"]),
                op(operation_id::LINE_FILTER_IP_MATCHES, &["|=", "10.0.0.0/8"]),
            ]
        );
    }

    #[test]
    fn test_build_parsers() {
        assert_eq!(
            ops(r#"{a="b"} | json | logfmt | regexp "(?P<x>\\w+)" | pattern `<_> <x>` | unpack"#),
            vec![
                op("json", &[]),
                op("logfmt", &[]),
                op("regexp", &[r"(?P<x>\w+)"]),
                op("pattern", &["<_> <x>"]),
                op("unpack", &[]),
            ]
        );
    }

    #[test]
    fn test_build_json_expressions() {
        assert_eq!(
            ops(r#"{a="b"} | json first="a.b", second="c[0]""#),
            vec![op("json", &[r#"first="a.b""#, r#"second="c[0]""#])]
        );
    }

    #[test]
    fn test_build_label_filters() {
        assert_eq!(
            ops(r#"{a="b"} | level="error" | latency >= 250ms | size < 1KB | n == 3 | addr = ip("10.0.0.1")"#),
            vec![
                op(operation_id::LABEL_FILTER, &["level", "=", "error"]),
                op(operation_id::LABEL_FILTER, &["latency", ">=", "250ms"]),
                op(operation_id::LABEL_FILTER, &["size", "<", "1KB"]),
                op(operation_id::LABEL_FILTER, &["n", "==", "3"]),
                op(operation_id::LABEL_FILTER, &["addr", "=", "ip", "10.0.0.1"]),
            ]
        );
    }

    #[test]
    fn test_build_no_errors_idiom() {
        let result = build(r#"{}|__error__="""#);
        assert_eq!(
            result.query.operations,
            vec![Operation::bare(operation_id::LABEL_FILTER_NO_ERRORS)]
        );
    }

    #[test]
    fn test_build_error_filter_with_value_is_plain_filter() {
        assert_eq!(
            ops(r#"{a="b"} | __error__="JSONParserErr""#),
            vec![op(
                operation_id::LABEL_FILTER,
                &["__error__", "=", "JSONParserErr"]
            )]
        );
    }

    #[test]
    fn test_build_combined_label_filter_is_reported() {
        let result = build(r#"{a="b"} | x="1" or y="2""#);
        assert!(result.query.operations.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].text.starts_with(COMBINED_LABEL_FILTER));
        assert_eq!(result.errors[0].parent_type.as_deref(), Some("PipelineStage"));
    }

    #[test]
    fn test_build_format_stages() {
        assert_eq!(
            ops(r#"{a="b"} | line_format "{{.msg}}" | label_format dst=src, tpl="{{.x}}" | decolorize | drop a, b="c" | keep d"#),
            vec![
                op(operation_id::LINE_FORMAT, &["{{.msg}}"]),
                op(operation_id::LABEL_FORMAT, &["dst", "=", "src"]),
                op(operation_id::LABEL_FORMAT, &["tpl", "=", "{{.x}}"]),
                op(operation_id::DECOLORIZE, &[]),
                op(operation_id::DROP, &["a", r#"b="c""#]),
                op(operation_id::KEEP, &["d"]),
            ]
        );
    }

    #[test]
    fn test_build_range_aggregation() {
        let result = build(r#"quantile_over_time(0.99, {a="b"} | json | unwrap duration(latency) [$__interval])"#);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.query.labels.len(), 1);
        assert_eq!(
            result
                .query
                .operations
                .iter()
                .map(|o| (o.id.as_str(), o.params.clone()))
                .collect::<Vec<_>>(),
            vec![
                ("json", vec![]),
                ("unwrap", vec!["latency".to_string(), "duration".to_string()]),
                (
                    "quantile_over_time",
                    vec!["0.99".to_string(), "$__interval".to_string()]
                ),
            ]
        );
    }

    #[test]
    fn test_build_vector_aggregation_with_grouping() {
        assert_eq!(
            ops(r#"sum by (job, env) (rate({a="b"}[5m]))"#),
            vec![
                op("rate", &["5m"]),
                op("__sum_by", &["job", "env"]),
            ]
        );
        assert_eq!(
            ops(r#"topk(5, count_over_time({a="b"}[1h])) without (pod)"#),
            vec![
                op("count_over_time", &["1h"]),
                op("__topk_without", &["5", "pod"]),
            ]
        );
    }

    #[test]
    fn test_build_binary_scalar_operations() {
        assert_eq!(
            ops(r#"rate({a="b"}[5m]) * 100 > bool 0.5"#),
            vec![
                op("rate", &["5m"]),
                op(operation_id::MULTIPLY_BY, &["100"]),
                op(operation_id::GREATER_THAN, &["0.5", "bool"]),
            ]
        );
    }

    #[test]
    fn test_build_binary_right_nested_number() {
        assert_eq!(
            ops(r#"rate({a="b"}[5m]) + 1 * 2"#),
            vec![
                op("rate", &["5m"]),
                op(operation_id::ADDITION, &["1"]),
                op(operation_id::MULTIPLY_BY, &["2"]),
            ]
        );
    }

    #[test]
    fn test_build_binary_query_operand() {
        let result = build(r#"rate({a="b"}[5m]) / ignoring (pod) rate({c="d"}[5m])"#);
        let binary = result.query.binary_queries.expect("binary queries");
        assert_eq!(binary.len(), 1);
        assert_eq!(binary[0].operator, "/");
        assert_eq!(binary[0].vector_matches_type, Some(VectorMatchesType::Ignoring));
        assert_eq!(binary[0].vector_matches.as_deref(), Some("pod"));
        assert_eq!(binary[0].query.labels[0].label, "c");
        assert_eq!(result.query.labels[0].label, "a");
    }

    #[test]
    fn test_build_unmasks_extracted_strings() {
        let result = build(r#"{job="$job", env=~"${env:regex}"} |= "[[search]]""#);
        assert!(result.errors.is_empty());
        assert_eq!(result.query.labels[0].value, "$job");
        assert_eq!(result.query.labels[1].value, "${env:regex}");
        assert_eq!(result.query.operations[0].params, ["[[search]]"]);
    }

    #[test]
    fn test_build_reports_malformed_matcher() {
        let result = build(r#"{job="api", env=}"#);
        assert_eq!(result.query.labels.len(), 2);
        assert!(!result.errors.is_empty());
        assert_eq!(result.errors[0].parent_type.as_deref(), Some("Matcher"));
    }

    #[test]
    fn test_build_empty_query_has_no_errors() {
        let result = build("");
        assert!(result.query.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_build_skips_unknown_stage_but_keeps_going() {
        let result = build(r#"{a="b"} | 123 | json"#);
        assert_eq!(result.query.operations, vec![Operation::bare("json")]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].text, "123");
    }
}
