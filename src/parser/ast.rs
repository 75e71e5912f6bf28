//! Typed AST wrappers over the untyped rowan CST.
//!
//! Each struct wraps a SyntaxNode and provides methods to access children.
//! Accessors return `None` for missing pieces instead of failing, so they
//! are safe to use on trees produced from malformed input.

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

// ============================================================================
// Helper macros and functions
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

/// Significant (non-trivia) tokens that are direct children of `node`
fn tokens(node: &SyntaxNode) -> impl Iterator<Item = SyntaxToken> + '_ {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia())
}

fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    tokens(node).find(|t| t.kind() == kind)
}

fn token_where(node: &SyntaxNode, pred: impl Fn(SyntaxKind) -> bool) -> Option<SyntaxToken> {
    tokens(node).find(|t| pred(t.kind()))
}

fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
    node.children().find_map(N::cast)
}

fn children<N: AstNode>(node: &SyntaxNode) -> impl Iterator<Item = N> + use<N> {
    node.children().filter_map(N::cast)
}

// ============================================================================
// Root
// ============================================================================

ast_node!(Root, ROOT);

impl Root {
    pub fn expr(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

/// The single top-level expression of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Log(LogExpr),
    Metric(MetricExpr),
}

impl AstNode for Expr {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::LOG_EXPR | SyntaxKind::METRIC_EXPR)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::LOG_EXPR => Some(Self::Log(LogExpr(node))),
            SyntaxKind::METRIC_EXPR => Some(Self::Metric(MetricExpr(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Log(n) => n.syntax(),
            Self::Metric(n) => n.syntax(),
        }
    }
}

// ============================================================================
// Log expressions
// ============================================================================

ast_node!(LogExpr, LOG_EXPR);

impl LogExpr {
    pub fn selector(&self) -> Option<Selector> {
        child(&self.0)
    }

    pub fn pipeline(&self) -> Option<PipelineExpr> {
        child(&self.0)
    }

    /// The wrapped expression of `( LogExpr )`
    pub fn inner(&self) -> Option<LogExpr> {
        child(&self.0)
    }
}

ast_node!(Selector, SELECTOR);

impl Selector {
    pub fn matchers(&self) -> impl Iterator<Item = Matcher> + '_ {
        children(&self.0)
    }
}

ast_node!(Matcher, MATCHER);

impl Matcher {
    pub fn label(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn op(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_matcher_op)
    }

    pub fn value(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }
}

ast_node!(PipelineExpr, PIPELINE_EXPR);

/// One element of a pipeline, in document order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PipelineItem {
    LineFilter(LineFilter),
    Stage(PipelineStage),
    Comment(SyntaxToken),
}

impl PipelineExpr {
    pub fn items(&self) -> impl Iterator<Item = PipelineItem> + '_ {
        self.0.children_with_tokens().filter_map(|element| {
            match element {
                rowan::NodeOrToken::Node(node) => match node.kind() {
                    SyntaxKind::LINE_FILTER => Some(PipelineItem::LineFilter(LineFilter(node))),
                    SyntaxKind::PIPELINE_STAGE => Some(PipelineItem::Stage(PipelineStage(node))),
                    _ => None,
                },
                rowan::NodeOrToken::Token(token) if token.kind() == SyntaxKind::LINE_COMMENT => {
                    Some(PipelineItem::Comment(token))
                }
                rowan::NodeOrToken::Token(_) => None,
            }
        })
    }
}

ast_node!(LineFilter, LINE_FILTER);

impl LineFilter {
    pub fn op(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_line_filter_op)
    }

    pub fn value(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }

    /// `|= ip("10.0.0.0/8")`
    pub fn is_ip(&self) -> bool {
        token(&self.0, SyntaxKind::IP_KW).is_some()
    }
}

ast_node!(PipelineStage, PIPELINE_STAGE);

/// The body of a `| ...` stage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    LabelParser(LabelParser),
    JsonExpressionParser(JsonExpressionParser),
    LabelFilter(LabelFilter),
    LineFormat(LineFormatExpr),
    LabelFormat(LabelFormatExpr),
    Decolorize(DecolorizeExpr),
    DropLabels(DropLabelsExpr),
    KeepLabels(KeepLabelsExpr),
}

impl AstNode for Stage {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::LABEL_PARSER
                | SyntaxKind::JSON_EXPRESSION_PARSER
                | SyntaxKind::LABEL_FILTER
                | SyntaxKind::LINE_FORMAT_EXPR
                | SyntaxKind::LABEL_FORMAT_EXPR
                | SyntaxKind::DECOLORIZE_EXPR
                | SyntaxKind::DROP_LABELS_EXPR
                | SyntaxKind::KEEP_LABELS_EXPR
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::LABEL_PARSER => Some(Self::LabelParser(LabelParser(node))),
            SyntaxKind::JSON_EXPRESSION_PARSER => {
                Some(Self::JsonExpressionParser(JsonExpressionParser(node)))
            }
            SyntaxKind::LABEL_FILTER => Some(Self::LabelFilter(LabelFilter(node))),
            SyntaxKind::LINE_FORMAT_EXPR => Some(Self::LineFormat(LineFormatExpr(node))),
            SyntaxKind::LABEL_FORMAT_EXPR => Some(Self::LabelFormat(LabelFormatExpr(node))),
            SyntaxKind::DECOLORIZE_EXPR => Some(Self::Decolorize(DecolorizeExpr(node))),
            SyntaxKind::DROP_LABELS_EXPR => Some(Self::DropLabels(DropLabelsExpr(node))),
            SyntaxKind::KEEP_LABELS_EXPR => Some(Self::KeepLabels(KeepLabelsExpr(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::LabelParser(n) => n.syntax(),
            Self::JsonExpressionParser(n) => n.syntax(),
            Self::LabelFilter(n) => n.syntax(),
            Self::LineFormat(n) => n.syntax(),
            Self::LabelFormat(n) => n.syntax(),
            Self::Decolorize(n) => n.syntax(),
            Self::DropLabels(n) => n.syntax(),
            Self::KeepLabels(n) => n.syntax(),
        }
    }
}

impl PipelineStage {
    pub fn stage(&self) -> Option<Stage> {
        child(&self.0)
    }
}

ast_node!(LabelParser, LABEL_PARSER);

impl LabelParser {
    /// The parser keyword: json, logfmt, unpack, regexp or pattern
    pub fn keyword(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_keyword)
    }

    /// The expression of `regexp` / `pattern`
    pub fn value(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }
}

ast_node!(JsonExpressionParser, JSON_EXPRESSION_PARSER);

impl JsonExpressionParser {
    pub fn extractions(&self) -> impl Iterator<Item = LabelExtractionExpr> + '_ {
        children(&self.0)
    }
}

ast_node!(LabelExtractionExpr, LABEL_EXTRACTION_EXPR);

impl LabelExtractionExpr {
    pub fn label(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn value(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }
}

ast_node!(LabelFilter, LABEL_FILTER);

/// A single comparison inside a label filter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabelFilterLeaf {
    Matcher(Matcher),
    Ip(IpLabelFilter),
    Number(ComparisonFilter),
    Duration(ComparisonFilter),
    Bytes(ComparisonFilter),
}

impl LabelFilter {
    /// Left and right operands of `a and b`, `a or b`, `a, b`
    pub fn operands(&self) -> Option<(LabelFilter, LabelFilter)> {
        if self.connective().is_none() {
            return None;
        }
        let mut filters = children::<LabelFilter>(&self.0);
        Some((filters.next()?, filters.next()?))
    }

    /// `and`, `or` or `,` between two operands
    pub fn connective(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|t| {
            matches!(
                t.kind(),
                SyntaxKind::AND_KW | SyntaxKind::OR_KW | SyntaxKind::COMMA
            )
        })
    }

    /// The filter inside `( ... )`
    pub fn parenthesized(&self) -> Option<LabelFilter> {
        token(&self.0, SyntaxKind::L_PAREN)?;
        child(&self.0)
    }

    pub fn leaf(&self) -> Option<LabelFilterLeaf> {
        self.0.children().find_map(|node| match node.kind() {
            SyntaxKind::MATCHER => Some(LabelFilterLeaf::Matcher(Matcher(node))),
            SyntaxKind::IP_LABEL_FILTER => Some(LabelFilterLeaf::Ip(IpLabelFilter(node))),
            SyntaxKind::NUMBER_FILTER => Some(LabelFilterLeaf::Number(ComparisonFilter(node))),
            SyntaxKind::UNIT_FILTER => node.children().find_map(|unit| match unit.kind() {
                SyntaxKind::DURATION_FILTER => {
                    Some(LabelFilterLeaf::Duration(ComparisonFilter(unit)))
                }
                SyntaxKind::BYTES_FILTER => Some(LabelFilterLeaf::Bytes(ComparisonFilter(unit))),
                _ => None,
            }),
            _ => None,
        })
    }
}

ast_node!(IpLabelFilter, IP_LABEL_FILTER);

impl IpLabelFilter {
    pub fn label(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn op(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| matches!(k, SyntaxKind::EQ | SyntaxKind::BANG_EQ))
    }

    pub fn value(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }
}

/// `label op value` where value is a number, duration or byte size
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonFilter(SyntaxNode);

impl AstNode for ComparisonFilter {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::NUMBER_FILTER | SyntaxKind::DURATION_FILTER | SyntaxKind::BYTES_FILTER
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        if Self::can_cast(node.kind()) {
            Some(Self(node))
        } else {
            None
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

impl ComparisonFilter {
    pub fn label(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn op(&self) -> Option<SyntaxToken> {
        token_where(&self.0, SyntaxKind::is_comparison_op)
    }

    pub fn value(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| {
            matches!(
                k,
                SyntaxKind::NUMBER | SyntaxKind::DURATION | SyntaxKind::BYTES
            )
        })
    }
}

ast_node!(LineFormatExpr, LINE_FORMAT_EXPR);

impl LineFormatExpr {
    pub fn value(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }
}

ast_node!(LabelFormatExpr, LABEL_FORMAT_EXPR);

impl LabelFormatExpr {
    pub fn matchers(&self) -> impl Iterator<Item = LabelFormatMatcher> + '_ {
        children(&self.0)
    }
}

ast_node!(LabelFormatMatcher, LABEL_FORMAT_MATCHER);

impl LabelFormatMatcher {
    pub fn label(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn op(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::EQ)
    }

    /// A template string or, for renames, the source label
    pub fn target(&self) -> Option<SyntaxToken> {
        tokens(&self.0)
            .filter(|t| matches!(t.kind(), SyntaxKind::STRING | SyntaxKind::IDENT))
            .nth(1)
            .or_else(|| token(&self.0, SyntaxKind::STRING))
    }
}

ast_node!(DecolorizeExpr, DECOLORIZE_EXPR);

ast_node!(DropLabelsExpr, DROP_LABELS_EXPR);
ast_node!(KeepLabelsExpr, KEEP_LABELS_EXPR);

/// A label name or `label op "value"` in `drop` / `keep`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabelsItem {
    Name(SyntaxToken),
    Matcher(Matcher),
}

fn labels_items(node: &SyntaxNode) -> impl Iterator<Item = LabelsItem> + '_ {
    node.children_with_tokens()
        .filter_map(|element| match element {
            rowan::NodeOrToken::Node(node) => Matcher::cast(node).map(LabelsItem::Matcher),
            rowan::NodeOrToken::Token(token) if token.kind() == SyntaxKind::IDENT => {
                Some(LabelsItem::Name(token))
            }
            rowan::NodeOrToken::Token(_) => None,
        })
}

impl DropLabelsExpr {
    pub fn items(&self) -> impl Iterator<Item = LabelsItem> + '_ {
        labels_items(&self.0)
    }
}

impl KeepLabelsExpr {
    pub fn items(&self) -> impl Iterator<Item = LabelsItem> + '_ {
        labels_items(&self.0)
    }
}

// ============================================================================
// Metric expressions
// ============================================================================

ast_node!(MetricExpr, METRIC_EXPR);

/// What a `METRIC_EXPR` node contains
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetricKind {
    RangeAggregation(RangeAggregationExpr),
    VectorAggregation(VectorAggregationExpr),
    BinOp(BinOpExpr),
    Literal(LiteralExpr),
    Vector(VectorExpr),
    Parens(MetricExpr),
}

impl MetricExpr {
    pub fn kind(&self) -> Option<MetricKind> {
        self.0.children().find_map(|node| match node.kind() {
            SyntaxKind::RANGE_AGGREGATION_EXPR => {
                Some(MetricKind::RangeAggregation(RangeAggregationExpr(node)))
            }
            SyntaxKind::VECTOR_AGGREGATION_EXPR => {
                Some(MetricKind::VectorAggregation(VectorAggregationExpr(node)))
            }
            SyntaxKind::BIN_OP_EXPR => Some(MetricKind::BinOp(BinOpExpr(node))),
            SyntaxKind::LITERAL_EXPR => Some(MetricKind::Literal(LiteralExpr(node))),
            SyntaxKind::VECTOR_EXPR => Some(MetricKind::Vector(VectorExpr(node))),
            SyntaxKind::METRIC_EXPR => Some(MetricKind::Parens(MetricExpr(node))),
            _ => None,
        })
    }
}

ast_node!(RangeAggregationExpr, RANGE_AGGREGATION_EXPR);

impl RangeAggregationExpr {
    pub fn op(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::RANGE_OP)
    }

    /// Numeric parameter of `quantile_over_time(0.99, ...)`
    pub fn param(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::NUMBER)
    }

    pub fn log_range(&self) -> Option<LogRangeExpr> {
        child(&self.0)
    }

    pub fn grouping(&self) -> Option<Grouping> {
        child(&self.0)
    }
}

ast_node!(LogRangeExpr, LOG_RANGE_EXPR);

impl LogRangeExpr {
    pub fn selector(&self) -> Option<Selector> {
        child(&self.0)
    }

    /// Pipelines in document order: before and after `| unwrap`
    pub fn pipelines(&self) -> impl Iterator<Item = PipelineExpr> + '_ {
        children(&self.0)
    }

    pub fn unwrap(&self) -> Option<UnwrapExpr> {
        child(&self.0)
    }

    pub fn range(&self) -> Option<Range> {
        child(&self.0)
    }

    pub fn offset(&self) -> Option<OffsetExpr> {
        child(&self.0)
    }
}

ast_node!(Range, RANGE);

impl Range {
    /// The text between `[` and `]`, trimmed
    pub fn duration_text(&self) -> String {
        let text = self.0.text().to_string();
        let inner = text.trim_start_matches('[');
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        inner.trim().to_string()
    }
}

ast_node!(OffsetExpr, OFFSET_EXPR);

impl OffsetExpr {
    pub fn duration(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::DURATION)
    }
}

ast_node!(UnwrapExpr, UNWRAP_EXPR);

impl UnwrapExpr {
    pub fn label(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    pub fn conversion(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::CONVERSION_FN)
    }
}

ast_node!(VectorAggregationExpr, VECTOR_AGGREGATION_EXPR);

impl VectorAggregationExpr {
    pub fn op(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::VECTOR_OP)
    }

    /// Numeric parameter of `topk(5, ...)`
    pub fn param(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::NUMBER)
    }

    pub fn metric(&self) -> Option<MetricExpr> {
        child(&self.0)
    }

    pub fn grouping(&self) -> Option<Grouping> {
        child(&self.0)
    }
}

ast_node!(Grouping, GROUPING);

impl Grouping {
    /// `by` or `without`
    pub fn keyword(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| matches!(k, SyntaxKind::BY_KW | SyntaxKind::WITHOUT_KW))
    }

    pub fn labels(&self) -> Option<Labels> {
        child(&self.0)
    }
}

ast_node!(Labels, LABELS);

impl Labels {
    pub fn names(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        tokens(&self.0).filter(|t| t.kind() == SyntaxKind::IDENT)
    }
}

ast_node!(BinOpExpr, BIN_OP_EXPR);

impl BinOpExpr {
    pub fn lhs(&self) -> Option<MetricExpr> {
        children(&self.0).next()
    }

    pub fn rhs(&self) -> Option<MetricExpr> {
        children(&self.0).nth(1)
    }

    pub fn op(&self) -> Option<SyntaxToken> {
        tokens(&self.0).find(|t| {
            t.kind().is_punct()
                || matches!(
                    t.kind(),
                    SyntaxKind::AND_KW | SyntaxKind::OR_KW | SyntaxKind::UNLESS_KW
                )
        })
    }

    pub fn bool_modifier(&self) -> Option<BoolModifier> {
        child(&self.0)
    }

    pub fn on_or_ignoring(&self) -> Option<OnOrIgnoringModifier> {
        child(&self.0)
    }
}

ast_node!(BoolModifier, BOOL_MODIFIER);

ast_node!(OnOrIgnoringModifier, ON_OR_IGNORING_MODIFIER);

impl OnOrIgnoringModifier {
    /// `on` or `ignoring`
    pub fn keyword(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| matches!(k, SyntaxKind::ON_KW | SyntaxKind::IGNORING_KW))
    }

    pub fn labels(&self) -> Option<Labels> {
        children(&self.0).next()
    }

    /// `group_left` or `group_right`
    pub fn group(&self) -> Option<SyntaxToken> {
        token_where(&self.0, |k| {
            matches!(k, SyntaxKind::GROUP_LEFT_KW | SyntaxKind::GROUP_RIGHT_KW)
        })
    }

    pub fn group_labels(&self) -> Option<Labels> {
        children(&self.0).nth(1)
    }
}

ast_node!(LiteralExpr, LITERAL_EXPR);

impl LiteralExpr {
    /// The number with its sign, if any
    pub fn value(&self) -> String {
        tokens(&self.0).map(|t| t.text().to_string()).collect()
    }
}

ast_node!(VectorExpr, VECTOR_EXPR);

impl VectorExpr {
    pub fn value(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::NUMBER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn root(input: &str) -> Root {
        Root::cast(parse(input).syntax()).unwrap()
    }

    fn log_expr(input: &str) -> LogExpr {
        match root(input).expr() {
            Some(Expr::Log(expr)) => expr,
            other => panic!("expected log expression, got {other:?}"),
        }
    }

    fn metric_expr(input: &str) -> MetricExpr {
        match root(input).expr() {
            Some(Expr::Metric(expr)) => expr,
            other => panic!("expected metric expression, got {other:?}"),
        }
    }

    #[test]
    fn test_selector_matchers() {
        let expr = log_expr(r#"{job="api", env!~"dev|test"}"#);
        let matchers: Vec<_> = expr.selector().unwrap().matchers().collect();
        assert_eq!(matchers.len(), 2);
        assert_eq!(matchers[1].label().unwrap().text(), "env");
        assert_eq!(matchers[1].op().unwrap().text(), "!~");
        assert_eq!(matchers[1].value().unwrap().text(), r#""dev|test""#);
    }

    #[test]
    fn test_pipeline_items_keep_document_order() {
        let expr = log_expr("{a=\"b\"} |= \"x\"\n# note\n| json | level=\"error\"");
        let items: Vec<_> = expr.pipeline().unwrap().items().collect();
        assert_eq!(items.len(), 4);
        assert!(matches!(items[0], PipelineItem::LineFilter(_)));
        assert!(matches!(&items[1], PipelineItem::Comment(t) if t.text() == "# note"));
        let PipelineItem::Stage(parser) = &items[2] else {
            panic!("expected stage");
        };
        assert!(matches!(parser.stage(), Some(Stage::LabelParser(_))));
        let PipelineItem::Stage(filter) = &items[3] else {
            panic!("expected stage");
        };
        assert!(matches!(filter.stage(), Some(Stage::LabelFilter(_))));
    }

    #[test]
    fn test_label_filter_leaves() {
        let expr = log_expr(r#"{a="b"} | latency > 250ms | size <= 1KB | n == 3 | addr = ip("10.0.0.1")"#);
        let leaves: Vec<_> = expr
            .pipeline()
            .unwrap()
            .items()
            .filter_map(|item| match item {
                PipelineItem::Stage(stage) => match stage.stage() {
                    Some(Stage::LabelFilter(filter)) => filter.leaf(),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert!(matches!(&leaves[0], LabelFilterLeaf::Duration(f) if f.value().unwrap().text() == "250ms"));
        assert!(matches!(&leaves[1], LabelFilterLeaf::Bytes(f) if f.op().unwrap().text() == "<="));
        assert!(matches!(&leaves[2], LabelFilterLeaf::Number(f) if f.label().unwrap().text() == "n"));
        assert!(matches!(&leaves[3], LabelFilterLeaf::Ip(f) if f.value().unwrap().text() == r#""10.0.0.1""#));
    }

    #[test]
    fn test_combined_label_filter_operands() {
        let expr = log_expr(r#"{a="b"} | x="1" or y="2""#);
        let PipelineItem::Stage(stage) = expr.pipeline().unwrap().items().next().unwrap() else {
            panic!("expected stage");
        };
        let Some(Stage::LabelFilter(filter)) = stage.stage() else {
            panic!("expected label filter");
        };
        assert_eq!(filter.connective().unwrap().text(), "or");
        let (left, right) = filter.operands().unwrap();
        assert!(left.leaf().is_some());
        assert!(right.leaf().is_some());
    }

    #[test]
    fn test_range_aggregation_parts() {
        let metric = metric_expr(r#"quantile_over_time(0.99, {a="b"} | unwrap duration(latency) [5m] offset 1h) by (job)"#);
        let Some(MetricKind::RangeAggregation(agg)) = metric.kind() else {
            panic!("expected range aggregation");
        };
        assert_eq!(agg.op().unwrap().text(), "quantile_over_time");
        assert_eq!(agg.param().unwrap().text(), "0.99");
        let range = agg.log_range().unwrap();
        assert_eq!(range.range().unwrap().duration_text(), "5m");
        assert_eq!(range.offset().unwrap().duration().unwrap().text(), "1h");
        let unwrap = range.unwrap().unwrap();
        assert_eq!(unwrap.conversion().unwrap().text(), "duration");
        assert_eq!(unwrap.label().unwrap().text(), "latency");
        let grouping = agg.grouping().unwrap();
        assert_eq!(grouping.keyword().unwrap().text(), "by");
        let labels: Vec<_> = grouping.labels().unwrap().names().map(|t| t.text().to_string()).collect();
        assert_eq!(labels, ["job"]);
    }

    #[test]
    fn test_binary_expression_precedence() {
        let metric = metric_expr(r#"rate({a="b"}[1m]) + 1 * 2"#);
        let Some(MetricKind::BinOp(bin)) = metric.kind() else {
            panic!("expected binary expression");
        };
        assert_eq!(bin.op().unwrap().text(), "+");
        assert!(matches!(bin.lhs().unwrap().kind(), Some(MetricKind::RangeAggregation(_))));
        assert!(matches!(bin.rhs().unwrap().kind(), Some(MetricKind::BinOp(_))));
    }

    #[test]
    fn test_children_iterator_does_not_borrow_the_parent() {
        let root = parse(r#"{a="1", b="2"}"#).syntax();
        let selector = root
            .descendants()
            .find(|n| n.kind() == SyntaxKind::SELECTOR)
            .unwrap();
        let matchers = children::<Matcher>(&selector);
        drop(selector);
        let labels: Vec<_> = matchers
            .map(|m| m.label().unwrap().text().to_string())
            .collect();
        assert_eq!(labels, ["a", "b"]);
    }

    #[test]
    fn test_binary_modifiers() {
        let metric = metric_expr(r#"rate({a="b"}[1m]) > bool on (job) group_left (env) rate({c="d"}[1m])"#);
        let Some(MetricKind::BinOp(bin)) = metric.kind() else {
            panic!("expected binary expression");
        };
        assert!(bin.bool_modifier().is_some());
        let modifier = bin.on_or_ignoring().unwrap();
        assert_eq!(modifier.keyword().unwrap().text(), "on");
        assert_eq!(modifier.group().unwrap().text(), "group_left");
        assert_eq!(modifier.group_labels().unwrap().names().count(), 1);
    }
}
