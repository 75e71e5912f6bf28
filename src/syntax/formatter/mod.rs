//! Canonical formatter for LogQL
//!
//! Rewrites a query into an indented, sorted form: selector matchers sorted
//! by label, one pipeline stage kind per line, aggregations broken over
//! several lines. Formatting works on the CST and is independent of the
//! visual query model.
//!
//! Queries that do not parse cleanly are returned unchanged. The only
//! tolerated errors are inside range brackets, where interval placeholders
//! such as `[$__interval]` are not durations.

mod options;

#[cfg(test)]
mod tests;

pub use options::FormatOptions;

use crate::parser::ast::{
    AstNode, BinOpExpr, Expr, Grouping, LabelFilter, LabelFilterLeaf, Labels, LabelsItem,
    LineFilter, LogExpr, LogRangeExpr, Matcher, MetricExpr, MetricKind, PipelineExpr,
    PipelineItem, PipelineStage, RangeAggregationExpr, Root, Selector, Stage, UnwrapExpr,
    VectorAggregationExpr,
};
use crate::parser::{Parse, SyntaxKind, SyntaxNode, SyntaxToken, parse};
use crate::template::{
    VariableRegistry, mask_placeholders, mask_variables, unmask_placeholders, unmask_variables,
};

/// Format a query with the default options
pub fn format(query: &str) -> String {
    format_with_options(query, &FormatOptions::default())
}

/// Format a query.
///
/// Returns the input unchanged when it is empty, has no stream selector,
/// does not parse, or has a comment outside a pipeline.
pub fn format_with_options(query: &str, options: &FormatOptions) -> String {
    let masked = mask_placeholders(query);
    let parse = parse(&masked);
    if !is_formattable(&masked, &parse) {
        tracing::debug!("query is not formattable, leaving it unchanged");
        return query.to_string();
    }

    let Some(expr) = Root::cast(parse.syntax()).and_then(|root| root.expr()) else {
        return query.to_string();
    };

    let formatter = Formatter { options };
    let formatted = match expr {
        Expr::Log(log) => formatter.log_expr(&log, 0),
        Expr::Metric(metric) => formatter.metric_expr(&metric, 0),
    };
    unmask_placeholders(&formatted)
}

/// Substitute known variables with their values, format, and turn the
/// values back into references
pub fn format_with_variables<R>(query: &str, registry: &R) -> String
where
    R: VariableRegistry + ?Sized,
{
    let (substituted, applied) = mask_variables(query, registry);
    let formatted = format(&substituted);
    unmask_variables(&formatted, &applied)
}

fn is_formattable(text: &str, parse: &Parse) -> bool {
    if text.trim().is_empty() {
        return false;
    }

    let root = parse.syntax();
    let ranges: Vec<_> = root
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::RANGE)
        .map(|n| n.text_range())
        .collect();

    let has_selector = root.descendants().any(|n| n.kind() == SyntaxKind::SELECTOR);
    let errors_in_ranges = parse
        .errors
        .iter()
        .all(|e| ranges.iter().any(|r| r.contains_range(e.range)));
    let error_nodes_in_ranges = root
        .descendants()
        .filter(|n| n.kind() == SyntaxKind::ERROR)
        .all(|n| n.parent().is_some_and(|p| p.kind() == SyntaxKind::RANGE));

    // only comments between pipeline stages have a place in the output
    let comments_in_pipelines = root
        .descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| t.kind() == SyntaxKind::LINE_COMMENT)
        .all(|t| t.parent().is_some_and(|p| p.kind() == SyntaxKind::PIPELINE_EXPR));

    has_selector && errors_in_ranges && error_nodes_in_ranges && comments_in_pipelines
}

// =============================================================================
// Pipeline folding
// =============================================================================

/// Kind of a pipeline line; consecutive stages of the same kind share a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageKind {
    LineFilter,
    LabelParser,
    JsonParser,
    LabelFilter,
    LineFormat,
    LabelFormat,
    Decolorize,
    DropLabels,
    KeepLabels,
    Unwrap,
    Comment,
}

/// Accumulator of the fold over pipeline stages
#[derive(Debug, Default)]
struct PipelineText {
    text: String,
    last: Option<StageKind>,
}

impl PipelineText {
    fn push(mut self, kind: StageKind, stage: &str, indent: &str) -> Self {
        if kind != StageKind::Comment && self.last == Some(kind) {
            self.text.push(' ');
        } else {
            self.text.push('\n');
            self.text.push_str(indent);
        }
        self.text.push_str(stage);
        self.last = Some(kind);
        self
    }
}

// =============================================================================
// Formatter
// =============================================================================

struct Formatter<'a> {
    options: &'a FormatOptions,
}

impl Formatter<'_> {
    fn indent(&self, level: usize) -> String {
        self.options.indent(level)
    }

    // -------------------------------------------------------------------------
    // Log expressions
    // -------------------------------------------------------------------------

    fn log_expr(&self, expr: &LogExpr, level: usize) -> String {
        if let Some(inner) = expr.inner() {
            return format!("({})", self.log_expr(&inner, level));
        }

        let mut out = expr.selector().map(|s| selector(&s)).unwrap_or_default();
        if let Some(pipeline) = expr.pipeline() {
            let stages = pipeline_stages(pipeline.syntax());
            out.push_str(&self.fold_stages(stages, level).text);
        }
        out
    }

    fn fold_stages(
        &self,
        stages: impl IntoIterator<Item = (StageKind, String)>,
        level: usize,
    ) -> PipelineText {
        let indent = self.indent(level + 1);
        stages
            .into_iter()
            .fold(PipelineText::default(), |acc, (kind, stage)| {
                acc.push(kind, &stage, &indent)
            })
    }

    // -------------------------------------------------------------------------
    // Metric expressions
    // -------------------------------------------------------------------------

    fn metric_expr(&self, expr: &MetricExpr, level: usize) -> String {
        match expr.kind() {
            Some(MetricKind::RangeAggregation(agg)) => self.range_aggregation(&agg, level),
            Some(MetricKind::VectorAggregation(agg)) => self.vector_aggregation(&agg, level),
            Some(MetricKind::BinOp(bin)) => self.binary(&bin, level),
            Some(MetricKind::Literal(literal)) => literal.value(),
            Some(MetricKind::Vector(vector)) => {
                format!("vector({})", token_text(vector.value()))
            }
            Some(MetricKind::Parens(inner)) => format!("({})", self.metric_expr(&inner, level)),
            None => expr.syntax().text().to_string().trim().to_string(),
        }
    }

    fn range_aggregation(&self, agg: &RangeAggregationExpr, level: usize) -> String {
        let inner = self.indent(level + 1);
        let mut out = format!("{}(\n", token_text(agg.op()));
        if let Some(param) = agg.param() {
            out.push_str(&format!("{inner}{},\n", param.text()));
        }
        if let Some(log_range) = agg.log_range() {
            out.push_str(&inner);
            out.push_str(&self.log_range(&log_range, level + 1));
        }
        out.push('\n');
        out.push_str(&self.indent(level));
        out.push(')');
        if let Some(grouping) = agg.grouping() {
            out.push(' ');
            out.push_str(&grouping_text(&grouping));
        }
        out
    }

    /// Selector, pipeline and unwrap stages in document order, then the range
    fn log_range(&self, expr: &LogRangeExpr, level: usize) -> String {
        let mut stages = Vec::new();
        for child in expr.syntax().children() {
            match child.kind() {
                SyntaxKind::PIPELINE_EXPR => stages.extend(pipeline_stages(&child)),
                SyntaxKind::UNWRAP_EXPR => {
                    if let Some(unwrap) = UnwrapExpr::cast(child) {
                        let label = token_text(unwrap.label());
                        let stage = match unwrap.conversion() {
                            Some(conversion) => {
                                format!("| unwrap {}({label})", conversion.text())
                            }
                            None => format!("| unwrap {label}"),
                        };
                        stages.push((StageKind::Unwrap, stage));
                    }
                }
                _ => {}
            }
        }

        let mut out = expr.selector().map(|s| selector(&s)).unwrap_or_default();
        let pipeline = self.fold_stages(stages, level);
        out.push_str(&pipeline.text);

        if let Some(range) = expr.range() {
            if pipeline.last == Some(StageKind::Comment) {
                out.push('\n');
                out.push_str(&self.indent(level + 1));
            } else {
                out.push(' ');
            }
            out.push_str(&format!("[{}]", range.duration_text()));
        }
        if let Some(offset) = expr.offset() {
            out.push_str(&format!(" offset {}", token_text(offset.duration())));
        }
        out
    }

    fn vector_aggregation(&self, agg: &VectorAggregationExpr, level: usize) -> String {
        let inner = self.indent(level + 1);
        let mut out = format!("{}(\n", token_text(agg.op()));
        if let Some(param) = agg.param() {
            out.push_str(&format!("{inner}{},\n", param.text()));
        }
        if let Some(metric) = agg.metric() {
            out.push_str(&inner);
            out.push_str(&self.metric_expr(&metric, level + 1));
        }
        out.push('\n');
        out.push_str(&self.indent(level));
        out.push(')');
        if let Some(grouping) = agg.grouping() {
            out.push(' ');
            out.push_str(&grouping_text(&grouping));
        }
        out
    }

    fn binary(&self, bin: &BinOpExpr, level: usize) -> String {
        let indent = self.indent(level);
        let left = bin
            .lhs()
            .map(|lhs| self.metric_expr(&lhs, level))
            .unwrap_or_default();
        let right = bin
            .rhs()
            .map(|rhs| self.metric_expr(&rhs, level))
            .unwrap_or_default();

        let mut operator = token_text(bin.op());
        if bin.bool_modifier().is_some() {
            operator.push_str(" bool");
        }
        if let Some(modifier) = bin.on_or_ignoring() {
            operator.push(' ');
            operator.push_str(&token_text(modifier.keyword()));
            operator.push_str(&labels_text(modifier.labels().as_ref()));
            if let Some(group) = modifier.group() {
                operator.push(' ');
                operator.push_str(group.text());
                if let Some(labels) = modifier.group_labels() {
                    operator.push_str(&labels_text(Some(&labels)));
                }
            }
        }

        format!("{left}\n{indent}{operator}\n{indent}{right}")
    }
}

// =============================================================================
// Single-line pieces
// =============================================================================

fn token_text(token: Option<SyntaxToken>) -> String {
    token.map(|t| t.text().to_string()).unwrap_or_default()
}

/// `{a="x", b!="y"}` with matchers sorted by label
fn selector(selector: &Selector) -> String {
    let mut matchers: Vec<Matcher> = selector.matchers().collect();
    matchers.sort_by_key(|m| token_text(m.label()));
    let matchers: Vec<String> = matchers.iter().map(matcher).collect();
    format!("{{{}}}", matchers.join(", "))
}

fn matcher(matcher: &Matcher) -> String {
    format!(
        "{}{}{}",
        token_text(matcher.label()),
        token_text(matcher.op()),
        token_text(matcher.value())
    )
}

fn pipeline_stages(pipeline: &SyntaxNode) -> Vec<(StageKind, String)> {
    let Some(pipeline) = PipelineExpr::cast(pipeline.clone()) else {
        return Vec::new();
    };
    pipeline
        .items()
        .filter_map(|item| match item {
            PipelineItem::LineFilter(filter) => Some((StageKind::LineFilter, line_filter(&filter))),
            PipelineItem::Stage(stage) => pipeline_stage(&stage),
            PipelineItem::Comment(comment) => Some((StageKind::Comment, line_comment(&comment))),
        })
        .collect()
}

fn line_filter(filter: &LineFilter) -> String {
    let op = token_text(filter.op());
    let value = token_text(filter.value());
    if filter.is_ip() {
        format!("{op} ip({value})")
    } else {
        format!("{op} {value}")
    }
}

/// `# text`, with the text trimmed
fn line_comment(comment: &SyntaxToken) -> String {
    let text = comment.text().trim_start_matches('#').trim();
    format!("# {text}").trim_end().to_string()
}

fn pipeline_stage(stage: &PipelineStage) -> Option<(StageKind, String)> {
    let formatted = match stage.stage()? {
        Stage::LabelParser(parser) => {
            let keyword = token_text(parser.keyword());
            let text = match parser.value() {
                Some(value) => format!("| {keyword} {}", value.text()),
                None => format!("| {keyword}"),
            };
            (StageKind::LabelParser, text)
        }
        Stage::JsonExpressionParser(parser) => {
            let expressions: Vec<String> = parser
                .extractions()
                .map(|e| format!("{}={}", token_text(e.label()), token_text(e.value())))
                .collect();
            (StageKind::JsonParser, format!("| json {}", expressions.join(", ")))
        }
        Stage::LabelFilter(filter) => (StageKind::LabelFilter, format!("| {}", label_filter(&filter))),
        Stage::LineFormat(expr) => (
            StageKind::LineFormat,
            format!("| line_format {}", token_text(expr.value())),
        ),
        Stage::LabelFormat(expr) => {
            let matchers: Vec<String> = expr
                .matchers()
                .map(|m| format!("{}={}", token_text(m.label()), token_text(m.target())))
                .collect();
            (
                StageKind::LabelFormat,
                format!("| label_format {}", matchers.join(", ")),
            )
        }
        Stage::Decolorize(_) => (StageKind::Decolorize, "| decolorize".to_string()),
        Stage::DropLabels(expr) => (
            StageKind::DropLabels,
            format!("| drop {}", labels_items(expr.items())),
        ),
        Stage::KeepLabels(expr) => (
            StageKind::KeepLabels,
            format!("| keep {}", labels_items(expr.items())),
        ),
    };
    Some(formatted)
}

fn label_filter(filter: &LabelFilter) -> String {
    if let (Some((left, right)), Some(connective)) = (filter.operands(), filter.connective()) {
        let separator = match connective.kind() {
            SyntaxKind::COMMA => ", ".to_string(),
            _ => format!(" {} ", connective.text()),
        };
        return format!("{}{separator}{}", label_filter(&left), label_filter(&right));
    }
    if let Some(inner) = filter.parenthesized() {
        return format!("({})", label_filter(&inner));
    }

    match filter.leaf() {
        Some(LabelFilterLeaf::Matcher(m)) => matcher(&m),
        Some(LabelFilterLeaf::Ip(ip)) => format!(
            "{}{}ip({})",
            token_text(ip.label()),
            token_text(ip.op()),
            token_text(ip.value())
        ),
        Some(
            LabelFilterLeaf::Number(f) | LabelFilterLeaf::Duration(f) | LabelFilterLeaf::Bytes(f),
        ) => format!(
            "{}{}{}",
            token_text(f.label()),
            token_text(f.op()),
            token_text(f.value())
        ),
        None => String::new(),
    }
}

fn labels_items(items: impl Iterator<Item = LabelsItem>) -> String {
    items
        .map(|item| match item {
            LabelsItem::Name(name) => name.text().to_string(),
            LabelsItem::Matcher(m) => matcher(&m),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `by(a, b)` / `without(a)`, keeping label order
fn grouping_text(grouping: &Grouping) -> String {
    format!(
        "{}{}",
        token_text(grouping.keyword()),
        labels_text(grouping.labels().as_ref())
    )
}

fn labels_text(labels: Option<&Labels>) -> String {
    let names: Vec<String> = labels
        .map(|l| l.names().map(|t| t.text().to_string()).collect())
        .unwrap_or_default();
    format!("({})", names.join(", "))
}
