//! Renders a [`VisualQuery`] back to query text
//!
//! The inverse of the builder: the selector comes first, then each operation
//! wraps or extends the text rendered so far, then binary queries are
//! appended.

use super::model::{BinaryOperand, LabelMatcher, Operation, VisualQuery, operation_id};
use crate::parser::{RANGE_FUNCTIONS, VECTOR_FUNCTIONS};

/// Render a visual query as query text
pub fn render(query: &VisualQuery) -> String {
    render_query(query, false)
}

fn render_query(query: &VisualQuery, nested: bool) -> String {
    let mut out = render_labels(&query.labels);
    for operation in &query.operations {
        out = render_operation(operation, out);
    }

    let binary = query.binary_queries.as_deref().unwrap_or_default();
    for operand in binary {
        out = render_binary(out, operand);
    }

    if nested && !binary.is_empty() {
        format!("({out})")
    } else {
        out
    }
}

fn render_labels(labels: &[LabelMatcher]) -> String {
    let matchers: Vec<String> = labels
        .iter()
        .map(|m| format!("{}{}{}", m.label, m.operator, quote(&m.value)))
        .collect();
    format!("{{{}}}", matchers.join(", "))
}

fn render_binary(left: String, operand: &BinaryOperand) -> String {
    let mut out = format!("{left} {} ", operand.operator);
    if let (Some(kind), Some(labels)) = (operand.vector_matches_type, &operand.vector_matches) {
        out.push_str(&format!("{}({labels}) ", kind.as_str()));
    }
    out.push_str(&render_query(&operand.query, true));
    out
}

fn render_operation(operation: &Operation, inner: String) -> String {
    let params = &operation.params;
    let param = move |i: usize| params.get(i).map(String::as_str).unwrap_or_default();

    match operation.id.as_str() {
        operation_id::LINE_CONTAINS => format!("{inner} |= {}", quote(param(0))),
        operation_id::LINE_CONTAINS_NOT => format!("{inner} != {}", quote(param(0))),
        operation_id::LINE_MATCHES_REGEX => format!("{inner} |~ {}", quote(param(0))),
        operation_id::LINE_MATCHES_REGEX_NOT => format!("{inner} !~ {}", quote(param(0))),
        operation_id::LINE_FILTER_IP_MATCHES => {
            format!("{inner} {} ip({})", param(0), quote(param(1)))
        }
        operation_id::JSON if !params.is_empty() => {
            format!("{inner} | json {}", params.join(", "))
        }
        operation_id::JSON
        | operation_id::LOGFMT
        | operation_id::UNPACK
        | operation_id::DECOLORIZE => format!("{inner} | {}", operation.id),
        operation_id::REGEXP | operation_id::PATTERN => {
            format!("{inner} | {} {}", operation.id, quote(param(0)))
        }
        operation_id::LABEL_FILTER => format!("{inner} | {}", label_filter(params)),
        operation_id::LABEL_FILTER_NO_ERRORS => format!(r#"{inner} | __error__="""#),
        operation_id::LINE_FORMAT => format!("{inner} | line_format {}", quote(param(0))),
        operation_id::LABEL_FORMAT => {
            let target = param(2);
            let target = if is_identifier(target) {
                target.to_string()
            } else {
                quote(target)
            };
            format!("{inner} | label_format {}{}{}", param(0), param(1), target)
        }
        operation_id::UNWRAP => match param(1) {
            "" => format!("{inner} | unwrap {}", param(0)),
            conversion => format!("{inner} | unwrap {conversion}({})", param(0)),
        },
        operation_id::DROP | operation_id::KEEP => {
            format!("{inner} | {} {}", operation.id, params.join(", "))
        }
        id => {
            if let Some((operator, _)) = operation_id::binary_scalar_for_id(id) {
                let modifier = if param(1) == "bool" { "bool " } else { "" };
                return format!("{inner} {operator} {modifier}{}", param(0));
            }
            if RANGE_FUNCTIONS.contains(&id) {
                return range_aggregation(id, params, &inner);
            }
            if let Some((function, grouping)) = vector_function(id) {
                return vector_aggregation(function, grouping, params, &inner);
            }
            tracing::debug!(id, "skipping unknown operation");
            inner
        }
    }
}

fn label_filter(params: &[String]) -> String {
    match params {
        [label, op, ip, value] if ip == "ip" => format!("{label}{op}ip({})", quote(value)),
        [label, op, value] if matches!(op.as_str(), "==" | ">" | ">=" | "<" | "<=") => {
            format!("{label}{op}{value}")
        }
        [label, op, value] => format!("{label}{op}{}", quote(value)),
        _ => params.join(""),
    }
}

/// Params are `[number?, range]`
fn range_aggregation(function: &str, params: &[String], inner: &str) -> String {
    match params {
        [number, range] => format!("{function}({number}, {inner} [{range}])"),
        [range] => format!("{function}({inner} [{range}])"),
        _ => format!("{function}({inner})"),
    }
}

/// Split `__sum_by` into `("sum", Some("by"))`
fn vector_function(id: &str) -> Option<(&str, Option<&str>)> {
    if VECTOR_FUNCTIONS.contains(&id) {
        return Some((id, None));
    }
    let name = id.strip_prefix("__")?;
    let (function, grouping) = if let Some(function) = name.strip_suffix("_by") {
        (function, "by")
    } else {
        (name.strip_suffix("_without")?, "without")
    };
    VECTOR_FUNCTIONS
        .contains(&function)
        .then_some((function, Some(grouping)))
}

/// Params are `[number?, label...]`; labels are identifiers and never numeric
fn vector_aggregation(
    function: &str,
    grouping: Option<&str>,
    params: &[String],
    inner: &str,
) -> String {
    let (number, labels) = match params.split_first() {
        Some((first, rest)) if first.parse::<f64>().is_ok() => (Some(first), rest),
        _ => (None, params),
    };

    let mut out = function.to_string();
    if let Some(grouping) = grouping {
        out.push_str(&format!(" {grouping}({}) ", labels.join(", ")));
    }
    match number {
        Some(number) => out.push_str(&format!("({number}, {inner})")),
        None => out.push_str(&format!("({inner})")),
    }
    out
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
