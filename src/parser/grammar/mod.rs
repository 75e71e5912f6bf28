//! Grammar rules for LogQL
//!
//! - `log` - selectors, matchers and pipeline stages
//! - `metric` - range/vector aggregations, literals and binary operators
//!
//! Every rule expects the parser to sit on a significant token (callers skip
//! trivia first) and leaves trailing trivia for the caller, so whitespace and
//! comments attach to the innermost node that is still open.

mod log;
mod metric;

pub(crate) use metric::{RANGE_FUNCTIONS, VECTOR_FUNCTIONS};

use super::parser::Parser;
use super::syntax_kind::SyntaxKind;

/// LogQL = Expr?
pub(crate) fn root(p: &mut Parser) {
    p.start_node(SyntaxKind::ROOT);
    p.skip_trivia();

    if !p.at_eof() {
        expr(p);
    }

    p.skip_trivia();
    if !p.at_eof() {
        p.error_recover("unexpected input after query", &[]);
    }

    p.finish_node();
}

/// Expr = LogExpr | MetricExpr
fn expr(p: &mut Parser) {
    if starts_log_expr(p) {
        log::log_expr(p);
    } else {
        metric::metric_expr(p);
    }
}

/// A log expression is a selector, possibly wrapped in parentheses
fn starts_log_expr(p: &Parser) -> bool {
    let mut n = 0;
    while p.nth(n) == SyntaxKind::L_PAREN {
        n += 1;
    }
    p.nth(n) == SyntaxKind::L_BRACE
}
