//! Metric expression grammar
//!
//! ```text
//! MetricExpr = RangeAggregationExpr | VectorAggregationExpr | BinOpExpr
//!            | LiteralExpr | VectorExpr | '(' MetricExpr ')'
//! RangeAggregationExpr  = RangeOp '(' (Number ',')? LogRangeExpr ')' Grouping?
//! LogRangeExpr = Selector PipelineExpr? (UnwrapExpr PipelineExpr?)? Range OffsetExpr?
//!              | Selector Range OffsetExpr? PipelineExpr? (UnwrapExpr PipelineExpr?)?
//!              | '(' Selector PipelineExpr? ')' Range OffsetExpr?
//! VectorAggregationExpr = VectorOp Grouping? '(' (Number ',')? MetricExpr ')' Grouping?
//! BinOpExpr  = MetricExpr BinOp BoolModifier? OnOrIgnoringModifier? MetricExpr
//! ```
//!
//! Binary operators are parsed with binding powers, lowest first:
//! `or` < `and`/`unless` < comparisons < `+ -` < `* / %` < `^` (right-assoc).

use super::log;
use crate::parser::parser::Parser;
use crate::parser::syntax_kind::SyntaxKind;

pub(crate) const RANGE_FUNCTIONS: &[&str] = &[
    "count_over_time",
    "rate",
    "rate_counter",
    "bytes_over_time",
    "bytes_rate",
    "avg_over_time",
    "sum_over_time",
    "min_over_time",
    "max_over_time",
    "stddev_over_time",
    "stdvar_over_time",
    "quantile_over_time",
    "first_over_time",
    "last_over_time",
    "absent_over_time",
];

pub(crate) const VECTOR_FUNCTIONS: &[&str] = &[
    "sum", "avg", "min", "max", "stddev", "stdvar", "count", "topk", "bottomk", "sort",
    "sort_desc",
];

const ARGUMENT_RECOVERY: &[SyntaxKind] = &[SyntaxKind::R_PAREN, SyntaxKind::COMMA];

pub(super) fn metric_expr(p: &mut Parser) {
    metric_expr_bp(p, 0);
}

fn metric_expr_bp(p: &mut Parser, min_bp: u8) {
    let checkpoint = p.checkpoint();
    metric_primary(p);

    while let Some((left_bp, right_bp)) = binary_op_power(p) {
        if left_bp < min_bp {
            break;
        }

        p.start_node_at(checkpoint, SyntaxKind::METRIC_EXPR);
        p.start_node_at(checkpoint, SyntaxKind::BIN_OP_EXPR);
        p.skip_trivia();
        match p.current_text() {
            "and" => p.bump_remap(SyntaxKind::AND_KW),
            "or" => p.bump_remap(SyntaxKind::OR_KW),
            "unless" => p.bump_remap(SyntaxKind::UNLESS_KW),
            _ => p.bump(),
        }
        bin_op_modifiers(p);
        p.skip_trivia();
        metric_expr_bp(p, right_bp);
        p.finish_node();
        p.finish_node();
    }
}

/// Binding power of the binary operator ahead, if any
fn binary_op_power(p: &Parser) -> Option<(u8, u8)> {
    let power = match p.nth(0) {
        SyntaxKind::IDENT => match p.nth_text(0) {
            "or" => (1, 2),
            "and" | "unless" => (3, 4),
            _ => return None,
        },
        SyntaxKind::EQ_EQ
        | SyntaxKind::BANG_EQ
        | SyntaxKind::GT
        | SyntaxKind::GT_EQ
        | SyntaxKind::LT
        | SyntaxKind::LT_EQ => (5, 6),
        SyntaxKind::PLUS | SyntaxKind::MINUS => (7, 8),
        SyntaxKind::STAR | SyntaxKind::SLASH | SyntaxKind::PERCENT => (9, 10),
        SyntaxKind::CARET => (12, 11),
        _ => return None,
    };
    Some(power)
}

/// `bool`, then `on(...)`/`ignoring(...)` with optional `group_left`/`group_right`
fn bin_op_modifiers(p: &mut Parser) {
    if p.nth_is_word(0, "bool") {
        p.skip_trivia();
        p.start_node(SyntaxKind::BOOL_MODIFIER);
        p.bump_remap(SyntaxKind::BOOL_KW);
        p.finish_node();
    }

    let on = p.nth_is_word(0, "on");
    if !on && !p.nth_is_word(0, "ignoring") {
        return;
    }

    p.skip_trivia();
    p.start_node(SyntaxKind::ON_OR_IGNORING_MODIFIER);
    p.bump_remap(if on {
        SyntaxKind::ON_KW
    } else {
        SyntaxKind::IGNORING_KW
    });
    labels(p);

    let left = p.nth_is_word(0, "group_left");
    if left || p.nth_is_word(0, "group_right") {
        p.skip_trivia();
        p.bump_remap(if left {
            SyntaxKind::GROUP_LEFT_KW
        } else {
            SyntaxKind::GROUP_RIGHT_KW
        });
        if p.nth(0) == SyntaxKind::L_PAREN {
            labels(p);
        }
    }
    p.finish_node();
}

fn metric_primary(p: &mut Parser) {
    p.start_node(SyntaxKind::METRIC_EXPR);

    let text = p.current_text();
    match p.current_kind() {
        SyntaxKind::IDENT if RANGE_FUNCTIONS.contains(&text) => range_aggregation(p),
        SyntaxKind::IDENT if VECTOR_FUNCTIONS.contains(&text) => vector_aggregation(p),
        SyntaxKind::IDENT if text == "vector" => vector_expr(p),
        SyntaxKind::NUMBER | SyntaxKind::PLUS | SyntaxKind::MINUS if !p.at_eof() => {
            literal_expr(p)
        }
        SyntaxKind::L_PAREN if !p.at_eof() => {
            p.bump();
            p.skip_trivia();
            metric_expr_bp(p, 0);
            p.expect(SyntaxKind::R_PAREN);
        }
        _ => p.recover("expected metric expression", ARGUMENT_RECOVERY),
    }

    p.finish_node();
}

/// LiteralExpr = ('+' | '-')? Number
fn literal_expr(p: &mut Parser) {
    p.start_node(SyntaxKind::LITERAL_EXPR);
    if p.at_any(&[SyntaxKind::PLUS, SyntaxKind::MINUS]) {
        p.bump();
    }
    p.expect(SyntaxKind::NUMBER);
    p.finish_node();
}

/// VectorExpr = 'vector' '(' Number ')'
fn vector_expr(p: &mut Parser) {
    p.start_node(SyntaxKind::VECTOR_EXPR);
    p.bump_remap(SyntaxKind::VECTOR_KW);
    p.expect(SyntaxKind::L_PAREN);
    p.expect(SyntaxKind::NUMBER);
    p.expect(SyntaxKind::R_PAREN);
    p.finish_node();
}

fn range_aggregation(p: &mut Parser) {
    p.start_node(SyntaxKind::RANGE_AGGREGATION_EXPR);
    p.bump_remap(SyntaxKind::RANGE_OP);
    p.expect(SyntaxKind::L_PAREN);

    p.skip_trivia();
    if p.at(SyntaxKind::NUMBER) {
        p.bump();
        p.expect(SyntaxKind::COMMA);
        p.skip_trivia();
    }
    log_range_expr(p);
    p.expect(SyntaxKind::R_PAREN);

    if at_grouping(p) {
        p.skip_trivia();
        grouping(p);
    }
    p.finish_node();
}

fn log_range_expr(p: &mut Parser) {
    p.start_node(SyntaxKind::LOG_RANGE_EXPR);

    let mut has_pipeline = false;
    if p.at(SyntaxKind::L_PAREN) {
        p.bump();
        p.skip_trivia();
        if p.at(SyntaxKind::L_BRACE) {
            log::selector(p);
            if log::at_pipeline_start(p) {
                log::pipeline(p);
                has_pipeline = true;
            }
        } else {
            p.recover("expected log selector", ARGUMENT_RECOVERY);
        }
        p.expect(SyntaxKind::R_PAREN);
    } else if p.at(SyntaxKind::L_BRACE) {
        log::selector(p);
        if log::at_pipeline_start(p) {
            log::pipeline(p);
            has_pipeline = true;
        }
    } else {
        p.recover("expected log selector", &[SyntaxKind::L_BRACKET, SyntaxKind::R_PAREN]);
    }

    if log::at_unwrap(p) {
        unwrap_with_pipeline(p);
        has_pipeline = true;
    }

    if p.nth(0) == SyntaxKind::L_BRACKET {
        p.skip_trivia();
        log::range(p);
    } else {
        p.skip_trivia();
        p.error_missing("expected range");
    }

    if p.nth_is_word(0, "offset") {
        p.skip_trivia();
        log::offset_expr(p);
    }

    // range before the pipeline: `{a="b"}[5m] | json`
    if !has_pipeline {
        if log::at_pipeline_start(p) {
            log::pipeline(p);
        }
        if log::at_unwrap(p) {
            unwrap_with_pipeline(p);
        }
    }

    p.finish_node();
}

fn unwrap_with_pipeline(p: &mut Parser) {
    p.skip_trivia();
    log::unwrap_expr(p);
    if log::at_pipeline_start(p) {
        log::pipeline(p);
    }
}

fn vector_aggregation(p: &mut Parser) {
    p.start_node(SyntaxKind::VECTOR_AGGREGATION_EXPR);
    p.bump_remap(SyntaxKind::VECTOR_OP);

    let mut grouped = false;
    if at_grouping(p) {
        p.skip_trivia();
        grouping(p);
        grouped = true;
    }

    p.expect(SyntaxKind::L_PAREN);
    p.skip_trivia();
    if p.at(SyntaxKind::NUMBER) && p.nth(1) == SyntaxKind::COMMA {
        p.bump();
        p.skip_trivia();
        p.bump(); // ,
        p.skip_trivia();
    }
    metric_expr_bp(p, 0);
    p.expect(SyntaxKind::R_PAREN);

    if !grouped && at_grouping(p) {
        p.skip_trivia();
        grouping(p);
    }
    p.finish_node();
}

fn at_grouping(p: &Parser) -> bool {
    (p.nth_is_word(0, "by") || p.nth_is_word(0, "without")) && p.nth(1) == SyntaxKind::L_PAREN
}

/// Grouping = ('by' | 'without') Labels
fn grouping(p: &mut Parser) {
    p.start_node(SyntaxKind::GROUPING);
    let keyword = if p.current_text() == "by" {
        SyntaxKind::BY_KW
    } else {
        SyntaxKind::WITHOUT_KW
    };
    p.bump_remap(keyword);
    labels(p);
    p.finish_node();
}

/// Labels = '(' (Identifier (',' Identifier)*)? ')'
fn labels(p: &mut Parser) {
    p.skip_trivia();
    p.start_node(SyntaxKind::LABELS);
    p.expect(SyntaxKind::L_PAREN);

    loop {
        p.skip_trivia();
        if !p.eat(SyntaxKind::IDENT) {
            break;
        }
        p.skip_trivia();
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }

    if !p.at(SyntaxKind::R_PAREN) && !p.at_eof() {
        p.recover("expected label", &[SyntaxKind::R_PAREN]);
    }
    p.expect(SyntaxKind::R_PAREN);
    p.finish_node();
}
