//! Log expression grammar
//!
//! ```text
//! LogExpr      = Selector PipelineExpr? | '(' LogExpr ')'
//! Selector     = '{' (Matcher (',' Matcher)* ','?)? '}'
//! Matcher      = Identifier ('=' | '!=' | '=~' | '!~') String
//! PipelineExpr = (LineFilter | PipelineStage | LineComment)+
//! LineFilter   = ('|=' | '!=' | '|~' | '!~') (String | 'ip' '(' String ')')
//! PipelineStage = '|' (LabelParser | JsonExpressionParser | LabelFilter
//!                     | LineFormatExpr | LabelFormatExpr | DecolorizeExpr
//!                     | DropLabelsExpr | KeepLabelsExpr)
//! ```

use crate::parser::parser::Parser;
use crate::parser::syntax_kind::SyntaxKind;

/// Tokens that end a pipeline stage; recovery never skips past them
const STAGE_RECOVERY: &[SyntaxKind] = &[
    SyntaxKind::PIPE,
    SyntaxKind::PIPE_EQ,
    SyntaxKind::PIPE_TILDE,
    SyntaxKind::BANG_EQ,
    SyntaxKind::BANG_TILDE,
    SyntaxKind::L_BRACKET,
    SyntaxKind::R_BRACKET,
    SyntaxKind::R_PAREN,
    SyntaxKind::R_BRACE,
    SyntaxKind::COMMA,
];

const MATCHER_RECOVERY: &[SyntaxKind] = &[
    SyntaxKind::COMMA,
    SyntaxKind::R_BRACE,
    SyntaxKind::PIPE,
    SyntaxKind::R_PAREN,
];

const CONVERSION_FUNCTIONS: &[&str] = &["bytes", "duration", "duration_seconds"];

pub(super) fn log_expr(p: &mut Parser) {
    p.start_node(SyntaxKind::LOG_EXPR);

    if p.at(SyntaxKind::L_PAREN) {
        p.bump();
        p.skip_trivia();
        log_expr(p);
        p.expect(SyntaxKind::R_PAREN);
    } else {
        selector(p);
        if at_pipeline_start(p) {
            pipeline(p);
        }
    }

    p.finish_node();
}

/// Check whether a pipeline follows: a stage operator or a comment
pub(super) fn at_pipeline_start(p: &Parser) -> bool {
    p.comment_ahead() || at_stage(p)
}

fn at_stage(p: &Parser) -> bool {
    let kind = p.nth(0);
    kind.is_line_filter_op() || (kind == SyntaxKind::PIPE && !p.nth_is_word(1, "unwrap"))
}

/// Check whether `| unwrap` follows
pub(super) fn at_unwrap(p: &Parser) -> bool {
    p.nth(0) == SyntaxKind::PIPE && p.nth_is_word(1, "unwrap")
}

pub(super) fn selector(p: &mut Parser) {
    p.start_node(SyntaxKind::SELECTOR);
    if !p.eat(SyntaxKind::L_BRACE) {
        p.recover("expected '{'", MATCHER_RECOVERY);
    }

    loop {
        p.skip_trivia();
        if p.at_eof() || p.at(SyntaxKind::R_BRACE) {
            break;
        }

        let pos_before = p.pos();
        if p.at(SyntaxKind::IDENT) {
            matcher(p);
        } else {
            p.recover("expected label matcher", MATCHER_RECOVERY);
        }

        p.skip_trivia();
        if p.eat(SyntaxKind::COMMA) {
            continue;
        }
        if p.at(SyntaxKind::IDENT) {
            p.error("expected ','");
            continue;
        }
        if p.at(SyntaxKind::R_BRACE) || p.at_eof() || p.pos() == pos_before {
            break;
        }
        if p.at_any(MATCHER_RECOVERY) {
            // a pipe or paren inside the braces: the selector was never closed
            break;
        }
    }

    p.expect(SyntaxKind::R_BRACE);
    p.finish_node();
}

/// Matcher = Identifier op String
pub(super) fn matcher(p: &mut Parser) {
    p.start_node(SyntaxKind::MATCHER);
    p.bump(); // label

    p.skip_trivia();
    if p.current_kind().is_matcher_op() && !p.at_eof() {
        p.bump();
    } else {
        p.error_missing("expected matcher operator");
    }

    p.skip_trivia();
    if !p.eat(SyntaxKind::STRING) {
        p.recover("expected string", MATCHER_RECOVERY);
    }

    p.finish_node();
}

pub(super) fn pipeline(p: &mut Parser) {
    p.start_node(SyntaxKind::PIPELINE_EXPR);

    loop {
        p.skip_trivia();
        if p.at_eof() {
            break;
        }
        if p.current_kind().is_line_filter_op() {
            line_filter(p);
        } else if p.at(SyntaxKind::PIPE) && !p.nth_is_word(1, "unwrap") {
            pipeline_stage(p);
        } else {
            break;
        }
    }

    p.finish_node();
}

/// LineFilter = op (String | 'ip' '(' String ')')
fn line_filter(p: &mut Parser) {
    p.start_node(SyntaxKind::LINE_FILTER);
    p.bump(); // |= != |~ !~

    p.skip_trivia();
    if p.nth_is_word(0, "ip") && p.nth(1) == SyntaxKind::L_PAREN {
        p.bump_remap(SyntaxKind::IP_KW);
        p.expect(SyntaxKind::L_PAREN);
        p.expect(SyntaxKind::STRING);
        p.expect(SyntaxKind::R_PAREN);
    } else if !p.eat(SyntaxKind::STRING) {
        p.error_missing("expected string after line filter");
    }

    p.finish_node();
}

fn pipeline_stage(p: &mut Parser) {
    p.start_node(SyntaxKind::PIPELINE_STAGE);
    p.bump(); // |
    p.skip_trivia();

    // `| json="x"` is a label filter on a label called json; `!=` and `!~`
    // after a parser keyword start a line filter instead
    let followed_by_op = matches!(
        p.nth(1),
        SyntaxKind::EQ
            | SyntaxKind::EQ_EQ
            | SyntaxKind::EQ_TILDE
            | SyntaxKind::GT
            | SyntaxKind::GT_EQ
            | SyntaxKind::LT
            | SyntaxKind::LT_EQ
    );

    match (p.current_kind(), p.current_text()) {
        (SyntaxKind::IDENT, "json") if !followed_by_op => json_parser(p),
        (SyntaxKind::IDENT, "logfmt") if !followed_by_op => {
            keyword_stage(p, SyntaxKind::LABEL_PARSER, SyntaxKind::LOGFMT_KW)
        }
        (SyntaxKind::IDENT, "unpack") if !followed_by_op => {
            keyword_stage(p, SyntaxKind::LABEL_PARSER, SyntaxKind::UNPACK_KW)
        }
        (SyntaxKind::IDENT, "regexp") if !followed_by_op => {
            string_stage(p, SyntaxKind::LABEL_PARSER, SyntaxKind::REGEXP_KW)
        }
        (SyntaxKind::IDENT, "pattern") if !followed_by_op => {
            string_stage(p, SyntaxKind::LABEL_PARSER, SyntaxKind::PATTERN_KW)
        }
        (SyntaxKind::IDENT, "line_format") if !followed_by_op => {
            string_stage(p, SyntaxKind::LINE_FORMAT_EXPR, SyntaxKind::LINE_FORMAT_KW)
        }
        (SyntaxKind::IDENT, "label_format") if !followed_by_op => label_format(p),
        (SyntaxKind::IDENT, "decolorize") if !followed_by_op => {
            keyword_stage(p, SyntaxKind::DECOLORIZE_EXPR, SyntaxKind::DECOLORIZE_KW)
        }
        (SyntaxKind::IDENT, "drop") if !followed_by_op => {
            labels_stage(p, SyntaxKind::DROP_LABELS_EXPR, SyntaxKind::DROP_KW)
        }
        (SyntaxKind::IDENT, "keep") if !followed_by_op => {
            labels_stage(p, SyntaxKind::KEEP_LABELS_EXPR, SyntaxKind::KEEP_KW)
        }
        (SyntaxKind::IDENT, _) | (SyntaxKind::L_PAREN, _) => label_filter(p),
        _ => p.recover("expected pipeline stage after '|'", STAGE_RECOVERY),
    }

    p.finish_node();
}

fn keyword_stage(p: &mut Parser, node: SyntaxKind, keyword: SyntaxKind) {
    p.start_node(node);
    p.bump_remap(keyword);
    p.finish_node();
}

fn string_stage(p: &mut Parser, node: SyntaxKind, keyword: SyntaxKind) {
    p.start_node(node);
    p.bump_remap(keyword);
    p.skip_trivia();
    if !p.eat(SyntaxKind::STRING) {
        p.recover("expected string", STAGE_RECOVERY);
    }
    p.finish_node();
}

/// `json` alone is a label parser; `json a="b", c="d"` extracts expressions
fn json_parser(p: &mut Parser) {
    if p.nth(1) != SyntaxKind::IDENT || p.nth(2) != SyntaxKind::EQ {
        keyword_stage(p, SyntaxKind::LABEL_PARSER, SyntaxKind::JSON_KW);
        return;
    }

    p.start_node(SyntaxKind::JSON_EXPRESSION_PARSER);
    p.bump_remap(SyntaxKind::JSON_KW);
    loop {
        p.skip_trivia();
        p.start_node(SyntaxKind::LABEL_EXTRACTION_EXPR);
        p.expect(SyntaxKind::IDENT);
        p.expect(SyntaxKind::EQ);
        p.expect(SyntaxKind::STRING);
        p.finish_node();

        if p.nth(0) == SyntaxKind::COMMA && p.nth(1) == SyntaxKind::IDENT {
            p.skip_trivia();
            p.bump();
        } else {
            break;
        }
    }
    p.finish_node();
}

/// LabelFormatExpr = 'label_format' LabelFormatMatcher (',' LabelFormatMatcher)*
fn label_format(p: &mut Parser) {
    p.start_node(SyntaxKind::LABEL_FORMAT_EXPR);
    p.bump_remap(SyntaxKind::LABEL_FORMAT_KW);
    loop {
        p.skip_trivia();
        p.start_node(SyntaxKind::LABEL_FORMAT_MATCHER);
        p.expect(SyntaxKind::IDENT);
        p.expect(SyntaxKind::EQ);
        p.skip_trivia();
        if !p.eat(SyntaxKind::STRING) && !p.eat(SyntaxKind::IDENT) {
            p.recover("expected label or template string", STAGE_RECOVERY);
        }
        p.finish_node();

        if p.nth(0) == SyntaxKind::COMMA && p.nth(1) == SyntaxKind::IDENT {
            p.skip_trivia();
            p.bump();
        } else {
            break;
        }
    }
    p.finish_node();
}

/// `drop` / `keep` followed by label names or matchers
fn labels_stage(p: &mut Parser, node: SyntaxKind, keyword: SyntaxKind) {
    p.start_node(node);
    p.bump_remap(keyword);
    loop {
        p.skip_trivia();
        if !p.at(SyntaxKind::IDENT) {
            p.recover("expected label", STAGE_RECOVERY);
            break;
        }
        if p.nth(1).is_matcher_op() {
            matcher(p);
        } else {
            p.bump();
        }

        if p.nth(0) == SyntaxKind::COMMA && p.nth(1) == SyntaxKind::IDENT {
            p.skip_trivia();
            p.bump();
        } else {
            break;
        }
    }
    p.finish_node();
}

// =============================================================================
// Label filters
// =============================================================================

/// LabelFilter = LabelFilter 'or' LabelFilter
///             | LabelFilter ('and' | ',') LabelFilter
///             | '(' LabelFilter ')'
///             | Matcher | IpLabelFilter | NumberFilter | UnitFilter
fn label_filter(p: &mut Parser) {
    label_filter_or(p);
}

fn label_filter_or(p: &mut Parser) {
    let checkpoint = p.checkpoint();
    label_filter_and(p);

    while p.nth_is_word(0, "or") {
        p.start_node_at(checkpoint, SyntaxKind::LABEL_FILTER);
        p.skip_trivia();
        p.bump_remap(SyntaxKind::OR_KW);
        p.skip_trivia();
        label_filter_and(p);
        p.finish_node();
    }
}

fn label_filter_and(p: &mut Parser) {
    let checkpoint = p.checkpoint();
    label_filter_primary(p);

    loop {
        let is_and = p.nth_is_word(0, "and");
        let is_comma = p.nth(0) == SyntaxKind::COMMA
            && matches!(p.nth(1), SyntaxKind::IDENT | SyntaxKind::L_PAREN);
        if !is_and && !is_comma {
            break;
        }

        p.start_node_at(checkpoint, SyntaxKind::LABEL_FILTER);
        p.skip_trivia();
        if is_and {
            p.bump_remap(SyntaxKind::AND_KW);
        } else {
            p.bump();
        }
        p.skip_trivia();
        label_filter_primary(p);
        p.finish_node();
    }
}

fn label_filter_primary(p: &mut Parser) {
    p.start_node(SyntaxKind::LABEL_FILTER);
    if p.at(SyntaxKind::L_PAREN) {
        p.bump();
        p.skip_trivia();
        label_filter_or(p);
        p.expect(SyntaxKind::R_PAREN);
    } else {
        label_filter_leaf(p);
    }
    p.finish_node();
}

fn label_filter_leaf(p: &mut Parser) {
    if !p.at(SyntaxKind::IDENT) {
        p.recover("expected label filter", STAGE_RECOVERY);
        return;
    }

    let op = p.nth(1);
    if matches!(op, SyntaxKind::EQ | SyntaxKind::BANG_EQ) && p.nth_is_word(2, "ip") {
        ip_label_filter(p);
        return;
    }

    let (node, unit) = match p.nth(2) {
        SyntaxKind::NUMBER => (SyntaxKind::NUMBER_FILTER, false),
        SyntaxKind::DURATION => (SyntaxKind::DURATION_FILTER, true),
        SyntaxKind::BYTES => (SyntaxKind::BYTES_FILTER, true),
        _ => (SyntaxKind::MATCHER, false),
    };

    if unit {
        p.start_node(SyntaxKind::UNIT_FILTER);
    }
    p.start_node(node);
    p.bump(); // label

    p.skip_trivia();
    let op_ok = if node == SyntaxKind::MATCHER {
        op.is_matcher_op()
    } else {
        op.is_comparison_op()
    };
    if op_ok && !p.at_eof() {
        p.bump();
    } else {
        p.error_missing("expected label filter operator");
    }

    p.skip_trivia();
    let value = match node {
        SyntaxKind::NUMBER_FILTER => SyntaxKind::NUMBER,
        SyntaxKind::DURATION_FILTER => SyntaxKind::DURATION,
        SyntaxKind::BYTES_FILTER => SyntaxKind::BYTES,
        _ => SyntaxKind::STRING,
    };
    if !p.eat(value) {
        p.recover("expected label filter value", STAGE_RECOVERY);
    }

    p.finish_node();
    if unit {
        p.finish_node();
    }
}

/// IpLabelFilter = Identifier ('=' | '!=') 'ip' '(' String ')'
fn ip_label_filter(p: &mut Parser) {
    p.start_node(SyntaxKind::IP_LABEL_FILTER);
    p.bump(); // label
    p.skip_trivia();
    p.bump(); // = or !=
    p.skip_trivia();
    p.bump_remap(SyntaxKind::IP_KW);
    p.expect(SyntaxKind::L_PAREN);
    p.expect(SyntaxKind::STRING);
    p.expect(SyntaxKind::R_PAREN);
    p.finish_node();
}

// =============================================================================
// Range-specific pieces
// =============================================================================

/// UnwrapExpr = '|' 'unwrap' (Identifier | ConversionFn '(' Identifier ')')
pub(super) fn unwrap_expr(p: &mut Parser) {
    p.start_node(SyntaxKind::UNWRAP_EXPR);
    p.bump(); // |
    p.skip_trivia();
    p.bump_remap(SyntaxKind::UNWRAP_KW);

    p.skip_trivia();
    let conversion = p.at(SyntaxKind::IDENT)
        && CONVERSION_FUNCTIONS.contains(&p.current_text())
        && p.nth(1) == SyntaxKind::L_PAREN;
    if conversion {
        p.bump_remap(SyntaxKind::CONVERSION_FN);
        p.expect(SyntaxKind::L_PAREN);
        p.expect(SyntaxKind::IDENT);
        p.expect(SyntaxKind::R_PAREN);
    } else if !p.eat(SyntaxKind::IDENT) {
        p.error_missing("expected label to unwrap");
    }

    p.finish_node();
}

/// Range = '[' Duration ']'
///
/// Anything other than a duration inside the brackets (typically a masked
/// interval variable) is wrapped in an `ERROR` node directly under `RANGE`.
pub(super) fn range(p: &mut Parser) {
    p.start_node(SyntaxKind::RANGE);
    p.bump(); // [

    p.skip_trivia();
    if !p.eat(SyntaxKind::DURATION) {
        p.recover(
            "expected duration",
            &[SyntaxKind::R_BRACKET, SyntaxKind::R_PAREN],
        );
    }

    p.expect(SyntaxKind::R_BRACKET);
    p.finish_node();
}

/// OffsetExpr = 'offset' Duration
pub(super) fn offset_expr(p: &mut Parser) {
    p.start_node(SyntaxKind::OFFSET_EXPR);
    p.bump_remap(SyntaxKind::OFFSET_KW);
    p.expect(SyntaxKind::DURATION);
    p.finish_node();
}
