//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree.
//! Keyword kinds are never produced by the lexer: the parser remaps
//! identifiers to them in the contexts where the word is a keyword.

/// All syntax kinds (tokens and nodes) in LogQL
///
/// Tokens are leaf nodes (identifiers, literals, operators).
/// Nodes are composite (selectors, pipeline stages, aggregations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT, // # ...

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,    // job, __error__
    NUMBER,   // 42, 0.99
    DURATION, // 5m, 1h30m
    BYTES,    // 10KB, 1.5MiB
    STRING,   // "x" or `x`

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,    // {
    R_BRACE,    // }
    L_BRACKET,  // [
    R_BRACKET,  // ]
    L_PAREN,    // (
    R_PAREN,    // )
    COMMA,      // ,
    PIPE,       // |
    PIPE_EQ,    // |=
    PIPE_TILDE, // |~
    EQ,         // =
    EQ_EQ,      // ==
    BANG_EQ,    // !=
    EQ_TILDE,   // =~
    BANG_TILDE, // !~
    GT,         // >
    GT_EQ,      // >=
    LT,         // <
    LT_EQ,      // <=
    PLUS,       // +
    MINUS,      // -
    STAR,       // *
    SLASH,      // /
    PERCENT,    // %
    CARET,      // ^

    // =========================================================================
    // CONTEXTUAL KEYWORDS
    // =========================================================================
    JSON_KW,
    LOGFMT_KW,
    UNPACK_KW,
    REGEXP_KW,
    PATTERN_KW,
    LINE_FORMAT_KW,
    LABEL_FORMAT_KW,
    DECOLORIZE_KW,
    DROP_KW,
    KEEP_KW,
    UNWRAP_KW,
    IP_KW,
    BY_KW,
    WITHOUT_KW,
    BOOL_KW,
    ON_KW,
    IGNORING_KW,
    GROUP_LEFT_KW,
    GROUP_RIGHT_KW,
    OFFSET_KW,
    AND_KW,
    OR_KW,
    UNLESS_KW,
    VECTOR_KW,
    CONVERSION_FN, // bytes, duration, duration_seconds (inside unwrap)
    RANGE_OP,      // rate, count_over_time, ...
    VECTOR_OP,     // sum, topk, ...

    // =========================================================================
    // NODES
    // =========================================================================
    ROOT,

    // Log expressions
    LOG_EXPR,
    SELECTOR,
    MATCHER,
    PIPELINE_EXPR,
    PIPELINE_STAGE,
    LINE_FILTER,
    LABEL_PARSER,
    JSON_EXPRESSION_PARSER,
    LABEL_EXTRACTION_EXPR,
    LABEL_FILTER,
    IP_LABEL_FILTER,
    NUMBER_FILTER,
    UNIT_FILTER,
    DURATION_FILTER,
    BYTES_FILTER,
    LINE_FORMAT_EXPR,
    LABEL_FORMAT_EXPR,
    LABEL_FORMAT_MATCHER,
    DECOLORIZE_EXPR,
    DROP_LABELS_EXPR,
    KEEP_LABELS_EXPR,

    // Metric expressions
    METRIC_EXPR,
    RANGE_AGGREGATION_EXPR,
    LOG_RANGE_EXPR,
    RANGE,
    OFFSET_EXPR,
    UNWRAP_EXPR,
    VECTOR_AGGREGATION_EXPR,
    GROUPING,
    LABELS,
    BIN_OP_EXPR,
    BOOL_MODIFIER,
    ON_OR_IGNORING_MODIFIER,
    LITERAL_EXPR,
    VECTOR_EXPR,

    // Special
    ERROR,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::WHITESPACE | Self::LINE_COMMENT)
    }

    /// Check if this is a contextual keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::JSON_KW as u16) && (self as u16) <= (Self::VECTOR_OP as u16)
    }

    /// Check if this is a punctuation or operator token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::L_BRACE as u16) && (self as u16) <= (Self::CARET as u16)
    }

    /// Check if this is a literal
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::IDENT | Self::NUMBER | Self::DURATION | Self::BYTES | Self::STRING
        )
    }

    /// Line filter operators: `|=`, `!=`, `|~`, `!~`
    pub fn is_line_filter_op(self) -> bool {
        matches!(
            self,
            Self::PIPE_EQ | Self::BANG_EQ | Self::PIPE_TILDE | Self::BANG_TILDE
        )
    }

    /// Operators allowed between a label and a string value
    pub fn is_matcher_op(self) -> bool {
        matches!(
            self,
            Self::EQ | Self::BANG_EQ | Self::EQ_TILDE | Self::BANG_TILDE
        )
    }

    /// Operators allowed between a label and a number, duration or byte size
    pub fn is_comparison_op(self) -> bool {
        matches!(
            self,
            Self::EQ | Self::EQ_EQ | Self::BANG_EQ | Self::GT | Self::GT_EQ | Self::LT | Self::LT_EQ
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogQLLanguage {}

impl rowan::Language for LogQLLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<LogQLLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<LogQLLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<LogQLLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<LogQLLanguage>;

/// Human-readable name for a kind, used in error messages and
/// `ParsingError::parent_type`.
pub fn kind_to_name(kind: SyntaxKind) -> &'static str {
    match kind {
        SyntaxKind::WHITESPACE => "whitespace",
        SyntaxKind::LINE_COMMENT => "comment",
        SyntaxKind::IDENT => "identifier",
        SyntaxKind::NUMBER => "number",
        SyntaxKind::DURATION => "duration",
        SyntaxKind::BYTES => "bytes",
        SyntaxKind::STRING => "string",
        SyntaxKind::L_BRACE => "'{'",
        SyntaxKind::R_BRACE => "'}'",
        SyntaxKind::L_BRACKET => "'['",
        SyntaxKind::R_BRACKET => "']'",
        SyntaxKind::L_PAREN => "'('",
        SyntaxKind::R_PAREN => "')'",
        SyntaxKind::COMMA => "','",
        SyntaxKind::PIPE => "'|'",
        SyntaxKind::PIPE_EQ => "'|='",
        SyntaxKind::PIPE_TILDE => "'|~'",
        SyntaxKind::EQ => "'='",
        SyntaxKind::EQ_EQ => "'=='",
        SyntaxKind::BANG_EQ => "'!='",
        SyntaxKind::EQ_TILDE => "'=~'",
        SyntaxKind::BANG_TILDE => "'!~'",
        SyntaxKind::GT => "'>'",
        SyntaxKind::GT_EQ => "'>='",
        SyntaxKind::LT => "'<'",
        SyntaxKind::LT_EQ => "'<='",
        SyntaxKind::PLUS => "'+'",
        SyntaxKind::MINUS => "'-'",
        SyntaxKind::STAR => "'*'",
        SyntaxKind::SLASH => "'/'",
        SyntaxKind::PERCENT => "'%'",
        SyntaxKind::CARET => "'^'",
        k if k.is_keyword() => "keyword",
        SyntaxKind::ROOT => "LogQL",
        SyntaxKind::LOG_EXPR => "LogExpr",
        SyntaxKind::SELECTOR => "Selector",
        SyntaxKind::MATCHER => "Matcher",
        SyntaxKind::PIPELINE_EXPR => "PipelineExpr",
        SyntaxKind::PIPELINE_STAGE => "PipelineStage",
        SyntaxKind::LINE_FILTER => "LineFilter",
        SyntaxKind::LABEL_PARSER => "LabelParser",
        SyntaxKind::JSON_EXPRESSION_PARSER => "JsonExpressionParser",
        SyntaxKind::LABEL_EXTRACTION_EXPR => "LabelExtractionExpression",
        SyntaxKind::LABEL_FILTER => "LabelFilter",
        SyntaxKind::IP_LABEL_FILTER => "IpLabelFilter",
        SyntaxKind::NUMBER_FILTER => "NumberFilter",
        SyntaxKind::UNIT_FILTER => "UnitFilter",
        SyntaxKind::DURATION_FILTER => "DurationFilter",
        SyntaxKind::BYTES_FILTER => "BytesFilter",
        SyntaxKind::LINE_FORMAT_EXPR => "LineFormatExpr",
        SyntaxKind::LABEL_FORMAT_EXPR => "LabelFormatExpr",
        SyntaxKind::LABEL_FORMAT_MATCHER => "LabelFormatMatcher",
        SyntaxKind::DECOLORIZE_EXPR => "DecolorizeExpr",
        SyntaxKind::DROP_LABELS_EXPR => "DropLabelsExpr",
        SyntaxKind::KEEP_LABELS_EXPR => "KeepLabelsExpr",
        SyntaxKind::METRIC_EXPR => "MetricExpr",
        SyntaxKind::RANGE_AGGREGATION_EXPR => "RangeAggregationExpr",
        SyntaxKind::LOG_RANGE_EXPR => "LogRangeExpr",
        SyntaxKind::RANGE => "Range",
        SyntaxKind::OFFSET_EXPR => "OffsetExpr",
        SyntaxKind::UNWRAP_EXPR => "UnwrapExpr",
        SyntaxKind::VECTOR_AGGREGATION_EXPR => "VectorAggregationExpr",
        SyntaxKind::GROUPING => "Grouping",
        SyntaxKind::LABELS => "Labels",
        SyntaxKind::BIN_OP_EXPR => "BinOpExpr",
        SyntaxKind::BOOL_MODIFIER => "BoolModifier",
        SyntaxKind::ON_OR_IGNORING_MODIFIER => "OnOrIgnoringModifier",
        SyntaxKind::LITERAL_EXPR => "LiteralExpr",
        SyntaxKind::VECTOR_EXPR => "VectorExpr",
        SyntaxKind::ERROR => "error",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_rowan() {
        for kind in [SyntaxKind::WHITESPACE, SyntaxKind::MATCHER, SyntaxKind::ERROR] {
            let raw: rowan::SyntaxKind = kind.into();
            assert_eq!(SyntaxKind::from(raw), kind);
        }
    }

    #[test]
    fn test_kind_categories() {
        assert!(SyntaxKind::LINE_COMMENT.is_trivia());
        assert!(SyntaxKind::RANGE_OP.is_keyword());
        assert!(!SyntaxKind::IDENT.is_keyword());
        assert!(SyntaxKind::CARET.is_punct());
        assert!(SyntaxKind::BANG_TILDE.is_line_filter_op());
        assert!(!SyntaxKind::EQ_TILDE.is_line_filter_op());
        assert!(SyntaxKind::EQ_TILDE.is_matcher_op());
        assert!(!SyntaxKind::GT.is_matcher_op());
        assert!(SyntaxKind::GT_EQ.is_comparison_op());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(kind_to_name(SyntaxKind::RANGE), "Range");
        assert_eq!(kind_to_name(SyntaxKind::BY_KW), "keyword");
        assert_eq!(kind_to_name(SyntaxKind::PIPE_EQ), "'|='");
    }
}
