//! Logos-based lexer for LogQL
//!
//! Fast tokenization using the logos crate. The lexer is lossless: every
//! byte of input ends up in exactly one token, unknown bytes become `ERROR`.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"#[^\n]*")]
    LineComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?")]
    Number,

    #[regex(r"([0-9]+(\.[0-9]+)?(ns|us|µs|ms|s|m|h|d|w|y))+")]
    Duration,

    #[regex(r"[0-9]+(\.[0-9]+)?([kKmMgGtTpPeE][iI]?[bB]|[bB])")]
    Bytes,

    #[regex(r#""([^"\\]|\\.)*""#)]
    #[regex(r"`[^`]*`")]
    String,

    // =========================================================================
    // MULTI-CHARACTER OPERATORS (must come before single-char)
    // =========================================================================
    #[token("|=")]
    PipeEq,

    #[token("|~")]
    PipeTilde,

    #[token("!=")]
    BangEq,

    #[token("!~")]
    BangTilde,

    #[token("=~")]
    EqTilde,

    #[token("==")]
    EqEq,

    #[token(">=")]
    GtEq,

    #[token("<=")]
    LtEq,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("|")]
    Pipe,
    #[token("=")]
    Eq,
    #[token(">")]
    Gt,
    #[token("<")]
    Lt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("^")]
    Caret,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        match token {
            LogosToken::Whitespace => SyntaxKind::WHITESPACE,
            LogosToken::LineComment => SyntaxKind::LINE_COMMENT,
            LogosToken::Ident => SyntaxKind::IDENT,
            LogosToken::Number => SyntaxKind::NUMBER,
            LogosToken::Duration => SyntaxKind::DURATION,
            LogosToken::Bytes => SyntaxKind::BYTES,
            LogosToken::String => SyntaxKind::STRING,
            LogosToken::PipeEq => SyntaxKind::PIPE_EQ,
            LogosToken::PipeTilde => SyntaxKind::PIPE_TILDE,
            LogosToken::BangEq => SyntaxKind::BANG_EQ,
            LogosToken::BangTilde => SyntaxKind::BANG_TILDE,
            LogosToken::EqTilde => SyntaxKind::EQ_TILDE,
            LogosToken::EqEq => SyntaxKind::EQ_EQ,
            LogosToken::GtEq => SyntaxKind::GT_EQ,
            LogosToken::LtEq => SyntaxKind::LT_EQ,
            LogosToken::LBrace => SyntaxKind::L_BRACE,
            LogosToken::RBrace => SyntaxKind::R_BRACE,
            LogosToken::LBracket => SyntaxKind::L_BRACKET,
            LogosToken::RBracket => SyntaxKind::R_BRACKET,
            LogosToken::LParen => SyntaxKind::L_PAREN,
            LogosToken::RParen => SyntaxKind::R_PAREN,
            LogosToken::Comma => SyntaxKind::COMMA,
            LogosToken::Pipe => SyntaxKind::PIPE,
            LogosToken::Eq => SyntaxKind::EQ,
            LogosToken::Gt => SyntaxKind::GT,
            LogosToken::Lt => SyntaxKind::LT,
            LogosToken::Plus => SyntaxKind::PLUS,
            LogosToken::Minus => SyntaxKind::MINUS,
            LogosToken::Star => SyntaxKind::STAR,
            LogosToken::Slash => SyntaxKind::SLASH,
            LogosToken::Percent => SyntaxKind::PERCENT,
            LogosToken::Caret => SyntaxKind::CARET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        tokenize(input)
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != SyntaxKind::WHITESPACE)
            .collect()
    }

    #[test]
    fn test_lex_selector() {
        assert_eq!(
            kinds(r#"{job="api", env=~"prod.*"}"#),
            vec![
                SyntaxKind::L_BRACE,
                SyntaxKind::IDENT,
                SyntaxKind::EQ,
                SyntaxKind::STRING,
                SyntaxKind::COMMA,
                SyntaxKind::IDENT,
                SyntaxKind::EQ_TILDE,
                SyntaxKind::STRING,
                SyntaxKind::R_BRACE,
            ]
        );
    }

    #[test]
    fn test_lex_line_filter_operators() {
        assert_eq!(
            kinds(r#"|= "a" != "b" |~ `c` !~ "d" | json"#),
            vec![
                SyntaxKind::PIPE_EQ,
                SyntaxKind::STRING,
                SyntaxKind::BANG_EQ,
                SyntaxKind::STRING,
                SyntaxKind::PIPE_TILDE,
                SyntaxKind::STRING,
                SyntaxKind::BANG_TILDE,
                SyntaxKind::STRING,
                SyntaxKind::PIPE,
                SyntaxKind::IDENT,
            ]
        );
    }

    #[test]
    fn test_lex_numeric_literals() {
        assert_eq!(kinds("5m"), vec![SyntaxKind::DURATION]);
        assert_eq!(kinds("1h30m"), vec![SyntaxKind::DURATION]);
        assert_eq!(kinds("250ms"), vec![SyntaxKind::DURATION]);
        assert_eq!(kinds("20MB"), vec![SyntaxKind::BYTES]);
        assert_eq!(kinds("1.5KiB"), vec![SyntaxKind::BYTES]);
        assert_eq!(kinds("0.99"), vec![SyntaxKind::NUMBER]);
        assert_eq!(kinds("1e3"), vec![SyntaxKind::NUMBER]);
    }

    #[test]
    fn test_lex_comment_runs_to_end_of_line() {
        let tokens = tokenize("# hello |= \"x\"\n{}");
        assert_eq!(tokens[0].kind, SyntaxKind::LINE_COMMENT);
        assert_eq!(tokens[0].text, "# hello |= \"x\"");
        assert_eq!(tokens[1].kind, SyntaxKind::WHITESPACE);
    }

    #[test]
    fn test_lex_comment_at_end_of_input() {
        let tokens = tokenize("{} # trailing");
        let last = tokens.last().unwrap();
        assert_eq!(last.kind, SyntaxKind::LINE_COMMENT);
        assert_eq!(last.text, "# trailing");
    }

    #[test]
    fn test_lex_is_lossless() {
        let input = "sum by (job) (rate({a=\"b\"} |= `x` [5m])) > 0.5 $ ";
        let rebuilt: String = tokenize(input).iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_lex_unknown_byte_is_error() {
        let tokens = tokenize("$");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, SyntaxKind::ERROR);
    }

    #[test]
    fn test_lex_offsets() {
        let tokens = tokenize("{a}");
        assert_eq!(tokens[1].offset, TextSize::new(1));
        assert_eq!(tokens[2].offset, TextSize::new(2));
    }
}
