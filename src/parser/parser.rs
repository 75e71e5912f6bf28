//! Recursive descent parser for LogQL
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST: every input byte,
//! including whitespace and comments, ends up in the tree.

use super::grammar;
use super::lexer::{Lexer, Token};
use super::syntax_kind::SyntaxKind;
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse LogQL source into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let mut parser = Parser::new(&tokens, input.len());
    grammar::root(&mut parser);
    let parse = parser.finish();
    tracing::trace!(errors = parse.errors.len(), "parsed LogQL query");
    parse
}

/// The parser state
pub(crate) struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    end: TextSize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], len: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end: TextSize::new(len as u32),
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    pub(crate) fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    pub(crate) fn current_text(&self) -> &'a str {
        self.tokens.get(self.pos).map(|t| t.text).unwrap_or("")
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_eof() && self.current_kind() == kind
    }

    pub(crate) fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_eof() && kinds.contains(&self.current_kind())
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Index of the nth significant token ahead (skipping trivia)
    fn nth_index(&self, n: usize) -> Option<usize> {
        let mut count = 0;
        for (idx, token) in self.tokens.iter().enumerate().skip(self.pos) {
            if token.kind.is_trivia() {
                continue;
            }
            if count == n {
                return Some(idx);
            }
            count += 1;
        }
        None
    }

    /// Look ahead, skipping trivia. Returns `ERROR` past the end of input.
    pub(crate) fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_index(n)
            .map(|idx| self.tokens[idx].kind)
            .unwrap_or(SyntaxKind::ERROR)
    }

    /// Check whether the nth significant token is the identifier `word`
    pub(crate) fn nth_is_word(&self, n: usize, word: &str) -> bool {
        self.nth_index(n)
            .map(|idx| self.tokens[idx].kind == SyntaxKind::IDENT && self.tokens[idx].text == word)
            .unwrap_or(false)
    }

    /// Text of the nth significant token, empty past the end of input
    pub(crate) fn nth_text(&self, n: usize) -> &'a str {
        self.nth_index(n)
            .map(|idx| self.tokens[idx].text)
            .unwrap_or("")
    }

    /// Check whether only trivia remains before the next significant token
    /// and that trivia contains a line comment
    pub(crate) fn comment_ahead(&self) -> bool {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .take_while(|t| t.kind.is_trivia())
            .any(|t| t.kind == SyntaxKind::LINE_COMMENT)
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    pub(crate) fn bump(&mut self) {
        if let Some(token) = self.current() {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    /// Consume the current token, recording it under a different kind.
    /// Used for contextual keywords, which the lexer reports as identifiers.
    pub(crate) fn bump_remap(&mut self, kind: SyntaxKind) {
        if let Some(token) = self.current() {
            self.builder.token(kind.into(), token.text);
            self.pos += 1;
        }
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skip trivia, then consume `kind` or record a missing-token error
    pub(crate) fn expect(&mut self, kind: SyntaxKind) -> bool {
        self.skip_trivia();
        if self.eat(kind) {
            true
        } else {
            self.error_missing(format!(
                "expected {}",
                super::syntax_kind::kind_to_name(kind)
            ));
            false
        }
    }

    pub(crate) fn skip_trivia(&mut self) {
        while self.current().map(|t| t.kind.is_trivia()).unwrap_or(false) {
            self.bump();
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn current_range(&self) -> TextRange {
        self.current()
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .unwrap_or_else(|| TextRange::empty(self.end))
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let range = self.current_range();
        self.errors.push(SyntaxError::new(message, range));
    }

    /// Record an error and leave an empty `ERROR` node where the missing
    /// token should have been
    pub(crate) fn error_missing(&mut self, message: impl Into<String>) {
        let range = TextRange::empty(self.current_range().start());
        self.errors.push(SyntaxError::new(message, range));
        self.builder.start_node(SyntaxKind::ERROR.into());
        self.builder.finish_node();
    }

    pub(crate) fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.builder.start_node(SyntaxKind::ERROR.into());
        // Trivia is only absorbed when more skipped tokens follow it
        let mut consumed = false;
        while self
            .nth_index(0)
            .is_some_and(|idx| !recovery.contains(&self.tokens[idx].kind))
        {
            self.skip_trivia();
            self.bump();
            consumed = true;
        }
        // Always consume at least one token to make progress
        if !consumed && !self.at_eof() {
            self.bump();
        }
        self.builder.finish_node();
    }

    /// Recover if there is anything to skip, otherwise report a missing token
    pub(crate) fn recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        if self.at_eof() || self.at_any(recovery) {
            self.error_missing(message);
        } else {
            self.error_recover(message, recovery);
        }
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    pub(crate) fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind.into());
    }

    pub(crate) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        self.builder.checkpoint()
    }

    /// Wrap everything emitted since `checkpoint` into a new node
    pub(crate) fn start_node_at(&mut self, checkpoint: Checkpoint, kind: SyntaxKind) {
        self.builder.start_node_at(checkpoint, kind.into());
    }
}
