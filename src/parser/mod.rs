//! Rowan-based parser for LogQL
//!
//! This module provides a lossless parser using:
//! - **logos** for fast lexing
//! - **rowan** for the CST (Concrete Syntax Tree)
//!
//! The CST preserves all whitespace and comments; a typed AST layer sits on
//! top of it.
//!
//! ## Architecture
//!
//! ```text
//! Query Text
//!     ↓
//! Lexer (logos) → Tokens with SyntaxKind
//!     ↓
//! Parser → GreenNode tree (immutable, cheap to clone)
//!     ↓
//! SyntaxNode (rowan) → CST with parent pointers
//!     ↓
//! AST layer → Typed wrappers over SyntaxNode
//! ```
//!
//! Parsing never fails: malformed input produces `ERROR` nodes in the tree
//! and entries in [`Parse::errors`].

#[allow(clippy::module_inception)]
mod parser;

pub mod ast;
mod grammar;
mod lexer;
mod syntax_kind;

pub(crate) use grammar::{RANGE_FUNCTIONS, VECTOR_FUNCTIONS};

pub use ast::AstNode;
pub use lexer::{Lexer, Token, tokenize};
pub use parser::{Parse, SyntaxError, parse};
pub use syntax_kind::{
    LogQLLanguage, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxNodeChildren, SyntaxToken,
    kind_to_name,
};

/// Re-export rowan types for convenience
pub use rowan::{GreenNode, TextRange, TextSize};
