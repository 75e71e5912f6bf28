//! # logql-syntax
//!
//! Lossless parsing, canonical formatting and visual query building for
//! LogQL, the Loki log query language.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! visual    → VisualQuery model, builder (text → model), renderer (model → text)
//! syntax    → Canonical formatter
//!   ↓
//! parser    → Logos lexer, recursive-descent parser, typed AST over rowan
//!   ↓
//! template  → Template variable masking and registry substitution
//! ```
//!
//! `highlight` stands apart: it scans raw query text without parsing.

// ============================================================================
// MODULES (dependency order: template → parser → syntax/visual)
// ============================================================================

/// Template variables: placeholder masking, registry value substitution
pub mod template;

/// Parser: Logos lexer, recursive-descent parser, typed AST
pub mod parser;

/// Syntax utilities: canonical formatter
pub mod syntax;

/// Visual query model, builder and renderer
pub mod visual;

/// Highlight terms extracted from line filters
pub mod highlight;

// Re-export the entry points
pub use highlight::highlight;
pub use parser::{Parse, SyntaxError, parse};
pub use syntax::{FormatOptions, format, format_with_options, format_with_variables};
pub use template::{VariableDefinition, VariableKind, VariableRegistry};
pub use visual::{BuildResult, ParsingError, VisualQuery, build, render};
