//! Indentation settings for the canonical formatter
//!
//! One indentation level is added per nesting step: pipeline stages sit one
//! level below their selector, and the arguments of `rate(...)` or
//! `sum(...)` one level below the function name.

/// Indentation used by [`format_with_options`](super::format_with_options)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Spaces per level; ignored when indenting with tabs
    pub tab_size: usize,
    /// `false` indents with one tab per level
    pub insert_spaces: bool,
}

impl Default for FormatOptions {
    /// Two spaces per level, the layout of `{a="b"}\n  | json`
    fn default() -> Self {
        Self {
            tab_size: 2,
            insert_spaces: true,
        }
    }
}

impl FormatOptions {
    /// Leading whitespace for a line nested `level` steps deep
    pub fn indent(&self, level: usize) -> String {
        if self.insert_spaces {
            " ".repeat(self.tab_size * level)
        } else {
            "\t".repeat(level)
        }
    }
}
