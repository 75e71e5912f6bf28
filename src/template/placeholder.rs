//! Grammar-safe placeholders for template variable references
//!
//! The three reference syntaxes contain characters the grammar rejects
//! (`$`, `[[`, `${`). Before parsing, every reference is encoded as an
//! identifier-shaped placeholder:
//!
//! ```text
//! $name           → __V_0__name__V__
//! [[name:fmt]]    → __V_1__name__V____F__fmt__F__
//! ${name:fmt}     → __V_2__name__V____F__fmt__F__
//! ```
//!
//! Decoding restores the original text byte-for-byte.

use regex::{Captures, Regex};
use std::sync::LazyLock;

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\w+)|\[\[(\w+?)(?::(\w+))?\]\]|\$\{(\w+(?:\.[^:^}]+)?)(?::([^}]+))?\}")
        .expect("valid variable regex")
});

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"__V_(\d)__(.+?)__V__(?:__F__(.+?)__F__)?").expect("valid placeholder regex")
});

/// Which of the three reference syntaxes a variable was written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableSyntax {
    /// `$name`
    Dollar,
    /// `[[name]]` or `[[name:fmt]]`
    Bracket,
    /// `${name}` or `${name:fmt}`
    Brace,
}

impl VariableSyntax {
    fn tag(self) -> char {
        match self {
            Self::Dollar => '0',
            Self::Bracket => '1',
            Self::Brace => '2',
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "0" => Some(Self::Dollar),
            "1" => Some(Self::Bracket),
            "2" => Some(Self::Brace),
            _ => None,
        }
    }
}

/// One variable reference, alive only between encoding and decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVariableToken {
    pub kind: VariableSyntax,
    pub name: String,
    pub format: Option<String>,
}

impl TemplateVariableToken {
    fn from_reference(caps: &Captures<'_>) -> Option<Self> {
        let text = |i: usize| caps.get(i).map(|m| m.as_str().to_string());

        if let Some(name) = text(1) {
            return Some(Self {
                kind: VariableSyntax::Dollar,
                name,
                format: None,
            });
        }
        if let Some(name) = text(2) {
            return Some(Self {
                kind: VariableSyntax::Bracket,
                name,
                format: text(3),
            });
        }
        text(4).map(|name| Self {
            kind: VariableSyntax::Brace,
            name,
            format: text(5),
        })
    }

    fn from_placeholder(caps: &Captures<'_>) -> Option<Self> {
        Some(Self {
            kind: VariableSyntax::from_tag(caps.get(1)?.as_str())?,
            name: caps.get(2)?.as_str().to_string(),
            format: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }

    /// The grammar-safe encoding
    pub fn placeholder(&self) -> String {
        let mut out = format!("__V_{}__{}__V__", self.kind.tag(), self.name);
        if let Some(format) = &self.format {
            out.push_str("__F__");
            out.push_str(format);
            out.push_str("__F__");
        }
        out
    }

    /// The reference as the user wrote it
    pub fn to_source(&self) -> String {
        let suffix = self
            .format
            .as_ref()
            .map(|f| format!(":{f}"))
            .unwrap_or_default();
        match self.kind {
            VariableSyntax::Dollar => format!("${}", self.name),
            VariableSyntax::Bracket => format!("[[{}{}]]", self.name, suffix),
            VariableSyntax::Brace => format!("${{{}{}}}", self.name, suffix),
        }
    }
}

/// Replace every variable reference with its placeholder
pub fn mask_placeholders(query: &str) -> String {
    VARIABLE_RE
        .replace_all(query, |caps: &Captures<'_>| {
            match TemplateVariableToken::from_reference(caps) {
                Some(token) => token.placeholder(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Restore every placeholder to the reference it was made from
pub fn unmask_placeholders(text: &str) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures<'_>| {
            match TemplateVariableToken::from_placeholder(caps) {
                Some(token) => token.to_source(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
