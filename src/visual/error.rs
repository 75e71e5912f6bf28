//! Recoverable errors found while building a visual query

use thiserror::Error;

/// A part of the query the builder could not represent.
///
/// Offsets refer to the masked query text; `text` is the unmasked source of
/// the offending node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[error("cannot parse `{text}` at {from}..{to}")]
pub struct ParsingError {
    pub text: String,
    pub from: usize,
    pub to: usize,
    /// Name of the grammar node containing the error, e.g. `Matcher`
    pub parent_type: Option<String>,
}
