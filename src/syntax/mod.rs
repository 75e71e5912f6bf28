// Syntax utilities built on the parser
pub mod formatter;

pub use formatter::{FormatOptions, format, format_with_options, format_with_variables};
