//! Template variable handling
//!
//! Queries can reference dashboard variables as `$name`, `[[name:fmt]]` or
//! `${name:fmt}`. Two independent passes deal with them:
//!
//! - `placeholder` - unconditional, reversible encoding of every reference
//!   into a token the grammar accepts
//! - `registry` - substitution of known variables with their resolved values

mod placeholder;
mod registry;

pub use placeholder::{
    TemplateVariableToken, VariableSyntax, mask_placeholders, unmask_placeholders,
};
pub use registry::{
    AppliedSubstitution, VariableDefinition, VariableKind, VariableRegistry, mask_variables,
    unmask_variables,
};
