//! Visual query: the structured, UI-editable form of a query
//!
//! - `builder` - query text → [`VisualQuery`] plus recoverable errors
//! - `render` - [`VisualQuery`] → query text

mod builder;
mod error;
mod model;
mod render;

pub use builder::{BuildResult, build};
pub use error::ParsingError;
pub use model::{
    BinaryOperand, LabelMatcher, MatchOperator, Operation, VectorMatchesType, VisualQuery,
    operation_id,
};
pub use render::render;
