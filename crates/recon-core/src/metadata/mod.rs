//! Metadata assembly: one declarative rule per category, one catalogue out.

mod assemble;
mod fill;
mod rules;

pub use assemble::{Assembly, DuplicateDeclaration, assemble_catalogue, assemble_sheet};
pub use fill::{forward_fill, is_blank};
pub use rules::CategoryRule;
