//! Dataset merging: yearly stacking, lookup joins, ordering and row repair.

mod join;
mod repair;
mod sort;
mod stack;

pub use join::{Cardinality, JoinHow, JoinSpec, merge, merge_all};
pub use repair::{NoRepair, RowRepair, apply_repair};
pub use sort::sort_by_keys;
pub use stack::stack_years;
