//! CLI library components for the reconciliation tool.

pub mod logging;
pub mod pairs;
