//! Agent domain types: identifiers, run context, insights, and reports.

pub mod context;
pub mod insight;
pub mod report;
pub mod value_objects;
