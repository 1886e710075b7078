//! CLI command implementations

pub mod corpus;
pub mod design;
pub mod query;
pub mod study;
