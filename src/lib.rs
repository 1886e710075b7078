//! ADG: Airframe Design Graph
//!
//! Describe an airframe as a graph of typed, parameterized components, push
//! that graph into a graph store and generate parameter tables for batch
//! experiment runs.

pub mod builder;
pub mod cli;
pub mod core;
pub mod entities;
pub mod query;
pub mod schema;
pub mod study;

pub use crate::core::error::{Error, Result};
