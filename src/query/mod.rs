//! Template query protocol
//!
//! - [`template`] splits template files into blocks and substitutes keys
//! - [`client`] runs templates against a [`GraphStore`](crate::core::GraphStore)
//!   and moves whole designs in and out of it

pub mod client;
pub mod template;

pub use client::{BlockResult, Client, DESIGN_KEY};
pub use template::{Template, TemplateLoader, TemplateSource};
