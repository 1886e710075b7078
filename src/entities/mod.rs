//! Entity type definitions
//!
//! **Corpus:**
//! - [`ComponentModel`] - immutable catalog entry: classification, properties,
//!   parameters and connectors
//! - [`Catalog`] - every known model, keyed by name
//!
//! **Design graph:**
//! - [`Design`] - owns [`Parameter`]s, [`Instance`]s and [`Connection`]s
//! - [`WireDesign`] - the exchange format, see [`wire`]

pub mod component;
pub mod design;
pub mod wire;

pub use component::{Catalog, ComponentModel, ParameterSpec};
pub use design::{Connection, Design, Instance, Parameter};
pub use wire::{from_wire, from_wire_with, to_wire, WireDesign};
