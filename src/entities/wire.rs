//! Wire format for design graphs
//!
//! ```json
//! {
//!   "design": "quad",
//!   "parameters": {"arm_LENGTH": "150"},
//!   "instances": [{"model": "PortedCylinder", "name": "arm", "assignment": {"LENGTH": "arm_LENGTH"}}],
//!   "connections": [{"connector1": "Side_Connector_1", "connector2": "BaseConnection",
//!                    "instance1": "hub", "instance2": "arm"}]
//! }
//! ```
//!
//! Parameter values always travel as strings and are typed on the way in by
//! a [`TypeLadder`]. `to_wire(from_wire(d))` equals `d` up to the order of
//! instances and connections.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{Error, Result};
use crate::core::scalar::TypeLadder;
use crate::entities::design::{Connection, Design, Instance, Parameter};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireInstance {
    pub model: String,
    pub name: String,
    #[serde(default)]
    pub assignment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireConnection {
    pub connector1: String,
    pub connector2: String,
    pub instance1: String,
    pub instance2: String,
}

/// A design as exchanged with files and the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireDesign {
    pub design: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub instances: Vec<WireInstance>,
    #[serde(default)]
    pub connections: Vec<WireConnection>,
}

impl WireDesign {
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Same document with collections in a fixed order, for set comparison
    pub fn canonical(&self) -> Self {
        let mut out = self.clone();
        out.instances.sort();
        out.connections.sort();
        out
    }

    /// Set equality: same names and values, collection order ignored
    pub fn set_eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

/// Parse a wire document into a design graph using the default type ladder
pub fn from_wire(doc: &WireDesign) -> Result<Design> {
    from_wire_with(doc, &TypeLadder::default())
}

/// Parse a wire document into a design graph
///
/// Fails with `DuplicateInstance` when two instances share a name,
/// `MissingInstance` when a connection names an absent instance and
/// `MissingParameter` when an assignment names an absent parameter.
pub fn from_wire_with(doc: &WireDesign, ladder: &TypeLadder) -> Result<Design> {
    let mut design = Design::new(doc.design.clone());

    for (name, raw) in &doc.parameters {
        design.insert_parameter(Parameter {
            name: name.clone(),
            value: ladder.parse(name, raw),
        })?;
    }

    for wi in &doc.instances {
        let mut inst = Instance::new(wi.model.clone(), wi.name.clone());
        inst.assignment = wi.assignment.clone();
        design.insert_instance(inst)?;
    }

    for wc in &doc.connections {
        design.connect(Connection {
            instance1: wc.instance1.clone(),
            connector1: wc.connector1.clone(),
            instance2: wc.instance2.clone(),
            connector2: wc.connector2.clone(),
        })?;
    }

    design.check_integrity()?;
    Ok(design)
}

/// Render a design graph in wire form
pub fn to_wire(design: &Design) -> WireDesign {
    WireDesign {
        design: design.name.clone(),
        parameters: design
            .parameters
            .values()
            .map(|p| (p.name.clone(), p.value.to_string()))
            .collect(),
        instances: design
            .instances
            .values()
            .map(|i| WireInstance {
                model: i.model.clone(),
                name: i.name.clone(),
                assignment: i.assignment.clone(),
            })
            .collect(),
        connections: design
            .connections
            .iter()
            .map(|c| WireConnection {
                connector1: c.connector1.clone(),
                connector2: c.connector2.clone(),
                instance1: c.instance1.clone(),
                instance2: c.instance2.clone(),
            })
            .collect(),
    }
}
