//! Design graph entities: parameters, instances, connections and the design
//! that owns them

use std::collections::BTreeMap;

use crate::core::error::{Error, Result};
use crate::core::scalar::Scalar;
use crate::entities::component::Catalog;

/// A named scalar, possibly shared by several instance attributes
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: Scalar,
}

/// A component model placed in a design
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Catalog model name
    pub model: String,

    /// Unique within the design
    pub name: String,

    /// Attribute name -> parameter name
    pub assignment: BTreeMap<String, String>,
}

impl Instance {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
            assignment: BTreeMap::new(),
        }
    }
}

/// An undirected edge between two instance connectors
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Connection {
    pub instance1: String,
    pub connector1: String,
    pub instance2: String,
    pub connector2: String,
}

impl Connection {
    pub fn touches(&self, instance: &str) -> bool {
        self.instance1 == instance || self.instance2 == instance
    }
}

/// A complete design graph
///
/// The design exclusively owns its parameters, instances and connections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Design {
    pub name: String,
    pub parameters: BTreeMap<String, Parameter>,
    pub instances: BTreeMap<String, Instance>,
    pub connections: Vec<Connection>,
}

impl Design {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn instance(&self, name: &str) -> Result<&Instance> {
        self.instances.get(name).ok_or_else(|| Error::MissingInstance {
            design: self.name.clone(),
            instance: name.to_string(),
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Add an instance, refusing to shadow an existing name
    pub fn insert_instance(&mut self, instance: Instance) -> Result<()> {
        if self.instances.contains_key(&instance.name) {
            return Err(Error::DuplicateInstance {
                design: self.name.clone(),
                instance: instance.name,
            });
        }
        self.instances.insert(instance.name.clone(), instance);
        Ok(())
    }

    pub fn insert_parameter(&mut self, parameter: Parameter) -> Result<()> {
        if self.parameters.contains_key(&parameter.name) {
            return Err(Error::DuplicateParameter {
                design: self.name.clone(),
                parameter: parameter.name,
            });
        }
        self.parameters.insert(parameter.name.clone(), parameter);
        Ok(())
    }

    /// Point `attribute` of `instance` at an existing parameter
    pub fn assign(&mut self, instance: &str, attribute: &str, parameter: &str) -> Result<()> {
        if !self.parameters.contains_key(parameter) {
            return Err(Error::MissingParameter {
                instance: instance.to_string(),
                attribute: attribute.to_string(),
                parameter: parameter.to_string(),
            });
        }
        let design = self.name.clone();
        let inst = self
            .instances
            .get_mut(instance)
            .ok_or_else(|| Error::MissingInstance {
                design,
                instance: instance.to_string(),
            })?;
        inst.assignment
            .insert(attribute.to_string(), parameter.to_string());
        Ok(())
    }

    /// Add an edge between two existing instances
    pub fn connect(&mut self, connection: Connection) -> Result<()> {
        self.instance(&connection.instance1)?;
        self.instance(&connection.instance2)?;
        self.connections.push(connection);
        Ok(())
    }

    /// Value an instance attribute resolves to through its parameter
    pub fn attribute_value(&self, instance: &str, attribute: &str) -> Option<&Scalar> {
        let param = self.instances.get(instance)?.assignment.get(attribute)?;
        self.parameters.get(param).map(|p| &p.value)
    }

    /// Check the referential invariants of the graph
    ///
    /// Every connection endpoint must be an instance of this design and every
    /// assignment must name a parameter of this design.
    pub fn check_integrity(&self) -> Result<()> {
        for conn in &self.connections {
            self.instance(&conn.instance1)?;
            self.instance(&conn.instance2)?;
        }
        for inst in self.instances.values() {
            for (attribute, parameter) in &inst.assignment {
                if !self.parameters.contains_key(parameter) {
                    return Err(Error::MissingParameter {
                        instance: inst.name.clone(),
                        attribute: attribute.clone(),
                        parameter: parameter.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Check every connection endpoint against its model's connector set
    pub fn check_connectors(&self, catalog: &Catalog) -> Result<()> {
        for conn in &self.connections {
            for (instance, connector) in [
                (&conn.instance1, &conn.connector1),
                (&conn.instance2, &conn.connector2),
            ] {
                let inst = self.instance(instance)?;
                let model = catalog.get_model(&inst.model)?;
                if !model.has_connector(connector) {
                    return Err(Error::InvalidConnector {
                        instance: instance.clone(),
                        model: model.model.clone(),
                        connector: connector.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Instances whose model is the orientation anchor
    pub fn orient_instances<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = &'a Instance> {
        self.instances.values().filter(move |inst| {
            catalog
                .get_model(&inst.model)
                .map(|m| m.is_orient())
                .unwrap_or(false)
        })
    }

    /// Number of connections touching `instance`
    pub fn degree(&self, instance: &str) -> usize {
        self.connections.iter().filter(|c| c.touches(instance)).count()
    }
}
