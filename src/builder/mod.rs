//! Graph builder - incremental, validated construction of a design on a
//! store
//!
//! A [`Builder`] is idle until [`Builder::create_design`] hands out a
//! [`Session`]. The session mutably borrows the builder, so only one design
//! can be open at a time; [`Session::close_design`] consumes it and returns
//! the finished [`Design`].
//!
//! Every mutation is checked locally first, then sent to the store, and only
//! recorded in the session's copy of the design once the store accepted it.
//! Nothing is undone on failure: calls that already reached the store stay
//! there, and recovering means deleting and rebuilding the design.

pub mod components;
pub mod rules;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use ulid::Ulid;

use crate::core::error::{Error, Result};
use crate::core::scalar::Scalar;
use crate::core::store::GraphStore;
use crate::entities::component::{Catalog, ComponentModel, ParameterSpec, ORIENT_CLASS};
use crate::entities::design::{Connection, Design, Instance, Parameter};
use crate::query::client::Client;
use crate::study::StudyValue;

pub use components::{Cylinder, Wing, CYLINDER_MODEL, WING_MODEL};

/// Connector every orientation model exposes
pub const ORIENT_CONNECTOR: &str = "ORIENTCONN";

/// Identity of one open design session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Ulid);

impl SessionId {
    fn new() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to an instance placed in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHandle {
    session: SessionId,
    name: String,
    model: String,
}

impl InstanceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn session(&self) -> SessionId {
        self.session
    }
}

/// Reference to a study parameter created in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterHandle {
    session: SessionId,
    name: String,
}

impl ParameterHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn session(&self) -> SessionId {
        self.session
    }
}

/// Value given to an instance attribute
#[derive(Debug, Clone, PartialEq)]
pub enum ParamArg {
    /// A fresh value; the builder creates a parameter `<instance>_<attr>`
    Literal(Scalar),
    /// Point the attribute at an existing study parameter
    Reference(ParameterHandle),
}

impl From<Scalar> for ParamArg {
    fn from(v: Scalar) -> Self {
        ParamArg::Literal(v)
    }
}

impl From<i64> for ParamArg {
    fn from(v: i64) -> Self {
        ParamArg::Literal(Scalar::Int(v))
    }
}

impl From<i32> for ParamArg {
    fn from(v: i32) -> Self {
        ParamArg::Literal(Scalar::Int(v.into()))
    }
}

impl From<f64> for ParamArg {
    fn from(v: f64) -> Self {
        ParamArg::Literal(Scalar::Float(v))
    }
}

impl From<&str> for ParamArg {
    fn from(v: &str) -> Self {
        ParamArg::Literal(Scalar::Str(v.to_string()))
    }
}

impl From<String> for ParamArg {
    fn from(v: String) -> Self {
        ParamArg::Literal(Scalar::Str(v))
    }
}

impl From<ParameterHandle> for ParamArg {
    fn from(h: ParameterHandle) -> Self {
        ParamArg::Reference(h)
    }
}

impl From<&ParameterHandle> for ParamArg {
    fn from(h: &ParameterHandle) -> Self {
        ParamArg::Reference(h.clone())
    }
}

/// Builds designs on a store through a [`Client`]
pub struct Builder<S: GraphStore> {
    client: Client<S>,
    catalog: Catalog,
    overwrite: bool,
}

impl<S: GraphStore> Builder<S> {
    pub fn new(client: Client<S>, catalog: Catalog) -> Self {
        Self {
            client,
            catalog,
            overwrite: false,
        }
    }

    /// Replace an existing design of the same name instead of failing
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn client(&self) -> &Client<S> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut Client<S> {
        &mut self.client
    }

    /// Give the connection back, e.g. to close it
    pub fn into_client(self) -> Client<S> {
        self.client
    }

    /// Open a new design on the store
    pub fn create_design(&mut self, name: &str) -> Result<Session<'_, S>> {
        if self.client.design_names()?.iter().any(|d| d == name) {
            if !self.overwrite {
                return Err(Error::DesignExists {
                    design: name.to_string(),
                });
            }
            self.client.delete_design(name)?;
        }
        self.client.store_mut().create_design(name)?;

        let id = SessionId::new();
        tracing::info!(design = name, session = %id, "opened design");
        Ok(Session {
            builder: self,
            id,
            design: Design::new(name),
            next_seq: 0,
            study: BTreeSet::new(),
        })
    }
}

/// An open design
pub struct Session<'b, S: GraphStore> {
    builder: &'b mut Builder<S>,
    id: SessionId,
    design: Design,
    next_seq: u64,
    study: BTreeSet<String>,
}

impl<'b, S: GraphStore> Session<'b, S> {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Local copy of everything the store has accepted so far
    pub fn design(&self) -> &Design {
        &self.design
    }

    fn foreign(&self, name: &str) -> Error {
        Error::ForeignHandle {
            design: self.design.name.clone(),
            name: name.to_string(),
        }
    }

    fn check_instance(&self, handle: &InstanceHandle) -> Result<ComponentModel> {
        if handle.session != self.id {
            return Err(self.foreign(&handle.name));
        }
        self.design.instance(&handle.name)?;
        Ok(self.builder.catalog.get_model(&handle.model)?.clone())
    }

    fn resolve(&self, arg: &ParamArg) -> Result<Scalar> {
        match arg {
            ParamArg::Literal(v) => Ok(v.clone()),
            ParamArg::Reference(h) => {
                if h.session != self.id {
                    return Err(self.foreign(&h.name));
                }
                self.design
                    .parameter(&h.name)
                    .map(|p| p.value.clone())
                    .ok_or_else(|| self.foreign(&h.name))
            }
        }
    }

    /// Name for a new instance: the requested one, or the next counter value
    fn reserve_name(&mut self, name: Option<&str>) -> Result<String> {
        if let Some(name) = name {
            if self.design.instances.contains_key(name) {
                return Err(Error::DuplicateInstance {
                    design: self.design.name.clone(),
                    instance: name.to_string(),
                });
            }
            return Ok(name.to_string());
        }
        loop {
            self.next_seq += 1;
            let candidate = format!("I{:06}", self.next_seq);
            if !self.design.instances.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    fn place(&mut self, model: &ComponentModel, name: String) -> Result<InstanceHandle> {
        self.builder
            .client
            .store_mut()
            .create_instance(&self.design.name, &model.model, &name)?;
        self.design
            .insert_instance(Instance::new(model.model.clone(), name.clone()))?;
        tracing::debug!(design = %self.design.name, instance = %name, model = %model.model, "added instance");

        Ok(InstanceHandle {
            session: self.id,
            name,
            model: model.model.clone(),
        })
    }

    /// Place a component model in the design
    pub fn add_instance(&mut self, model: &str, name: Option<&str>) -> Result<InstanceHandle> {
        self.add_component(model, name, &[])
    }

    /// Place a component model and set its attributes in one checked call
    ///
    /// Every attribute is resolved and the precondition table for the
    /// model's class is run before anything is sent to the store.
    pub fn add_component(
        &mut self,
        model: &str,
        name: Option<&str>,
        attributes: &[(&str, ParamArg)],
    ) -> Result<InstanceHandle> {
        let model = self.builder.catalog.get_model(model)?.clone();
        let name = self.reserve_name(name)?;

        let mut resolved: Vec<(&str, &ParamArg, Scalar)> = Vec::with_capacity(attributes.len());
        for (attribute, arg) in attributes {
            if resolved.iter().any(|(a, _, _)| a == attribute) {
                return Err(Error::invalid_parameter(
                    &name,
                    *attribute,
                    "attribute given more than once",
                ));
            }
            if let ParamArg::Literal(_) = arg {
                let parameter = format!("{}_{}", name, attribute);
                if self.design.parameter(&parameter).is_some() {
                    return Err(Error::DuplicateParameter {
                        design: self.design.name.clone(),
                        parameter,
                    });
                }
            }
            let value = self.resolve(arg)?;
            check_attribute(&name, &model, attribute, arg, &value)?;
            resolved.push((*attribute, arg, value));
        }
        rules::check(&model.class, &name, |attr| {
            resolved
                .iter()
                .find(|(a, _, _)| *a == attr)
                .map(|(_, _, v)| v.clone())
        })?;

        let handle = self.place(&model, name)?;
        for (attribute, arg, value) in resolved {
            self.apply(&handle.name, attribute, arg, value)?;
        }
        Ok(handle)
    }

    pub fn add_cylinder(&mut self, name: Option<&str>, spec: Cylinder) -> Result<InstanceHandle> {
        self.add_component(CYLINDER_MODEL, name, &spec.attributes())
    }

    pub fn add_wing(&mut self, name: Option<&str>, spec: Wing) -> Result<InstanceHandle> {
        self.add_component(WING_MODEL, name, &spec.attributes())
    }

    /// Connect two instance connectors
    pub fn connect(
        &mut self,
        a: &InstanceHandle,
        connector_a: &str,
        b: &InstanceHandle,
        connector_b: &str,
    ) -> Result<()> {
        for (handle, connector) in [(a, connector_a), (b, connector_b)] {
            let model = self.check_instance(handle)?;
            if !model.has_connector(connector) {
                return Err(Error::InvalidConnector {
                    instance: handle.name.clone(),
                    model: model.model,
                    connector: connector.to_string(),
                });
            }
        }

        self.builder.client.store_mut().create_connection(
            &self.design.name,
            &a.name,
            connector_a,
            &b.name,
            connector_b,
        )?;
        self.design.connect(Connection {
            instance1: a.name.clone(),
            connector1: connector_a.to_string(),
            instance2: b.name.clone(),
            connector2: connector_b.to_string(),
        })?;
        tracing::debug!(
            design = %self.design.name,
            from = %a.name, connector_a, to = %b.name, connector_b,
            "connected"
        );
        Ok(())
    }

    /// Create a study parameter that several attributes can share
    pub fn create_parameter(
        &mut self,
        name: &str,
        value: impl Into<Scalar>,
    ) -> Result<ParameterHandle> {
        self.new_parameter(name, value.into())?;
        self.study.insert(name.to_string());
        Ok(ParameterHandle {
            session: self.id,
            name: name.to_string(),
        })
    }

    fn new_parameter(&mut self, name: &str, value: Scalar) -> Result<()> {
        if self.design.parameter(name).is_some() {
            return Err(Error::DuplicateParameter {
                design: self.design.name.clone(),
                parameter: name.to_string(),
            });
        }
        self.builder
            .client
            .store_mut()
            .create_parameter(&self.design.name, name, &value.to_string())?;
        tracing::debug!(design = %self.design.name, parameter = name, %value, "created parameter");
        self.design.insert_parameter(Parameter {
            name: name.to_string(),
            value,
        })
    }

    /// Set one attribute of a placed instance
    pub fn set_parameter(
        &mut self,
        instance: &InstanceHandle,
        attribute: &str,
        value: impl Into<ParamArg>,
    ) -> Result<()> {
        let arg = value.into();
        let model = self.check_instance(instance)?;
        let resolved = self.resolve(&arg)?;
        check_attribute(&instance.name, &model, attribute, &arg, &resolved)?;
        rules::check(&model.class, &instance.name, |attr| {
            if attr == attribute {
                Some(resolved.clone())
            } else {
                self.design.attribute_value(&instance.name, attr).cloned()
            }
        })?;

        self.apply(&instance.name, attribute, &arg, resolved)
    }

    fn apply(&mut self, instance: &str, attribute: &str, arg: &ParamArg, value: Scalar) -> Result<()> {
        let parameter = match arg {
            ParamArg::Literal(_) => {
                let name = format!("{}_{}", instance, attribute);
                self.new_parameter(&name, value)?;
                name
            }
            ParamArg::Reference(h) => h.name.clone(),
        };

        self.builder.client.store_mut().assign_parameter(
            &self.design.name,
            instance,
            attribute,
            &parameter,
        )?;
        self.design.assign(instance, attribute, &parameter)?;
        tracing::debug!(design = %self.design.name, instance, attribute, parameter = %parameter, "assigned parameter");
        Ok(())
    }

    /// Study parameters of this design, by name
    pub fn study_parameters(&self) -> Vec<&Parameter> {
        self.study
            .iter()
            .filter_map(|name| self.design.parameter(name))
            .collect()
    }

    /// Current study parameter values as study-table input
    pub fn study_defaults(&self) -> BTreeMap<String, StudyValue> {
        self.study_parameters()
            .into_iter()
            .map(|p| (p.name.clone(), StudyValue::Scalar(p.value.clone())))
            .collect()
    }

    /// Anchor the design and end the session
    ///
    /// Adds an orientation instance when the design has none, connects its
    /// `ORIENTCONN` to `connector` on `anchor` and marks it on the store.
    pub fn close_design(mut self, anchor: &InstanceHandle, connector: &str) -> Result<Design> {
        self.check_instance(anchor)?;

        let existing: Vec<(String, String)> = self
            .design
            .orient_instances(&self.builder.catalog)
            .map(|i| (i.name.clone(), i.model.clone()))
            .collect();
        let orient = match existing.as_slice() {
            [] => {
                let model = self
                    .builder
                    .catalog
                    .models()
                    .find(|m| m.is_orient())
                    .map(|m| m.model.clone())
                    .ok_or_else(|| Error::UnknownModel {
                        model: ORIENT_CLASS.to_string(),
                    })?;
                self.add_instance(&model, None)?
            }
            [(name, model)] => InstanceHandle {
                session: self.id,
                name: name.clone(),
                model: model.clone(),
            },
            many => {
                return Err(Error::invalid_parameter(
                    self.design.name.clone(),
                    ORIENT_CLASS,
                    format!("design has {} orientation instances, expected one", many.len()),
                ))
            }
        };

        self.connect(&orient, ORIENT_CONNECTOR, anchor, connector)?;
        self.builder
            .client
            .store_mut()
            .orient_design(&self.design.name, &orient.name)?;

        tracing::info!(
            design = %self.design.name,
            instances = self.design.instances.len(),
            connections = self.design.connections.len(),
            orient = %orient.name,
            "closed design"
        );
        Ok(self.design)
    }
}

/// Attribute must be declared by the model, and literals must sit inside
/// the catalog bounds
fn check_attribute(
    instance: &str,
    model: &ComponentModel,
    attribute: &str,
    arg: &ParamArg,
    value: &Scalar,
) -> Result<()> {
    let spec = model.parameters.get(attribute).ok_or_else(|| {
        Error::invalid_parameter(
            instance,
            attribute,
            format!("not a parameter of model {}", model.model),
        )
    })?;
    if let ParamArg::Literal(_) = arg {
        check_bounds(instance, attribute, spec, value)?;
    }
    Ok(())
}

fn check_bounds(instance: &str, attribute: &str, spec: &ParameterSpec, value: &Scalar) -> Result<()> {
    let (min, max) = (spec.minimum_f64(), spec.maximum_f64());
    if min.is_none() && max.is_none() {
        return Ok(());
    }
    let Some(v) = value.as_f64() else {
        return Err(Error::invalid_parameter(
            instance,
            attribute,
            format!("expected a number, got '{}'", value),
        ));
    };
    if let Some(min) = min.filter(|m| v < *m) {
        return Err(Error::invalid_parameter(
            instance,
            attribute,
            format!("{} is below the minimum {}", value, min),
        ));
    }
    if let Some(max) = max.filter(|m| v > *m) {
        return Err(Error::invalid_parameter(
            instance,
            attribute,
            format!("{} is above the maximum {}", value, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{Row, SqliteStore, StoreError};
    use std::time::Duration;

    fn builder() -> Builder<SqliteStore> {
        let client = Client::new(SqliteStore::open_in_memory().unwrap());
        Builder::new(client, Catalog::embedded().unwrap())
    }

    #[test]
    fn test_cylinder_preconditions() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();

        let arm = session
            .add_cylinder(Some("arm"), Cylinder::new(100, 70, 150))
            .unwrap();
        assert_eq!(arm.model(), CYLINDER_MODEL);
        assert_eq!(
            session.design().attribute_value("arm", "LENGTH"),
            Some(&Scalar::Int(150))
        );

        let err = session
            .add_cylinder(Some("stub"), Cylinder::new(100, 70, 90))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        assert!(session.design().instances.get("stub").is_none());
        assert!(session.design().parameter("stub_DIAMETER").is_none());
        drop(session);

        let stored = builder.client_mut().export_design("quad").unwrap();
        assert_eq!(stored.instances.len(), 1);
        assert_eq!(stored.parameters.len(), 3);
    }

    #[test]
    fn test_taken_literal_name_rejected_before_placing() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();
        session.create_parameter("arm_LENGTH", 150).unwrap();

        let err = session
            .add_cylinder(Some("arm"), Cylinder::new(100, 70, 150))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateParameter { ref parameter, .. } if parameter == "arm_LENGTH"));
        assert!(session.design().instances.get("arm").is_none());

        let err = session
            .add_component(
                CYLINDER_MODEL,
                Some("twice"),
                &[("LENGTH", Scalar::Int(150).into()), ("LENGTH", Scalar::Int(160).into())],
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref attribute, .. } if attribute == "LENGTH"));
        assert!(session.design().instances.get("twice").is_none());
        drop(session);

        let stored = builder.client_mut().export_design("quad").unwrap();
        assert!(stored.instances.is_empty());
        assert_eq!(stored.parameters.len(), 1);
    }

    #[test]
    fn test_wing_preconditions() {
        let mut builder = builder();
        let mut session = builder.create_design("glider").unwrap();
        session
            .add_wing(Some("left"), Wing::new("0012", 150, 800, 20))
            .unwrap();
        let err = session
            .add_wing(Some("right"), Wing::new("012", 150, 800, 20))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref attribute, .. } if attribute == "NACA_Profile"));
    }

    #[test]
    fn test_catalog_bounds() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();
        let hub = session.add_instance("Hub4", Some("hub")).unwrap();

        let err = session.set_parameter(&hub, "DIAMETER", 1000).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref reason, .. } if reason.contains("maximum")));
        let err = session.set_parameter(&hub, "COLOR", 1).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref reason, .. } if reason.contains("not a parameter")));

        session.set_parameter(&hub, "DIAMETER", 45.5).unwrap();
        assert_eq!(
            session.design().attribute_value("hub", "DIAMETER"),
            Some(&Scalar::Float(45.5))
        );
    }

    #[test]
    fn test_set_parameter_checks_against_current_attributes() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();
        let arm = session
            .add_cylinder(Some("arm"), Cylinder::new(100, 70, 150))
            .unwrap();
        session.set_parameter(&arm, "FRONT_ANGLE", 45).unwrap();
        assert_eq!(
            session.design().attribute_value("arm", "FRONT_ANGLE"),
            Some(&Scalar::Int(45))
        );

        let err = session.set_parameter(&arm, "PORT_THICKNESS", 120).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));

        // literal parameters are named after the attribute and never replaced
        let err = session.set_parameter(&arm, "DIAMETER", 120).unwrap_err();
        assert!(matches!(err, Error::DuplicateParameter { .. }));
    }

    #[test]
    fn test_auto_names_strictly_increase() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();

        let a = session.add_instance("Hub4", None).unwrap();
        let b = session.add_instance("Flange", None).unwrap();
        session.add_instance("Flange", Some("I000003")).unwrap();
        let c = session.add_instance("Flange", None).unwrap();

        assert_eq!(a.name(), "I000001");
        assert_eq!(b.name(), "I000002");
        assert_eq!(c.name(), "I000004");
        assert!(a.name() < b.name() && b.name() < c.name());

        let err = session.add_instance("Hub4", Some("I000001")).unwrap_err();
        assert!(matches!(err, Error::DuplicateInstance { .. }));
        let err = session.add_instance("NoSuchModel", None).unwrap_err();
        assert!(matches!(err, Error::UnknownModel { .. }));
    }

    #[test]
    fn test_invalid_connector() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();
        let hub = session.add_instance("Hub4", Some("hub")).unwrap();
        let flange = session.add_instance("Flange", Some("flange")).unwrap();

        let err = session
            .connect(&hub, "Side_Connector_9", &flange, "TopConnector")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConnector { ref connector, .. } if connector == "Side_Connector_9"));
        assert!(session.design().connections.is_empty());
    }

    #[test]
    fn test_handles_do_not_cross_sessions() {
        let mut builder = builder();
        let old_hub = {
            let mut session = builder.create_design("first").unwrap();
            let hub = session.add_instance("Hub4", Some("hub")).unwrap();
            session.close_design(&hub, "Bottom_Connector").unwrap();
            hub
        };

        let mut session = builder.create_design("second").unwrap();
        let hub = session.add_instance("Hub4", Some("hub")).unwrap();
        let err = session
            .connect(&old_hub, "Side_Connector_1", &hub, "Side_Connector_2")
            .unwrap_err();
        assert!(matches!(err, Error::ForeignHandle { ref name, .. } if name == "hub"));
    }

    #[test]
    fn test_shared_study_parameter() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();
        let length = session.create_parameter("arm_length", 150).unwrap();

        session
            .add_cylinder(Some("front"), Cylinder::new(100, 70, &length))
            .unwrap();
        session
            .add_cylinder(Some("rear"), Cylinder::new(100, 70, &length))
            .unwrap();

        let design = session.design();
        assert_eq!(design.instances["front"].assignment["LENGTH"], "arm_length");
        assert_eq!(design.instances["rear"].assignment["LENGTH"], "arm_length");
        assert_eq!(session.study_parameters().len(), 1);
        assert_eq!(
            session.study_defaults().get("arm_length"),
            Some(&StudyValue::Scalar(Scalar::Int(150)))
        );

        let err = session.create_parameter("arm_length", 1).unwrap_err();
        assert!(matches!(err, Error::DuplicateParameter { .. }));
    }

    #[test]
    fn test_references_are_checked_by_value() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();
        let short = session.create_parameter("short", 90).unwrap();
        let err = session
            .add_cylinder(Some("arm"), Cylinder::new(100, 70, short))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_close_design_adds_orientation() {
        let mut builder = builder();
        let design = {
            let mut session = builder.create_design("quad").unwrap();
            let hub = session.add_instance("Hub4", Some("hub")).unwrap();
            let arm = session
                .add_cylinder(Some("arm"), Cylinder::new(100, 70, 150))
                .unwrap();
            session
                .connect(&hub, "Side_Connector_1", &arm, "BaseConnection")
                .unwrap();
            session.close_design(&hub, "Bottom_Connector").unwrap()
        };

        let orient: Vec<_> = design.orient_instances(builder.catalog()).collect();
        assert_eq!(orient.len(), 1);
        assert_eq!(design.degree(&orient[0].name), 1);

        let exported = builder.client_mut().export_design("quad").unwrap();
        assert!(exported.set_eq(&crate::entities::to_wire(&design)));
        builder.into_client().close().unwrap();
    }

    #[test]
    fn test_close_design_refuses_two_orientations() {
        let mut builder = builder();
        let mut session = builder.create_design("quad").unwrap();
        let hub = session.add_instance("Hub4", Some("hub")).unwrap();
        session.add_instance("Orient", None).unwrap();
        session.add_instance("Orient", None).unwrap();
        let err = session.close_design(&hub, "Bottom_Connector").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { ref attribute, .. } if attribute == "Orient"));
    }

    #[test]
    fn test_existing_design_needs_overwrite() {
        let mut builder = builder();
        {
            let mut session = builder.create_design("quad").unwrap();
            session.add_instance("Hub4", Some("hub")).unwrap();
        }
        assert!(matches!(
            builder.create_design("quad"),
            Err(Error::DesignExists { .. })
        ));

        let mut builder = builder.with_overwrite(true);
        {
            let session = builder.create_design("quad").unwrap();
            assert!(session.design().instances.is_empty());
        }
        let exported = builder.client_mut().export_design("quad").unwrap();
        assert!(exported.instances.is_empty());
    }

    /// Store that refuses every connection
    struct NoConnections(SqliteStore);

    impl GraphStore for NoConnections {
        fn create_design(&mut self, name: &str) -> Result<(), StoreError> {
            self.0.create_design(name)
        }
        fn create_instance(&mut self, design: &str, model: &str, name: &str) -> Result<(), StoreError> {
            self.0.create_instance(design, model, name)
        }
        fn create_parameter(&mut self, design: &str, name: &str, value: &str) -> Result<(), StoreError> {
            self.0.create_parameter(design, name, value)
        }
        fn assign_parameter(
            &mut self,
            design: &str,
            instance: &str,
            attribute: &str,
            parameter: &str,
        ) -> Result<(), StoreError> {
            self.0.assign_parameter(design, instance, attribute, parameter)
        }
        fn create_connection(
            &mut self,
            _design: &str,
            _instance1: &str,
            _connector1: &str,
            _instance2: &str,
            _connector2: &str,
        ) -> Result<(), StoreError> {
            Err(StoreError::Rejected {
                operation: "create_connection".to_string(),
                message: "connection refused".to_string(),
            })
        }
        fn orient_design(&mut self, design: &str, instance: &str) -> Result<(), StoreError> {
            self.0.orient_design(design, instance)
        }
        fn delete_design(&mut self, name: &str) -> Result<(), StoreError> {
            self.0.delete_design(name)
        }
        fn design_names(&mut self) -> Result<Vec<String>, StoreError> {
            self.0.design_names()
        }
        fn submit(&mut self, query: &str, timeout: Duration) -> Result<Vec<Row>, StoreError> {
            self.0.submit(query, timeout)
        }
        fn close(&mut self) -> Result<(), StoreError> {
            self.0.close()
        }
        fn is_open(&self) -> bool {
            self.0.is_open()
        }
    }

    #[test]
    fn test_failed_call_leaves_earlier_mutations() {
        let store = NoConnections(SqliteStore::open_in_memory().unwrap());
        let mut builder = Builder::new(Client::new(store), Catalog::embedded().unwrap());
        {
            let mut session = builder.create_design("quad").unwrap();
            let hub = session.add_instance("Hub4", Some("hub")).unwrap();
            let arm = session
                .add_cylinder(Some("arm"), Cylinder::new(100, 70, 150))
                .unwrap();
            let err = session
                .connect(&hub, "Side_Connector_1", &arm, "BaseConnection")
                .unwrap_err();
            assert!(matches!(err, Error::Store(StoreError::Rejected { .. })));
            assert!(session.design().connections.is_empty());
        }

        let stored = builder.client_mut().export_design("quad").unwrap();
        assert_eq!(stored.instances.len(), 2);
        assert!(stored.connections.is_empty());
        builder.into_client().close().unwrap();
    }
}
