//! Typed shortcuts for the components the precondition table knows about

use crate::builder::ParamArg;

/// Catalog model placed by [`Session::add_cylinder`](crate::builder::Session::add_cylinder)
pub const CYLINDER_MODEL: &str = "PortedCylinder";

/// Catalog model placed by [`Session::add_wing`](crate::builder::Session::add_wing)
pub const WING_MODEL: &str = "Wing";

/// A ported cylinder: tube with a wall of `port_thickness`
#[derive(Debug, Clone)]
pub struct Cylinder {
    pub diameter: ParamArg,
    pub port_thickness: ParamArg,
    pub length: ParamArg,
    pub front_angle: Option<ParamArg>,
}

impl Cylinder {
    pub fn new(
        diameter: impl Into<ParamArg>,
        port_thickness: impl Into<ParamArg>,
        length: impl Into<ParamArg>,
    ) -> Self {
        Self {
            diameter: diameter.into(),
            port_thickness: port_thickness.into(),
            length: length.into(),
            front_angle: None,
        }
    }

    pub fn front_angle(mut self, angle: impl Into<ParamArg>) -> Self {
        self.front_angle = Some(angle.into());
        self
    }

    pub(crate) fn attributes(&self) -> Vec<(&'static str, ParamArg)> {
        let mut attrs = vec![
            ("DIAMETER", self.diameter.clone()),
            ("PORT_THICKNESS", self.port_thickness.clone()),
            ("LENGTH", self.length.clone()),
        ];
        if let Some(angle) = &self.front_angle {
            attrs.push(("FRONT_ANGLE", angle.clone()));
        }
        attrs
    }
}

/// A wing panel with a NACA four-digit profile
#[derive(Debug, Clone)]
pub struct Wing {
    pub profile: ParamArg,
    pub chord: ParamArg,
    pub span: ParamArg,
    pub load: ParamArg,
}

impl Wing {
    pub fn new(
        profile: impl Into<ParamArg>,
        chord: impl Into<ParamArg>,
        span: impl Into<ParamArg>,
        load: impl Into<ParamArg>,
    ) -> Self {
        Self {
            profile: profile.into(),
            chord: chord.into(),
            span: span.into(),
            load: load.into(),
        }
    }

    pub(crate) fn attributes(&self) -> Vec<(&'static str, ParamArg)> {
        vec![
            ("NACA_Profile", self.profile.clone()),
            ("CHORD", self.chord.clone()),
            ("SPAN", self.span.clone()),
            ("LOAD", self.load.clone()),
        ]
    }
}
