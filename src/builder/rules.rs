//! Component preconditions, keyed by classification
//!
//! Each rule names the attributes it reads. A rule is only evaluated once
//! every one of those attributes has a value, so partially configured
//! instances are checked as far as they go.

use crate::core::error::{Error, Result};
use crate::core::scalar::Scalar;

/// One precondition over the attributes of a component class
pub struct Rule {
    pub class: &'static str,
    pub attributes: &'static [&'static str],
    pub description: &'static str,
    holds: fn(&[Scalar]) -> bool,
}

impl Rule {
    /// Attribute a violation is reported against
    pub fn blamed(&self) -> &'static str {
        self.attributes[0]
    }
}

fn num(values: &[Scalar], idx: usize) -> Option<f64> {
    values.get(idx).and_then(Scalar::as_f64)
}

fn at_least_one(values: &[Scalar]) -> bool {
    num(values, 0).map_or(false, |v| v >= 1.0)
}

pub const CYLINDER_CLASS: &str = "Cylinder";
pub const WING_CLASS: &str = "Wing";

/// Minimum wall thickness of a ported cylinder
pub const MIN_PORT_THICKNESS: f64 = 8.0;

/// Characters in a NACA four-digit profile designation
pub const NACA_PROFILE_LEN: usize = 4;

pub static RULES: &[Rule] = &[
    Rule {
        class: CYLINDER_CLASS,
        attributes: &["PORT_THICKNESS"],
        description: "PORT_THICKNESS must be at least 8",
        holds: |v| num(v, 0).map_or(false, |t| t >= MIN_PORT_THICKNESS),
    },
    Rule {
        class: CYLINDER_CLASS,
        attributes: &["PORT_THICKNESS", "DIAMETER"],
        description: "PORT_THICKNESS must be less than DIAMETER",
        holds: |v| matches!((num(v, 0), num(v, 1)), (Some(t), Some(d)) if t < d),
    },
    Rule {
        class: CYLINDER_CLASS,
        attributes: &["DIAMETER", "LENGTH"],
        description: "DIAMETER must not exceed LENGTH",
        holds: |v| matches!((num(v, 0), num(v, 1)), (Some(d), Some(l)) if d <= l),
    },
    Rule {
        class: WING_CLASS,
        attributes: &["NACA_Profile"],
        description: "NACA_Profile must be exactly 4 characters",
        holds: |v| {
            v.first()
                .map_or(false, |p| p.to_string().chars().count() == NACA_PROFILE_LEN)
        },
    },
    Rule {
        class: WING_CLASS,
        attributes: &["CHORD"],
        description: "CHORD must be at least 1",
        holds: at_least_one,
    },
    Rule {
        class: WING_CLASS,
        attributes: &["SPAN"],
        description: "SPAN must be at least 1",
        holds: at_least_one,
    },
    Rule {
        class: WING_CLASS,
        attributes: &["LOAD"],
        description: "LOAD must be at least 1",
        holds: at_least_one,
    },
];

pub fn rules_for(class: &str) -> impl Iterator<Item = &'static Rule> + '_ {
    RULES.iter().filter(move |r| r.class == class)
}

/// Check every applicable rule, failing on the first violation
pub fn check<F>(class: &str, instance: &str, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<Scalar>,
{
    for rule in rules_for(class) {
        let values: Option<Vec<Scalar>> = rule.attributes.iter().map(|a| lookup(a)).collect();
        let Some(values) = values else {
            continue;
        };
        if !(rule.holds)(&values) {
            return Err(Error::invalid_parameter(
                instance,
                rule.blamed(),
                rule.description,
            ));
        }
    }
    Ok(())
}
