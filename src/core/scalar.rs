//! Scalar parameter values and the wire type ladder

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker used when no marker list is configured
pub const DEFAULT_STRING_MARKER: &str = "NACA";

/// A parameter value: integer, float or string
///
/// Every scalar has a canonical string form (its `Display`), which is how it
/// travels on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Numeric view of the value, if it has one
    ///
    /// Strings count as numeric when they parse as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Str(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::Float(_))
    }

    /// Convert a JSON scalar into a `Scalar`, or `None` for arrays/objects/null
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_f64().map(Scalar::Float)),
            serde_json::Value::String(s) => Some(Scalar::Str(s.clone())),
            serde_json::Value::Bool(b) => Some(Scalar::Str(b.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v as i64)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// Decides how wire strings become typed scalars
///
/// Parameters whose name contains one of the string markers stay strings
/// (profile codes such as `0012` must keep their leading zeros). Everything
/// else is tried as an integer, then a float, then kept as a string. A
/// numeric reading only wins when rendering it gives back the exact source
/// text, so parsing never changes what gets written out again.
#[derive(Debug, Clone)]
pub struct TypeLadder {
    string_markers: Vec<String>,
}

impl Default for TypeLadder {
    fn default() -> Self {
        Self::new(vec![DEFAULT_STRING_MARKER.to_string()])
    }
}

impl TypeLadder {
    pub fn new(string_markers: Vec<String>) -> Self {
        Self { string_markers }
    }

    pub fn markers(&self) -> &[String] {
        &self.string_markers
    }

    /// Type a wire value for the parameter called `name`
    pub fn parse(&self, name: &str, raw: &str) -> Scalar {
        if self.string_markers.iter().any(|m| name.contains(m.as_str())) {
            return Scalar::Str(raw.to_string());
        }
        if let Ok(i) = raw.parse::<i64>() {
            if i.to_string() == raw {
                return Scalar::Int(i);
            }
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() && f.to_string() == raw {
                return Scalar::Float(f);
            }
        }
        Scalar::Str(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_integer_then_float_then_string() {
        let ladder = TypeLadder::default();
        assert_eq!(ladder.parse("SPAN", "450"), Scalar::Int(450));
        assert_eq!(ladder.parse("SPAN", "-3"), Scalar::Int(-3));
        assert_eq!(ladder.parse("CHORD", "12.5"), Scalar::Float(12.5));
        assert_eq!(ladder.parse("MATERIAL", "carbon"), Scalar::Str("carbon".into()));
    }

    #[test]
    fn test_ladder_marker_forces_string() {
        let ladder = TypeLadder::default();
        assert_eq!(
            ladder.parse("wing_NACA_Profile", "0012"),
            Scalar::Str("0012".into())
        );
        assert_eq!(ladder.parse("wing_NACA_Profile", "2412"), Scalar::Str("2412".into()));
    }

    #[test]
    fn test_ladder_keeps_non_canonical_numbers_as_strings() {
        let ladder = TypeLadder::default();
        assert_eq!(ladder.parse("A", "007"), Scalar::Str("007".into()));
        assert_eq!(ladder.parse("A", "1.50"), Scalar::Str("1.50".into()));
        assert_eq!(ladder.parse("A", "1e3"), Scalar::Str("1e3".into()));
        assert_eq!(ladder.parse("A", "+4"), Scalar::Str("+4".into()));
    }

    #[test]
    fn test_display_is_canonical() {
        assert_eq!(Scalar::Int(100).to_string(), "100");
        assert_eq!(Scalar::Float(0.25).to_string(), "0.25");
        assert_eq!(Scalar::Float(100.0).to_string(), "100");
        assert_eq!(Scalar::Str("0012".into()).to_string(), "0012");
    }

    #[test]
    fn test_custom_markers() {
        let ladder = TypeLadder::new(vec!["PROFILE".into(), "CODE".into()]);
        assert_eq!(ladder.parse("wing_PROFILE", "4412"), Scalar::Str("4412".into()));
        assert_eq!(ladder.parse("wing_NACA", "4412"), Scalar::Int(4412));
    }
}
