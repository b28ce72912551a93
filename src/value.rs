//! Value types that atoms can hold.
//!
//! Values cover the literal positions of relations and attributes:
//! primitives, bare symbols (atom references), GPS coordinates, and
//! timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Possible values an atom position can hold.
///
/// `Symbol` is a bare identifier (an atom reference such as an event or user
/// id, or an enum-like word such as `High`); `Str` is quoted free text.
///
/// # Examples
///
/// ```
/// use witnesskb::Value;
///
/// let sym = Value::symbol("drought_a1b2c3d4");
/// let text = Value::from("River bed fully dry");
///
/// assert!(sym.is_symbol());
/// assert!(text.is_str());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
    Coords {
        lat: f64,
        lon: f64,
    },
    Time(DateTime<Utc>),
}

impl Value {
    /// Creates a symbol value.
    #[must_use]
    pub fn symbol(s: impl Into<String>) -> Self {
        Self::Symbol(s.into())
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_str(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    pub const fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    pub const fn is_coords(&self) -> bool {
        matches!(self, Self::Coords { .. })
    }

    pub const fn is_time(&self) -> bool {
        matches!(self, Self::Time(_))
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Self::Symbol(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_coords(&self) -> Option<(f64, f64)> {
        match self {
            Self::Coords { lat, lon } => Some((*lat, *lon)),
            _ => None,
        }
    }

    pub const fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Time(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Symbol(_) => "symbol",
            Self::Coords { .. } => "coords",
            Self::Time(_) => "time",
        }
    }

    /// Renders this value in the stable s-expression form.
    ///
    /// Symbols are bare, strings are quoted with `"` and `\` escaped,
    /// coordinates render as a `(lat lon)` pair, and timestamps as a quoted
    /// RFC 3339 string.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Str(v) => format!("\"{}\"", escape_text(v)),
            Self::Symbol(v) => v.clone(),
            Self::Coords { lat, lon } => format!("({lat} {lon})"),
            Self::Time(v) => format!("\"{}\"", v.to_rfc3339()),
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Time(v)
    }
}
