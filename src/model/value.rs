//! Raw configuration values and their coercion rules.
//!
//! Every property ultimately holds a [`Value`]. String-typed properties keep
//! their internal representation as text (what interactive editors operate
//! on) and coerce to bool/int/double at persistence time when a
//! [`ValueType`] tag requests it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A raw configuration value.
///
/// The untagged representation maps directly onto YAML/JSON scalars,
/// sequences and mappings, so snapshots round-trip without any envelope.
/// `Int` is tried before `Double` so whole numbers stay integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    List(Vec<String>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Human-readable name of the value shape, used in mismatch warnings.
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Scalar text form used by string properties: scalars convert, while
    /// lists and maps are rejected (`None`) so a wrong-shaped assignment can
    /// be dropped instead of silently stringified.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Double(d) => Some(d.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Flattened single-line text form used by the XML and properties
    /// outputs, which cannot represent nested values.
    pub fn flatten(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Double(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::List(items) => items.join(","),
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.flatten()))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.flatten())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// Persistence-time type tag for string properties.
///
/// The internal value stays a string either way; the tag only controls how
/// [`coerce_saved`] emits it into the saved snapshot. `Password` renders as a
/// masked field in interactive surfaces but persists as a plain string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueType {
    #[default]
    String,
    Password,
    Int,
    Double,
    Bool,
}

impl ValueType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "string" => Some(ValueType::String),
            "password" => Some(ValueType::Password),
            "int" => Some(ValueType::Int),
            "double" => Some(ValueType::Double),
            "bool" => Some(ValueType::Bool),
            _ => None,
        }
    }
}

/// Coerce a string property's derived text into its persisted form.
///
/// Unparseable values keep the raw string and log a warning; interactive
/// editing must stay resilient to transient bad input.
pub fn coerce_saved(name: &str, text: &str, value_type: ValueType) -> Value {
    match value_type {
        ValueType::String | ValueType::Password => Value::String(text.to_string()),
        ValueType::Bool => Value::Bool(text.eq_ignore_ascii_case("true")),
        ValueType::Int => match text.parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => {
                warn!("Config prop '{name}' value '{text}' is not an int, saving as string");
                Value::String(text.to_string())
            }
        },
        ValueType::Double => match text.parse::<f64>() {
            Ok(d) => Value::Double(d),
            Err(_) => {
                warn!("Config prop '{name}' value '{text}' is not a double, saving as string");
                Value::String(text.to_string())
            }
        },
    }
}
