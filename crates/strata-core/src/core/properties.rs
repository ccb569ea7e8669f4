// crates/strata-core/src/core/properties.rs
// ============================================================================
// Module: Strata Component Properties
// Description: Typed, lockable key/value properties for algorithms and tools.
// Purpose: Replace dynamic attribute bags with a checked property map.
// Dependencies: crate::proto
// ============================================================================

//! ## Overview
//! Every component carries a [`Properties`] map populated from its
//! configuration descriptor. Values are typed; accessors fail closed on a type
//! mismatch instead of coercing silently (integers widen to floats, nothing
//! else converts). Once the controller enters the lock phase the map is
//! sealed and further writes are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::proto;
use crate::proto::property_value::Kind;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by property access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// Write attempted after the properties were locked.
    #[error("property {0} is locked")]
    Locked(String),
    /// Required key absent.
    #[error("missing property {0}")]
    Missing(String),
    /// Stored value has a different type.
    #[error("property {key} expected {expected}, found {found}")]
    TypeMismatch {
        /// Property key.
        key: String,
        /// Requested type name.
        expected: &'static str,
        /// Stored type name.
        found: &'static str,
    },
}

// ============================================================================
// SECTION: Values
// ============================================================================

/// A single typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered list of strings.
    List(Vec<String>),
}

impl PropertyValue {
    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

// ============================================================================
// SECTION: Property Map
// ============================================================================

/// Typed property map that can be sealed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    /// Values keyed by property name.
    values: BTreeMap<String, PropertyValue>,
    /// True once the map has been sealed.
    locked: bool,
}

impl Properties {
    /// Creates an empty, unlocked map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used when assembling descriptors.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Sets a value.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Locked`] after [`Properties::lock`].
    pub fn set(&mut self, key: &str, value: impl Into<PropertyValue>) -> Result<(), PropertyError> {
        if self.locked {
            return Err(PropertyError::Locked(key.to_string()));
        }
        self.values.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Seals the map against further writes.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Returns true once sealed.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns the raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.values.get(key)
    }

    /// Returns true when the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.values.iter()
    }

    /// Returns a boolean, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::TypeMismatch`] for a non-boolean value.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, PropertyError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(PropertyValue::Bool(value)) => Ok(*value),
            Some(other) => Err(mismatch(key, "bool", other)),
        }
    }

    /// Returns an integer, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::TypeMismatch`] for a non-integer value.
    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, PropertyError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(PropertyValue::Int(value)) => Ok(*value),
            Some(other) => Err(mismatch(key, "int", other)),
        }
    }

    /// Returns a non-negative integer, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::TypeMismatch`] for a non-integer or negative value.
    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64, PropertyError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(PropertyValue::Int(value)) => u64::try_from(*value).map_err(|_| {
                PropertyError::TypeMismatch {
                    key: key.to_string(),
                    expected: "non-negative int",
                    found: "negative int",
                }
            }),
            Some(other) => Err(mismatch(key, "int", other)),
        }
    }

    /// Returns a float, or `default` when absent. Integers widen.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::TypeMismatch`] for a non-numeric value.
    #[allow(clippy::cast_precision_loss, reason = "Integer properties widen to f64 by contract.")]
    pub fn float_or(&self, key: &str, default: f64) -> Result<f64, PropertyError> {
        match self.values.get(key) {
            None => Ok(default),
            Some(PropertyValue::Float(value)) => Ok(*value),
            Some(PropertyValue::Int(value)) => Ok(*value as f64),
            Some(other) => Err(mismatch(key, "float", other)),
        }
    }

    /// Returns a string, or `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::TypeMismatch`] for a non-string value.
    pub fn str_or(&self, key: &str, default: &str) -> Result<String, PropertyError> {
        match self.values.get(key) {
            None => Ok(default.to_string()),
            Some(PropertyValue::Str(value)) => Ok(value.clone()),
            Some(other) => Err(mismatch(key, "string", other)),
        }
    }

    /// Returns a required string.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Missing`] when absent and
    /// [`PropertyError::TypeMismatch`] for a non-string value.
    pub fn require_str(&self, key: &str) -> Result<String, PropertyError> {
        match self.values.get(key) {
            None => Err(PropertyError::Missing(key.to_string())),
            Some(PropertyValue::Str(value)) => Ok(value.clone()),
            Some(other) => Err(mismatch(key, "string", other)),
        }
    }

    /// Returns a string list, or an empty list when absent.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::TypeMismatch`] for a non-list value.
    pub fn list_or_empty(&self, key: &str) -> Result<Vec<String>, PropertyError> {
        match self.values.get(key) {
            None => Ok(Vec::new()),
            Some(PropertyValue::List(values)) => Ok(values.clone()),
            Some(other) => Err(mismatch(key, "list", other)),
        }
    }

    /// Converts the map into its wire form.
    #[must_use]
    pub fn to_message(&self) -> proto::Properties {
        let entries = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value_to_message(value)))
            .collect();
        proto::Properties { entries }
    }

    /// Builds an unlocked map from its wire form; empty values are skipped.
    #[must_use]
    pub fn from_message(message: &proto::Properties) -> Self {
        let values = message
            .entries
            .iter()
            .filter_map(|(key, value)| value_from_message(value).map(|v| (key.clone(), v)))
            .collect();
        Self {
            values,
            locked: false,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a type mismatch error.
fn mismatch(key: &str, expected: &'static str, found: &PropertyValue) -> PropertyError {
    PropertyError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}

/// Converts a value into its wire form.
fn value_to_message(value: &PropertyValue) -> proto::PropertyValue {
    let kind = match value {
        PropertyValue::Bool(v) => Kind::BoolValue(*v),
        PropertyValue::Int(v) => Kind::IntValue(*v),
        PropertyValue::Float(v) => Kind::DoubleValue(*v),
        PropertyValue::Str(v) => Kind::StringValue(v.clone()),
        PropertyValue::List(values) => Kind::ListValue(proto::StringList {
            values: values.clone(),
        }),
    };
    proto::PropertyValue { kind: Some(kind) }
}

/// Converts a wire value back into a typed value.
fn value_from_message(value: &proto::PropertyValue) -> Option<PropertyValue> {
    value.kind.as_ref().map(|kind| match kind {
        Kind::BoolValue(v) => PropertyValue::Bool(*v),
        Kind::IntValue(v) => PropertyValue::Int(*v),
        Kind::DoubleValue(v) => PropertyValue::Float(*v),
        Kind::StringValue(v) => PropertyValue::Str(v.clone()),
        Kind::ListValue(list) => PropertyValue::List(list.values.clone()),
    })
}
