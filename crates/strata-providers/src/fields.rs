// crates/strata-providers/src/fields.rs
// ============================================================================
// Module: Fixed-Width Field Layout
// Description: Typed field descriptions for fixed-width records.
// Purpose: Share one record layout between the legacy decoder and generator.
// Dependencies: arrow, strata-core
// ============================================================================

//! ## Overview
//! A record is a sequence of fields, each with a name, a byte width, and a
//! unit type (`int`, `uint`, or `str`). Layouts come either from the job's
//! fixed-width file handler or from a component property holding entries of
//! the form `name:length:utype`, optionally followed by `:min:max` bounds
//! used by the generator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arrow::datatypes::DataType;
use arrow::datatypes::Field;
use arrow::datatypes::Schema;
use arrow::datatypes::SchemaRef;
use strata_core::ComponentError;
use strata_core::proto::FieldSpec;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Maximum digits of a numeric field.
pub const MAX_NUMERIC_WIDTH: usize = 18;

/// Unit type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Overpunched signed integer.
    Int,
    /// Zero-padded unsigned integer.
    Uint,
    /// Space-padded text.
    Str,
}

impl FieldKind {
    /// Parses a unit type name.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Input`] for unknown names.
    pub fn parse(utype: &str) -> Result<Self, ComponentError> {
        match utype {
            "int" => Ok(Self::Int),
            "uint" => Ok(Self::Uint),
            "str" => Ok(Self::Str),
            other => Err(ComponentError::Input(format!("unknown field type {other}"))),
        }
    }

    /// Unit type name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Str => "str",
        }
    }

    /// Arrow type of decoded values.
    #[must_use]
    pub const fn data_type(self) -> DataType {
        match self {
            Self::Int => DataType::Int64,
            Self::Uint => DataType::UInt64,
            Self::Str => DataType::Utf8,
        }
    }
}

/// One field of a fixed-width record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyField {
    /// Column name.
    pub name: String,
    /// Width in bytes.
    pub length: usize,
    /// Unit type.
    pub kind: FieldKind,
    /// Inclusive value bounds for generated numeric data.
    pub bounds: Option<(i64, i64)>,
}

impl LegacyField {
    /// Builds a field, rejecting zero widths and numeric widths beyond 18 digits.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Input`] for unusable widths.
    pub fn new(name: &str, length: usize, kind: FieldKind) -> Result<Self, ComponentError> {
        if length == 0 {
            return Err(ComponentError::Input(format!("field {name} has zero width")));
        }
        if kind != FieldKind::Str && length > MAX_NUMERIC_WIDTH {
            return Err(ComponentError::Input(format!(
                "numeric field {name} is wider than {MAX_NUMERIC_WIDTH} digits"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            length,
            kind,
            bounds: None,
        })
    }

    /// Converts a file handler field.
    ///
    /// # Errors
    ///
    /// See [`LegacyField::new`].
    pub fn from_spec(spec: &FieldSpec) -> Result<Self, ComponentError> {
        let length = usize::try_from(spec.length).map_err(|_| ComponentError::Input(spec.name.clone()))?;
        Self::new(&spec.name, length, FieldKind::parse(&spec.utype)?)
    }

    /// Parses `name:length:utype[:min:max]`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Input`] for malformed entries.
    pub fn parse(entry: &str) -> Result<Self, ComponentError> {
        let invalid = || ComponentError::Input(format!("malformed field entry {entry}"));
        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        let (name, length, utype, bounds) = match parts.as_slice() {
            [name, length, utype] => (*name, *length, *utype, None),
            [name, length, utype, min, max] => {
                let min: i64 = min.parse().map_err(|_| invalid())?;
                let max: i64 = max.parse().map_err(|_| invalid())?;
                if min > max {
                    return Err(invalid());
                }
                (*name, *length, *utype, Some((min, max)))
            }
            _ => return Err(invalid()),
        };
        if name.is_empty() {
            return Err(invalid());
        }
        let length: usize = length.parse().map_err(|_| invalid())?;
        let mut field = Self::new(name, length, FieldKind::parse(utype)?)?;
        field.bounds = bounds;
        Ok(field)
    }

    /// Converts back to a file handler field.
    #[must_use]
    pub fn to_spec(&self) -> FieldSpec {
        FieldSpec {
            name: self.name.clone(),
            length: u32::try_from(self.length).unwrap_or(u32::MAX),
            utype: self.kind.label().to_string(),
        }
    }

    /// Largest magnitude the field can hold.
    #[must_use]
    pub fn max_magnitude(&self) -> i64 {
        let digits = u32::try_from(self.length.min(MAX_NUMERIC_WIDTH)).unwrap_or(0);
        10_i64.pow(digits) - 1
    }

    /// Bounds of generated values: explicit bounds, else the full width.
    #[must_use]
    pub fn value_range(&self) -> (i64, i64) {
        let max = self.max_magnitude();
        match (self.bounds, self.kind) {
            (Some(bounds), _) => bounds,
            (None, FieldKind::Int) => (-max, max),
            (None, _) => (0, max),
        }
    }
}

// ============================================================================
// SECTION: Layouts
// ============================================================================

/// Parses a list of field entries.
///
/// # Errors
///
/// Returns [`ComponentError::Input`] for the first malformed entry.
pub fn parse_fields(entries: &[String]) -> Result<Vec<LegacyField>, ComponentError> {
    entries.iter().map(|entry| LegacyField::parse(entry)).collect()
}

/// Total record width.
#[must_use]
pub fn record_size(fields: &[LegacyField]) -> usize {
    fields.iter().map(|f| f.length).sum()
}

/// Arrow schema of decoded records.
#[must_use]
pub fn arrow_schema(fields: &[LegacyField]) -> SchemaRef {
    Arc::new(Schema::new(
        fields.iter().map(|f| Field::new(f.name.clone(), f.kind.data_type(), false)).collect::<Vec<_>>(),
    ))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
