// crates/strata-providers/src/generators/legacygen.rs
// ============================================================================
// Module: Legacy Generator
// Description: Seeded fixed-width cp500 record files.
// Purpose: Produce mainframe-style inputs for the legacy decoding path.
// Dependencies: bytes, rand, strata-core, tracing, crate::{ebcdic, fields}
// ============================================================================

//! ## Overview
//! Each generated file is an optional header, `num_rows` fixed-width records
//! and an optional footer, all encoded in code page 500. Signed fields carry
//! an overpunched last digit; unsigned fields are zero-padded; string fields
//! are filled with printable ASCII. The record layout comes from the `fields`
//! property (`name:length:utype[:min:max]`) and defaults to a signed, an
//! unsigned and a string column.
//!
//! Properties: `fields`, `nbatches` (1), `num_rows` (10), `seed` (42),
//! `header_size` (0), `footer_size` (0), `swap_lf` (false).

// ============================================================================
// SECTION: Imports
// ============================================================================

use bytes::Bytes;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use strata_core::ComponentError;
use strata_core::DataSource;
use strata_core::InputDatum;
use strata_core::Properties;
use strata_core::proto::LegacyHandlerConfig;
use tracing::debug;
use tracing::info;

use crate::ebcdic::Cp500;
use crate::ebcdic::encode_signed;
use crate::ebcdic::encode_unsigned;
use crate::fields::FieldKind;
use crate::fields::LegacyField;
use crate::fields::parse_fields;
use crate::fields::record_size;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Registered class name.
pub const LEGACY_GENERATOR_CLASS: &str = "legacygen";
/// Layout used when no `fields` property is set.
pub const DEFAULT_FIELDS: [&str; 3] = ["column_a:10:int", "column_b:6:uint", "column_c:4:str"];
/// Characters drawn for string fields.
const STR_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!#$%&()*+-./:;<=>?@";

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Seeded fixed-width file source.
#[derive(Debug)]
pub struct LegacyGenerator {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Record layout.
    fields: Vec<LegacyField>,
    /// Files produced per pass.
    nbatches: u64,
    /// Records per file.
    num_rows: u64,
    /// Base seed.
    seed: u64,
    /// Leading bytes per file.
    header_size: usize,
    /// Trailing bytes per file.
    footer_size: usize,
    /// Codec.
    codec: Cp500,
    /// Next file index.
    cursor: u64,
}

impl LegacyGenerator {
    /// Creates the generator.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] for malformed fields or bad property types.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let entries = if properties.contains("fields") {
            properties.list_or_empty("fields")?
        } else {
            DEFAULT_FIELDS.iter().map(ToString::to_string).collect()
        };
        let fields = parse_fields(&entries)?;
        if fields.is_empty() {
            return Err(ComponentError::Input(format!("{name}: empty record layout")));
        }
        let header_size = usize::try_from(properties.u64_or("header_size", 0)?).unwrap_or(usize::MAX);
        let footer_size = usize::try_from(properties.u64_or("footer_size", 0)?).unwrap_or(usize::MAX);
        Ok(Self {
            name: name.to_string(),
            fields,
            nbatches: properties.u64_or("nbatches", 1)?,
            num_rows: properties.u64_or("num_rows", 10)?,
            seed: properties.u64_or("seed", 42)?,
            header_size,
            footer_size,
            codec: Cp500::new(properties.bool_or("swap_lf", false)?),
            properties,
            cursor: 0,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`LegacyGenerator::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn DataSource>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }

    /// Record layout.
    #[must_use]
    pub fn fields(&self) -> &[LegacyField] {
        &self.fields
    }

    /// File handler settings that read the generated files back.
    #[must_use]
    pub fn handler_config(&self, records_per_block: u64) -> LegacyHandlerConfig {
        LegacyHandlerConfig {
            header_size: self.header_size as u64,
            footer_size: self.footer_size as u64,
            records_per_block,
            fields: self.fields.iter().map(LegacyField::to_spec).collect(),
        }
    }

    /// Content of file `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Input`] when a value cannot be encoded.
    pub fn make_file(&self, index: u64) -> Result<Bytes, ComponentError> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index).wrapping_add(1));
        let rows = usize::try_from(self.num_rows).unwrap_or(usize::MAX);
        let mut text = String::with_capacity(self.header_size + record_size(&self.fields).saturating_mul(rows));
        text.push_str(&" ".repeat(self.header_size));
        for _ in 0 .. self.num_rows {
            for field in &self.fields {
                text.push_str(&render_field(field, &mut rng)?);
            }
        }
        text.push_str(&" ".repeat(self.footer_size));
        Ok(Bytes::from(self.codec.encode(&text)?))
    }

    /// Input datum of file `index`.
    fn datum(&self, index: u64) -> Result<InputDatum, ComponentError> {
        Ok(InputDatum::Bytes {
            name: format!("{}_{index}.dat", self.name),
            data: self.make_file(index)?,
        })
    }
}

/// Draws and renders one field value.
fn render_field(field: &LegacyField, rng: &mut StdRng) -> Result<String, ComponentError> {
    let (min, max) = field.value_range();
    match field.kind {
        FieldKind::Int => Ok(encode_signed(rng.gen_range(min ..= max), field.length)?),
        FieldKind::Uint => {
            let value = rng.gen_range(min.max(0) ..= max.max(0)).unsigned_abs();
            Ok(encode_unsigned(value, field.length)?)
        }
        FieldKind::Str => Ok((0 .. field.length)
            .map(|_| char::from(STR_ALPHABET[rng.gen_range(0 .. STR_ALPHABET.len())]))
            .collect()),
    }
}

impl DataSource for LegacyGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn initialize(&mut self) -> Result<(), ComponentError> {
        self.cursor = 0;
        info!(
            generator = %self.name,
            nbatches = self.nbatches,
            records = self.num_rows,
            record_size = record_size(&self.fields),
            "legacy generator ready"
        );
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_datum(&mut self) -> Result<Option<InputDatum>, ComponentError> {
        if self.cursor >= self.nbatches {
            return Ok(None);
        }
        let datum = self.datum(self.cursor)?;
        debug!(generator = %self.name, index = self.cursor, "legacy file generated");
        self.cursor += 1;
        Ok(Some(datum))
    }

    fn sample(&mut self, n: usize, rng: &mut StdRng) -> Result<Vec<InputDatum>, ComponentError> {
        let total = usize::try_from(self.nbatches).unwrap_or(usize::MAX);
        rand::seq::index::sample(rng, total, n.min(total)).into_iter().map(|index| self.datum(index as u64)).collect()
    }
}
