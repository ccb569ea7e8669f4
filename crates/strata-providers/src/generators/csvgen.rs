// crates/strata-providers/src/generators/csvgen.rs
// ============================================================================
// Module: CSV Generator
// Description: Seeded synthetic CSV inputs with typed random columns.
// Purpose: Feed jobs and tests with reproducible delimited data.
// Dependencies: bytes, rand, strata-core, tracing
// ============================================================================

//! ## Overview
//! Produces `nbatches` in-memory CSV files of `num_rows` rows and `num_cols`
//! columns named `aa`, `ab`, and so on. Each column draws a type once from
//! the seed (`int32`, `uint32`, `int64`, `uint64`, `float32`, `float64`);
//! file `i` is generated from `seed + i + 1`, so sequential iteration and
//! sampling yield identical content for the same index.
//!
//! Properties: `nbatches` (1), `num_cols` (2), `num_rows` (10), `linesep`
//! (`\r\n`), `seed` (42), `header` (true).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use bytes::Bytes;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use strata_core::ComponentError;
use strata_core::DataSource;
use strata_core::InputDatum;
use strata_core::Properties;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Column Types
// ============================================================================

/// Registered class name.
pub const CSV_GENERATOR_CLASS: &str = "csvgen";
/// Largest column count with two-letter names.
pub const MAX_COLUMNS: usize = 26 * 26;

/// Value type of a generated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// 32-bit signed.
    Int32,
    /// 32-bit unsigned.
    UInt32,
    /// 64-bit signed.
    Int64,
    /// 64-bit unsigned.
    UInt64,
    /// Single precision.
    Float32,
    /// Double precision.
    Float64,
}

impl ColumnType {
    /// Every generated type.
    pub const ALL: [Self; 6] = [Self::Int32, Self::UInt32, Self::Int64, Self::UInt64, Self::Float32, Self::Float64];

    /// Type name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Appends one random value.
    fn write_value(self, rng: &mut StdRng, out: &mut String) {
        let _ = match self {
            Self::Int32 => write!(out, "{}", rng.gen_range(-100_000_i32 .. 100_000)),
            Self::UInt32 => write!(out, "{}", rng.gen_range(0_u32 .. 100_000)),
            Self::Int64 => write!(out, "{}", rng.gen_range(-1_000_000_000_i64 .. 1_000_000_000)),
            Self::UInt64 => write!(out, "{}", rng.gen_range(0_u64 .. 1_000_000_000)),
            Self::Float32 => write!(out, "{:.6}", rng.r#gen::<f32>()),
            Self::Float64 => write!(out, "{:.12}", rng.r#gen::<f64>()),
        };
    }
}

/// Column names `aa`, `ab`, ... for `n` columns.
#[must_use]
pub fn column_names(n: usize) -> Vec<String> {
    (b'a' ..= b'z')
        .flat_map(|first| (b'a' ..= b'z').map(move |second| format!("{}{}", char::from(first), char::from(second))))
        .take(n)
        .collect()
}

// ============================================================================
// SECTION: Generator
// ============================================================================

/// Seeded CSV file source.
#[derive(Debug)]
pub struct CsvGenerator {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Files produced per pass.
    nbatches: u64,
    /// Rows per file.
    num_rows: u64,
    /// Line separator.
    linesep: String,
    /// Base seed.
    seed: u64,
    /// Write the header line.
    header: bool,
    /// Column names.
    columns: Vec<String>,
    /// Column types.
    types: Vec<ColumnType>,
    /// Next file index.
    cursor: u64,
}

impl CsvGenerator {
    /// Creates the generator and draws its column types.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] for zero or too many columns or bad property types.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let nbatches = properties.u64_or("nbatches", 1)?;
        let num_cols = usize::try_from(properties.u64_or("num_cols", 2)?).unwrap_or(usize::MAX);
        let num_rows = properties.u64_or("num_rows", 10)?;
        let linesep = properties.str_or("linesep", "\r\n")?;
        let seed = properties.u64_or("seed", 42)?;
        let header = properties.bool_or("header", true)?;
        if num_cols == 0 || num_cols > MAX_COLUMNS {
            return Err(ComponentError::Input(format!("{name}: num_cols must be in 1..={MAX_COLUMNS}")));
        }
        if linesep.is_empty() {
            return Err(ComponentError::Input(format!("{name}: linesep is empty")));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let types = (0 .. num_cols).map(|_| ColumnType::ALL[rng.gen_range(0 .. ColumnType::ALL.len())]).collect();
        Ok(Self {
            name: name.to_string(),
            properties,
            nbatches,
            num_rows,
            linesep,
            seed,
            header,
            columns: column_names(num_cols),
            types,
            cursor: 0,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`CsvGenerator::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn DataSource>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column types.
    #[must_use]
    pub fn types(&self) -> &[ColumnType] {
        &self.types
    }

    /// Files produced per pass.
    #[must_use]
    pub const fn nbatches(&self) -> u64 {
        self.nbatches
    }

    /// Content of file `index`.
    #[must_use]
    pub fn make_csv(&self, index: u64) -> Bytes {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(index).wrapping_add(1));
        let mut out = String::new();
        if self.header {
            out.push_str(&self.columns.join(","));
            out.push_str(&self.linesep);
        }
        for _ in 0 .. self.num_rows {
            for (col, ty) in self.types.iter().enumerate() {
                if col > 0 {
                    out.push(',');
                }
                ty.write_value(&mut rng, &mut out);
            }
            out.push_str(&self.linesep);
        }
        Bytes::from(out)
    }

    /// Input datum of file `index`.
    fn datum(&self, index: u64) -> InputDatum {
        InputDatum::Bytes {
            name: format!("{}_{index}.csv", self.name),
            data: self.make_csv(index),
        }
    }
}

impl DataSource for CsvGenerator {
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
        let types: Vec<&str> = self.types.iter().map(|t| t.label()).collect();
        info!(
            generator = %self.name,
            nbatches = self.nbatches,
            rows = self.num_rows,
            columns = self.columns.len(),
            types = %types.join(","),
            "csv generator ready"
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
        let datum = self.datum(self.cursor);
        debug!(generator = %self.name, index = self.cursor, "csv file generated");
        self.cursor += 1;
        Ok(Some(datum))
    }

    fn sample(&mut self, n: usize, rng: &mut StdRng) -> Result<Vec<InputDatum>, ComponentError> {
        let total = usize::try_from(self.nbatches).unwrap_or(usize::MAX);
        let picks = rand::seq::index::sample(rng, total, n.min(total));
        Ok(picks.into_iter().map(|index| self.datum(index as u64)).collect())
    }
}
