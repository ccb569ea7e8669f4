// crates/strata-providers/src/tools/tdigest.rs
// ============================================================================
// Module: T-Digest Tool
// Description: Per-column quantile digests of numeric batch columns.
// Purpose: Summarize column distributions for profiling.
// Dependencies: arrow, strata-core
// ============================================================================

//! ## Overview
//! Every integer or floating-point column of a batch is cast to `Float64`
//! and fed to its own digest; nulls are skipped and other column types are
//! ignored. Properties `delta` and `k` set the digest compression.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;

use arrow::array::Array;
use arrow::array::Float64Array;
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use strata_core::ComponentError;
use strata_core::Properties;
use strata_core::TDigest;
use strata_core::Tool;
use strata_core::metrics::tdigest::DEFAULT_DELTA;
use strata_core::metrics::tdigest::DEFAULT_K;

// ============================================================================
// SECTION: Tool
// ============================================================================

/// Registered class name.
pub const TDIGEST_TOOL_CLASS: &str = "tdigesttool";

/// Builds digests of numeric columns.
#[derive(Debug)]
pub struct TDigestTool {
    /// Configured name.
    name: String,
    /// Configured properties.
    properties: Properties,
    /// Compression parameter.
    delta: f64,
    /// Buffer factor.
    k: u32,
}

impl TDigestTool {
    /// Creates the tool from its properties.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError`] for a non-positive `delta` or bad property types.
    pub fn new(name: &str, properties: Properties) -> Result<Self, ComponentError> {
        let delta = properties.float_or("delta", DEFAULT_DELTA)?;
        if !(delta > 0.0 && delta < 1.0) {
            return Err(ComponentError::Input(format!("{name}: delta must lie in (0, 1)")));
        }
        let k = u32::try_from(properties.u64_or("k", u64::from(DEFAULT_K))?)
            .map_err(|_| ComponentError::Input(format!("{name}: k too large")))?;
        Ok(Self {
            name: name.to_string(),
            properties,
            delta,
            k,
        })
    }

    /// Boxed constructor for the registry.
    ///
    /// # Errors
    ///
    /// See [`TDigestTool::new`].
    pub fn build(name: &str, properties: Properties) -> Result<Box<dyn Tool>, ComponentError> {
        Ok(Box::new(Self::new(name, properties)?))
    }

    /// Digests of every numeric column keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Arrow`] when a cast fails.
    pub fn digest_batch(&self, batch: &RecordBatch) -> Result<BTreeMap<String, TDigest>, ComponentError> {
        let schema = batch.schema();
        let mut out = BTreeMap::new();
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            if !is_numeric(field.data_type()) {
                continue;
            }
            let values = cast(column, &DataType::Float64)?;
            let Some(values) = values.as_any().downcast_ref::<Float64Array>() else {
                continue;
            };
            let finite: Vec<f64> = values.iter().flatten().collect();
            let mut digest = TDigest::with_params(field.name(), self.delta, self.k);
            digest.batch_update(&finite);
            out.insert(field.name().clone(), digest);
        }
        Ok(out)
    }
}

/// True for integer and floating-point types.
const fn is_numeric(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
    )
}

impl Tool for TDigestTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
