// crates/strata-core/src/metrics/histogram.rs
// ============================================================================
// Module: Strata Fixed-Bin Histogram
// Description: One-dimensional histogram with explicit bin edges.
// Purpose: Accumulate frequencies plus sum and sum-of-squares statistics.
// Dependencies: crate::proto
// ============================================================================

//! ## Overview
//! Bins are half-open `[e_i, e_{i+1})` except the last, which also accepts
//! its right edge. Values outside the edges go to underflow or overflow; all
//! finite values contribute to `sum`, `sum2`, and the entry count so the mean
//! and deviation cover everything that was filled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use super::MetricsError;
use crate::proto::HistogramMessage;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on bins produced by [`autobinning`].
const MAX_AUTO_BINS: u32 = 200;

// ============================================================================
// SECTION: Histogram
// ============================================================================

/// Fixed-bin 1-D histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    /// Strictly increasing bin edges.
    edges: Vec<f64>,
    /// Per-bin weights.
    frequencies: Vec<f64>,
    /// Per-bin squared weights.
    errors2: Vec<f64>,
    /// Weight below the first edge.
    underflow: f64,
    /// Weight above the last edge.
    overflow: f64,
    /// Sum of filled values.
    sum: f64,
    /// Sum of squared filled values.
    sum2: f64,
    /// Number of fills.
    entries: u64,
    /// Axis label.
    axis_name: String,
}

impl Histogram1D {
    /// Creates an empty histogram over `edges`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::InvalidBins`] unless there are at least two
    /// finite, strictly increasing edges.
    pub fn new(edges: Vec<f64>) -> Result<Self, MetricsError> {
        validate_edges(&edges)?;
        let nbins = edges.len() - 1;
        Ok(Self {
            edges,
            frequencies: vec![0.0; nbins],
            errors2: vec![0.0; nbins],
            underflow: 0.0,
            overflow: 0.0,
            sum: 0.0,
            sum2: 0.0,
            entries: 0,
            axis_name: String::new(),
        })
    }

    /// Sets the axis label.
    #[must_use]
    pub fn with_axis_name(mut self, axis_name: &str) -> Self {
        self.axis_name = axis_name.to_string();
        self
    }

    /// Adds one value with unit weight. Non-finite values are ignored.
    pub fn fill(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.entries += 1;
        self.sum += value;
        self.sum2 += value * value;
        match self.bin_index(value) {
            BinSlot::Under => self.underflow += 1.0,
            BinSlot::Over => self.overflow += 1.0,
            BinSlot::Bin(idx) => {
                self.frequencies[idx] += 1.0;
                self.errors2[idx] += 1.0;
            }
        }
    }

    /// Adds every value in `values`.
    pub fn fill_n(&mut self, values: &[f64]) {
        for value in values {
            self.fill(*value);
        }
    }

    /// Locates the slot for a finite value.
    fn bin_index(&self, value: f64) -> BinSlot {
        let first = self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        if value < first {
            return BinSlot::Under;
        }
        if value > last {
            return BinSlot::Over;
        }
        let upper = self.edges.partition_point(|edge| *edge <= value);
        BinSlot::Bin(upper.saturating_sub(1).min(self.frequencies.len() - 1))
    }

    /// Bin edges.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Per-bin weights.
    #[must_use]
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Number of bins.
    #[must_use]
    pub fn bin_count(&self) -> usize {
        self.frequencies.len()
    }

    /// In-range weight.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.frequencies.iter().sum()
    }

    /// Weight below the first edge.
    #[must_use]
    pub const fn underflow(&self) -> f64 {
        self.underflow
    }

    /// Weight above the last edge.
    #[must_use]
    pub const fn overflow(&self) -> f64 {
        self.overflow
    }

    /// Number of fills.
    #[must_use]
    pub const fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of filled values.
    #[must_use]
    pub const fn sum(&self) -> f64 {
        self.sum
    }

    /// Sum of squared filled values.
    #[must_use]
    pub const fn sum2(&self) -> f64 {
        self.sum2
    }

    /// Axis label.
    #[must_use]
    pub fn axis_name(&self) -> &str {
        &self.axis_name
    }

    /// Mean of filled values, zero when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Entry counts stay far below 2^52.")]
    pub fn mean(&self) -> f64 {
        if self.entries == 0 {
            return 0.0;
        }
        self.sum / self.entries as f64
    }

    /// Population standard deviation of filled values, zero when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "Entry counts stay far below 2^52.")]
    pub fn std(&self) -> f64 {
        if self.entries == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum2 / self.entries as f64 - mean * mean).max(0.0).sqrt()
    }

    /// True when both histograms share identical edges.
    #[must_use]
    pub fn has_same_bins(&self, other: &Self) -> bool {
        self.edges == other.edges
    }

    /// Adds another histogram bin-by-bin.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::IncompatibleBins`] when the edges differ.
    pub fn merge(&mut self, other: &Self) -> Result<(), MetricsError> {
        if !self.has_same_bins(other) {
            return Err(MetricsError::IncompatibleBins(self.axis_name.clone()));
        }
        for (lhs, rhs) in self.frequencies.iter_mut().zip(&other.frequencies) {
            *lhs += rhs;
        }
        for (lhs, rhs) in self.errors2.iter_mut().zip(&other.errors2) {
            *lhs += rhs;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        self.sum += other.sum;
        self.sum2 += other.sum2;
        self.entries += other.entries;
        Ok(())
    }

    /// Converts to the wire form.
    #[must_use]
    pub fn to_message(&self) -> HistogramMessage {
        HistogramMessage {
            bin_edges: self.edges.clone(),
            frequencies: self.frequencies.clone(),
            errors2: self.errors2.clone(),
            underflow: self.underflow,
            overflow: self.overflow,
            sum: self.sum,
            sum2: self.sum2,
            entries: self.entries,
            axis_name: self.axis_name.clone(),
        }
    }

    /// Parses the wire form.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Corrupt`] when array lengths disagree with the edges.
    pub fn from_message(message: &HistogramMessage) -> Result<Self, MetricsError> {
        validate_edges(&message.bin_edges)?;
        let nbins = message.bin_edges.len() - 1;
        if message.frequencies.len() != nbins || message.errors2.len() != nbins {
            return Err(MetricsError::Corrupt(format!(
                "expected {nbins} bins, found {} frequencies and {} errors",
                message.frequencies.len(),
                message.errors2.len()
            )));
        }
        Ok(Self {
            edges: message.bin_edges.clone(),
            frequencies: message.frequencies.clone(),
            errors2: message.errors2.clone(),
            underflow: message.underflow,
            overflow: message.overflow,
            sum: message.sum,
            sum2: message.sum2,
            entries: message.entries,
            axis_name: message.axis_name.clone(),
        })
    }
}

/// Target slot of a value.
enum BinSlot {
    /// Below the first edge.
    Under,
    /// Above the last edge.
    Over,
    /// Bin index.
    Bin(usize),
}

/// Rejects edge lists that cannot define bins.
fn validate_edges(edges: &[f64]) -> Result<(), MetricsError> {
    if edges.len() < 2 {
        return Err(MetricsError::InvalidBins(format!("need at least 2 edges, got {}", edges.len())));
    }
    if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(MetricsError::InvalidBins("edges must be finite and strictly increasing".to_string()));
    }
    Ok(())
}

// ============================================================================
// SECTION: Binning Helpers
// ============================================================================

/// Returns `start, start + step, ...` strictly below `stop`.
#[must_use]
pub fn float_range(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let mut out = Vec::new();
    if step <= 0.0 || !step.is_finite() {
        return out;
    }
    let mut i = 0_u32;
    loop {
        let value = step.mul_add(f64::from(i), start);
        if value >= step.mul_add(-1e-9, stop) {
            break;
        }
        out.push(value);
        i += 1;
    }
    out
}

/// Derives bin edges from samples with the Freedman-Diaconis rule.
///
/// Uses bin width `2 * IQR / n^(1/3)`, falling back to ten equal bins when
/// the IQR is zero. Identical samples get a single unit-wide bin.
///
/// # Errors
///
/// Returns [`MetricsError::InvalidBins`] when there are no finite samples.
#[allow(clippy::cast_precision_loss, reason = "Sample counts stay far below 2^52.")]
pub fn autobinning(samples: &[f64]) -> Result<Vec<f64>, MetricsError> {
    let mut data: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
    if data.is_empty() {
        return Err(MetricsError::InvalidBins("no finite samples".to_string()));
    }
    data.sort_by(f64::total_cmp);
    let min = data[0];
    let max = data[data.len() - 1];
    if max <= min {
        return Ok(vec![min - 0.5, min + 0.5]);
    }
    let iqr = quantile_sorted(&data, 0.75) - quantile_sorted(&data, 0.25);
    let mut width = 2.0 * iqr / (data.len() as f64).cbrt();
    if width <= 0.0 || !width.is_finite() {
        width = (max - min) / 10.0;
    }
    width = width.max((max - min) / f64::from(MAX_AUTO_BINS));
    let mut edges = vec![min];
    let mut i = 1_u32;
    while edges[edges.len() - 1] < max && i <= MAX_AUTO_BINS {
        edges.push(width.mul_add(f64::from(i), min));
        i += 1;
    }
    let last = edges.len() - 1;
    if edges[last] < max {
        edges[last] = max;
    }
    Ok(edges)
}

/// Linear-interpolated quantile of sorted data.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Position is clamped to the valid index range before conversion."
)]
fn quantile_sorted(data: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (data.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(data.len() - 1);
    let frac = pos - pos.floor();
    (data[hi] - data[lo]).mul_add(frac, data[lo])
}
