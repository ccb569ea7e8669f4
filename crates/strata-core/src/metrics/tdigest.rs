// crates/strata-core/src/metrics/tdigest.rs
// ============================================================================
// Module: Strata T-Digest
// Description: Mergeable streaming quantile sketch.
// Purpose: Summarize column distributions in bounded space.
// Dependencies: crate::proto
// ============================================================================

//! ## Overview
//! A digest is a list of centroids `(mean, count)` sorted by mean. Incoming
//! values are buffered and folded in by [`TDigest::compress`], which greedily
//! merges neighbours while the merged weight stays below the size bound
//! `4 * n * delta * q * (1 - q)`, where `q` is the quantile at the merged
//! centroid's midpoint. Small centroids near the tails keep quantile error
//! relative rather than absolute.
//!
//! Compression is deterministic, so identical inputs give identical digests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Add;

use super::MetricsError;
use crate::proto;
use crate::proto::TDigestInstance;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default accuracy parameter.
pub const DEFAULT_DELTA: f64 = 0.01;

/// Default buffer factor; the buffer holds `K / delta` points.
pub const DEFAULT_K: u32 = 25;

// ============================================================================
// SECTION: Digest
// ============================================================================

/// One centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Centroid {
    /// Mean of absorbed values.
    mean: f64,
    /// Absorbed weight.
    count: f64,
}

/// Streaming quantile sketch.
#[derive(Debug, Clone, PartialEq)]
pub struct TDigest {
    /// Digest name.
    name: String,
    /// Accuracy parameter.
    delta: f64,
    /// Buffer factor.
    k: u32,
    /// Total weight, including buffered points.
    n: f64,
    /// Compressed centroids sorted by mean.
    centroids: Vec<Centroid>,
    /// Points not yet compressed.
    buffer: Vec<Centroid>,
}

impl TDigest {
    /// Creates an empty digest with default parameters.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::with_params(name, DEFAULT_DELTA, DEFAULT_K)
    }

    /// Creates an empty digest with explicit parameters.
    #[must_use]
    pub fn with_params(name: &str, delta: f64, k: u32) -> Self {
        Self {
            name: name.to_string(),
            delta,
            k,
            n: 0.0,
            centroids: Vec::new(),
            buffer: Vec::new(),
        }
    }

    /// Digest name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total weight.
    #[must_use]
    pub const fn count(&self) -> f64 {
        self.n
    }

    /// Accuracy parameter.
    #[must_use]
    pub const fn delta(&self) -> f64 {
        self.delta
    }

    /// Number of compressed centroids.
    #[must_use]
    pub fn centroid_count(&self) -> usize {
        self.centroids.len()
    }

    /// Adds one value with weight `w`. Non-finite values are ignored.
    pub fn update(&mut self, x: f64, w: f64) {
        if !x.is_finite() || w.is_nan() || w <= 0.0 {
            return;
        }
        self.buffer.push(Centroid { mean: x, count: w });
        self.n += w;
        if self.buffer.len() as f64 > f64::from(self.k) / self.delta {
            self.compress();
        }
    }

    /// Adds every value with unit weight.
    pub fn batch_update(&mut self, values: &[f64]) {
        for value in values {
            self.update(*value, 1.0);
        }
    }

    /// Folds buffered points into the centroids.
    pub fn compress(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let mut all = std::mem::take(&mut self.centroids);
        all.append(&mut self.buffer);
        all.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        let total: f64 = all.iter().map(|c| c.count).sum();
        let mut merged: Vec<Centroid> = Vec::with_capacity(all.len());
        let mut cumulative = 0.0;
        let mut iter = all.into_iter();
        let Some(mut current) = iter.next() else {
            return;
        };
        for next in iter {
            let proposed = current.count + next.count;
            let q = (cumulative + proposed / 2.0) / total;
            let bound = 4.0 * total * self.delta * q * (1.0 - q);
            if proposed <= bound {
                current.mean += (next.mean - current.mean) * next.count / proposed;
                current.count = proposed;
            } else {
                cumulative += current.count;
                merged.push(current);
                current = next;
            }
        }
        merged.push(current);
        self.centroids = merged;
        self.n = total;
    }

    /// Returns a compressed view without mutating `self`.
    fn compressed(&self) -> std::borrow::Cow<'_, [Centroid]> {
        if self.buffer.is_empty() {
            std::borrow::Cow::Borrowed(self.centroids.as_slice())
        } else {
            let mut copy = self.clone();
            copy.compress();
            std::borrow::Cow::Owned(copy.centroids)
        }
    }

    /// Estimates the value at percentile `p` in `[0, 100]`.
    #[must_use]
    pub fn percentile(&self, p: f64) -> Option<f64> {
        let cents = self.compressed();
        let first = cents.first()?;
        let last = cents.last()?;
        if cents.len() == 1 {
            return Some(first.mean);
        }
        let total: f64 = cents.iter().map(|c| c.count).sum();
        let target = p.clamp(0.0, 100.0) / 100.0 * total;
        let mut cumulative = 0.0;
        let mut prev_center = first.count / 2.0;
        if target <= prev_center {
            return Some(first.mean);
        }
        for pair in cents.windows(2) {
            cumulative += pair[0].count;
            let center = cumulative + pair[1].count / 2.0;
            if target <= center {
                let frac = (target - prev_center) / (center - prev_center);
                return Some((pair[1].mean - pair[0].mean).mul_add(frac, pair[0].mean));
            }
            prev_center = center;
        }
        Some(last.mean)
    }

    /// Estimates the fraction of weight at or below `x`.
    #[must_use]
    pub fn cdf(&self, x: f64) -> Option<f64> {
        let cents = self.compressed();
        let first = cents.first()?;
        let last = cents.last()?;
        let total: f64 = cents.iter().map(|c| c.count).sum();
        if x < first.mean {
            return Some(0.0);
        }
        if x >= last.mean {
            return Some(1.0);
        }
        let mut cumulative = 0.0;
        for pair in cents.windows(2) {
            let left_center = cumulative + pair[0].count / 2.0;
            let right_center = cumulative + pair[0].count + pair[1].count / 2.0;
            if x < pair[1].mean {
                let frac = (x - pair[0].mean) / (pair[1].mean - pair[0].mean);
                return Some((right_center - left_center).mul_add(frac, left_center) / total);
            }
            cumulative += pair[0].count;
        }
        Some(1.0)
    }

    /// Weighted mean of the values between percentiles `lower` and `upper`.
    #[must_use]
    pub fn trimmed_mean(&self, lower: f64, upper: f64) -> Option<f64> {
        let cents = self.compressed();
        let total: f64 = cents.iter().map(|c| c.count).sum();
        let lo = lower.clamp(0.0, 100.0) / 100.0 * total;
        let hi = upper.clamp(0.0, 100.0) / 100.0 * total;
        let mut cumulative = 0.0;
        let mut weighted = 0.0;
        let mut weight = 0.0;
        for c in cents.iter() {
            let start = cumulative;
            let end = cumulative + c.count;
            let overlap = end.min(hi) - start.max(lo);
            if overlap > 0.0 {
                weighted += overlap * c.mean;
                weight += overlap;
            }
            cumulative = end;
        }
        (weight > 0.0).then(|| weighted / weight)
    }

    /// Returns the union of two digests using `self`'s parameters.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut out = Self::with_params(&self.name, self.delta, self.k);
        for c in self.centroids.iter().chain(&self.buffer).chain(&other.centroids).chain(&other.buffer) {
            out.buffer.push(*c);
            out.n += c.count;
        }
        out.compress();
        out
    }

    /// Converts to the wire form; buffered points are compressed first.
    #[must_use]
    pub fn to_message(&self) -> TDigestInstance {
        let cents = self.compressed();
        TDigestInstance {
            name: self.name.clone(),
            k: self.k,
            delta: self.delta,
            n: cents.iter().map(|c| c.count).sum(),
            centroids: cents
                .iter()
                .map(|c| proto::Centroid {
                    c: c.count,
                    m: c.mean,
                })
                .collect(),
        }
    }

    /// Parses the wire form.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Corrupt`] for non-positive parameters or
    /// unsorted centroids.
    pub fn from_message(message: &TDigestInstance) -> Result<Self, MetricsError> {
        if message.delta.is_nan() || message.delta <= 0.0 || message.k == 0 {
            return Err(MetricsError::Corrupt(format!("digest {} has invalid parameters", message.name)));
        }
        if message.centroids.windows(2).any(|w| w[0].m > w[1].m) {
            return Err(MetricsError::Corrupt(format!("digest {} centroids unsorted", message.name)));
        }
        Ok(Self {
            name: message.name.clone(),
            delta: message.delta,
            k: message.k,
            n: message.centroids.iter().map(|c| c.c).sum(),
            centroids: message
                .centroids
                .iter()
                .map(|c| Centroid {
                    mean: c.m,
                    count: c.c,
                })
                .collect(),
            buffer: Vec::new(),
        })
    }
}

impl Add for &TDigest {
    type Output = TDigest;

    fn add(self, rhs: Self) -> TDigest {
        self.merge(rhs)
    }
}
