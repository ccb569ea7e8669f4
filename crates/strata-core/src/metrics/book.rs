// crates/strata-core/src/metrics/book.rs
// ============================================================================
// Module: Strata Metric Books
// Description: Keyed collections of histograms and t-digests.
// Purpose: Book, fill, rebin, merge, and serialize per-job metrics.
// Dependencies: crate::{core, proto}
// ============================================================================

//! ## Overview
//! A [`HistogramBook`] maps `component.name` keys to [`Histogram1D`]s. Keys
//! booked with `timer = true` also keep their raw samples until
//! [`HistogramBook::rebook`], which replaces each timer's bins with ones
//! derived from the observed samples and stops further sample collection.
//!
//! Books merge with `+`: shared keys must have identical bins and add
//! bin-by-bin; disjoint keys are unioned. The operation is commutative and
//! associative, so partial books from independent workers can be combined in
//! any order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::ops::Add;

use tracing::debug;
use tracing::warn;

use super::MetricsError;
use super::histogram::Histogram1D;
use super::histogram::autobinning;
use super::tdigest::TDigest;
use crate::core::wildcard_match;
use crate::proto::HistogramCollection;
use crate::proto::TDigestStore;

// ============================================================================
// SECTION: Histogram Book
// ============================================================================

/// Histograms keyed by `component.name`.
#[derive(Debug, Clone, Default)]
pub struct HistogramBook {
    /// Histograms by key.
    histograms: BTreeMap<String, Histogram1D>,
    /// Raw samples for timer keys, until rebook.
    timers: BTreeMap<String, Vec<f64>>,
    /// Original edges for timer keys.
    original_edges: BTreeMap<String, Vec<f64>>,
    /// True once rebook has run.
    rebooked: bool,
}

impl PartialEq for HistogramBook {
    fn eq(&self, other: &Self) -> bool {
        self.histograms == other.histograms
    }
}

/// Joins a component and metric name into a book key.
#[must_use]
pub fn book_key(component: &str, name: &str) -> String {
    format!("{component}.{name}")
}

impl HistogramBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Books a histogram. Re-booking an existing key keeps the original.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::InvalidBins`] for unusable edges.
    pub fn book(
        &mut self,
        component: &str,
        name: &str,
        edges: Vec<f64>,
        axis_name: &str,
        timer: bool,
    ) -> Result<(), MetricsError> {
        let key = book_key(component, name);
        if self.histograms.contains_key(&key) {
            warn!(key = %key, "histogram already booked");
            return Ok(());
        }
        let hist = Histogram1D::new(edges.clone())?.with_axis_name(axis_name);
        if timer {
            self.timers.insert(key.clone(), Vec::new());
            self.original_edges.insert(key.clone(), edges);
        }
        debug!(key = %key, timer, "booked histogram");
        self.histograms.insert(key, hist);
        Ok(())
    }

    /// Fills one value.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UnknownKey`] when the key was never booked.
    pub fn fill(&mut self, component: &str, name: &str, value: f64) -> Result<(), MetricsError> {
        self.fill_key(&book_key(component, name), value)
    }

    /// Fills one value by full key.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UnknownKey`] when the key was never booked.
    pub fn fill_key(&mut self, key: &str, value: f64) -> Result<(), MetricsError> {
        let hist = self
            .histograms
            .get_mut(key)
            .ok_or_else(|| MetricsError::UnknownKey(key.to_string()))?;
        hist.fill(value);
        if !self.rebooked
            && let Some(samples) = self.timers.get_mut(key)
        {
            samples.push(value);
        }
        Ok(())
    }

    /// Rebins every timer histogram not in `excludes` from its samples.
    ///
    /// Timers without usable samples fall back to their original edges.
    /// Every histogram is reset; sample collection stops afterwards.
    pub fn rebook(&mut self, excludes: &[&str]) {
        for (key, hist) in &mut self.histograms {
            if excludes.contains(&key.as_str()) {
                continue;
            }
            let edges = match self.timers.get(key) {
                Some(samples) => autobinning(samples).unwrap_or_else(|err| {
                    debug!(key = %key, error = %err, "autobinning fell back to booked bins");
                    self.original_edges.get(key).cloned().unwrap_or_else(|| hist.edges().to_vec())
                }),
                None => hist.edges().to_vec(),
            };
            let axis = hist.axis_name().to_string();
            match Histogram1D::new(edges) {
                Ok(fresh) => *hist = fresh.with_axis_name(&axis),
                Err(err) => warn!(key = %key, error = %err, "rebook kept existing bins"),
            }
        }
        self.timers.values_mut().for_each(Vec::clear);
        self.rebooked = true;
    }

    /// Returns a histogram by full key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Histogram1D> {
        self.histograms.get(key)
    }

    /// Returns every histogram whose key matches a `*`/`?` pattern.
    #[must_use]
    pub fn get_matching(&self, pattern: &str) -> Vec<(&str, &Histogram1D)> {
        self.histograms
            .iter()
            .filter(|(key, _)| wildcard_match(pattern, key))
            .map(|(key, hist)| (key.as_str(), hist))
            .collect()
    }

    /// Booked keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.histograms.keys().map(String::as_str)
    }

    /// Iterates histograms in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Histogram1D)> {
        self.histograms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True for timer keys.
    #[must_use]
    pub fn is_timer(&self, key: &str) -> bool {
        self.timers.contains_key(key)
    }

    /// Raw timer samples collected so far.
    #[must_use]
    pub fn timer_samples(&self, key: &str) -> Option<&[f64]> {
        self.timers.get(key).map(Vec::as_slice)
    }

    /// Number of booked histograms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// True when nothing is booked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Returns the bin-wise sum of two books.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::IncompatibleBins`] when a shared key differs in bins.
    pub fn merge(&self, other: &Self) -> Result<Self, MetricsError> {
        let mut out = self.clone();
        for (key, hist) in &other.histograms {
            match out.histograms.get_mut(key) {
                Some(existing) => {
                    existing
                        .merge(hist)
                        .map_err(|_| MetricsError::IncompatibleBins(key.clone()))?;
                }
                None => {
                    out.histograms.insert(key.clone(), hist.clone());
                }
            }
        }
        for (key, samples) in &other.timers {
            out.timers.entry(key.clone()).or_default().extend_from_slice(samples);
        }
        for (key, edges) in &other.original_edges {
            out.original_edges.entry(key.clone()).or_insert_with(|| edges.clone());
        }
        Ok(out)
    }

    /// Converts to the wire form.
    #[must_use]
    pub fn to_message(&self) -> HistogramCollection {
        HistogramCollection {
            histograms: self
                .histograms
                .iter()
                .map(|(key, hist)| (key.clone(), hist.to_message()))
                .collect(),
        }
    }

    /// Parses the wire form.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] for inconsistent histograms.
    pub fn from_message(message: &HistogramCollection) -> Result<Self, MetricsError> {
        let histograms = message
            .histograms
            .iter()
            .map(|(key, hist)| Histogram1D::from_message(hist).map(|h| (key.clone(), h)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self {
            histograms,
            ..Self::default()
        })
    }
}

impl Add for &HistogramBook {
    type Output = Result<HistogramBook, MetricsError>;

    fn add(self, rhs: Self) -> Self::Output {
        self.merge(rhs)
    }
}

// ============================================================================
// SECTION: T-Digest Book
// ============================================================================

/// T-digests keyed by `component.name`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TDigestBook {
    /// Digests by key.
    digests: BTreeMap<String, TDigest>,
}

impl TDigestBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Books an empty digest. Re-booking keeps the original.
    pub fn book(&mut self, component: &str, name: &str) {
        let key = book_key(component, name);
        self.digests.entry(key.clone()).or_insert_with(|| TDigest::new(&key));
    }

    /// Adds values to a digest, booking it on first use.
    pub fn fill(&mut self, component: &str, name: &str, values: &[f64]) {
        let key = book_key(component, name);
        self.digests
            .entry(key.clone())
            .or_insert_with(|| TDigest::new(&key))
            .batch_update(values);
    }

    /// Merges a digest into the entry at `key`.
    pub fn absorb(&mut self, key: &str, digest: &TDigest) {
        let merged = match self.digests.get(key) {
            Some(existing) => existing.merge(digest),
            None => digest.clone(),
        };
        self.digests.insert(key.to_string(), merged);
    }

    /// Returns a digest by full key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TDigest> {
        self.digests.get(key)
    }

    /// Booked keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.digests.keys().map(String::as_str)
    }

    /// Number of digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Resets every digest not in `excludes` to empty.
    pub fn rebook(&mut self, excludes: &[&str]) {
        for (key, digest) in &mut self.digests {
            if !excludes.contains(&key.as_str()) {
                *digest = TDigest::with_params(key, digest.delta(), super::tdigest::DEFAULT_K);
            }
        }
    }

    /// Returns the key-wise union of two books.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (key, digest) in &other.digests {
            out.absorb(key, digest);
        }
        out
    }

    /// Converts to the wire form.
    #[must_use]
    pub fn to_message(&self) -> TDigestStore {
        TDigestStore {
            digest_map: self
                .digests
                .iter()
                .map(|(key, digest)| (key.clone(), digest.to_message()))
                .collect(),
        }
    }

    /// Parses the wire form.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Corrupt`] for invalid digests.
    pub fn from_message(message: &TDigestStore) -> Result<Self, MetricsError> {
        let digests = message
            .digest_map
            .iter()
            .map(|(key, digest)| TDigest::from_message(digest).map(|d| (key.clone(), d)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Self { digests })
    }
}

impl Add for &TDigestBook {
    type Output = TDigestBook;

    fn add(self, rhs: Self) -> TDigestBook {
        self.merge(rhs)
    }
}
