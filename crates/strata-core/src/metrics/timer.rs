// crates/strata-core/src/metrics/timer.rs
// ============================================================================
// Module: Strata Stopwatch
// Description: Millisecond wall-clock timing.
// Purpose: Feed timing histograms.
// Dependencies: std::time
// ============================================================================

use std::time::Instant;

/// Started stopwatch reporting elapsed milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    /// Start instant.
    started: Instant,
}

impl Stopwatch {
    /// Starts a stopwatch.
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Milliseconds since start.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1_000.0
    }
}

/// Runs `f` and returns its result with the elapsed milliseconds.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let watch = Stopwatch::start();
    let out = f();
    (out, watch.elapsed_ms())
}
