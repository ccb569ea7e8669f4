// crates/strata-core/src/core/time.rs
// ============================================================================
// Module: Strata Time Helpers
// Description: Wall-clock timestamps and duration arithmetic for job records.
// Purpose: Stamp store objects and compute job durations with sign-consistent carry.
// Dependencies: time, crate::proto
// ============================================================================

//! ## Overview
//! Timestamps are captured in UTC and stored as `(seconds, nanos)` pairs. Job
//! durations are normalized so both components carry the same sign.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;

use crate::proto::Duration;
use crate::proto::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Nanoseconds per second.
const NANOS_PER_SECOND: i32 = 1_000_000_000;

// ============================================================================
// SECTION: Timestamps
// ============================================================================

/// Returns the current UTC wall-clock time.
#[must_use]
pub fn now_timestamp() -> Timestamp {
    let now = OffsetDateTime::now_utc();
    Timestamp {
        seconds: now.unix_timestamp(),
        nanos: i32::try_from(now.nanosecond()).unwrap_or(0),
    }
}

/// Returns `finished - started` with seconds and nanos sharing one sign.
#[must_use]
pub fn duration_between(started: &Timestamp, finished: &Timestamp) -> Duration {
    let mut seconds = finished.seconds - started.seconds;
    let mut nanos = finished.nanos - started.nanos;
    if seconds < 0 && nanos > 0 {
        seconds += 1;
        nanos -= NANOS_PER_SECOND;
    } else if seconds > 0 && nanos < 0 {
        seconds -= 1;
        nanos += NANOS_PER_SECOND;
    }
    Duration { seconds, nanos }
}

/// Renders a timestamp as RFC 3339 for reports.
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    let nanos = i128::from(ts.seconds) * 1_000_000_000 + i128::from(ts.nanos);
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_else(|| format!("{}s", ts.seconds))
}
