//! Wire-compatible timestamps.
//!
//! The store keeps all instants as epoch seconds (`f64`), so the domain does
//! too. `chrono` appears only at the `Clock` port boundary.

use chrono::{DateTime, Utc};

/// Seconds since the Unix epoch, fractional.
pub type Timestamp = f64;

/// Sentinel used for `status.alive_until` on freshly created bottles, far
/// enough out that it never expires before the cleanup worker decides.
/// Matches the value already present in the store population.
pub const DISTANT_FUTURE: Timestamp = 64_092_211_200.0;

/// Converts a wall-clock instant to a wire timestamp.
pub fn to_timestamp(instant: DateTime<Utc>) -> Timestamp {
    instant.timestamp_millis() as f64 / 1_000.0
}
