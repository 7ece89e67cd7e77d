//! # Access State
//!
//! The derived result of evaluating a bottle's access conditions for one
//! viewer. Never persisted: it is recomputed from scratch whenever the
//! bottle, the clock, the viewer's distance, or the supplied password
//! changes, and never incrementally patched.

use crate::time::Timestamp;

/// Exactly one state is active for a given (bottle, viewer-context) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessState {
    /// No snapshot has arrived yet.
    Loading,
    /// Dead, or `alive_until` has passed (inclusive boundary).
    Expired,
    /// The persisted `locked` flag is still set; the reason says which gate
    /// holds it shut.
    Locked(LockReason),
    Unlocked,
    /// Surfaced instead of throwing past the session boundary.
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LockReason {
    PasswordRequired,
    PasswordIncorrect,
    TooFar { max_km: f64, actual_km: f64 },
    TooClose { min_km: f64, actual_km: f64 },
    TimeLocked { unlock_at: Timestamp },
    TimeWindow { start: Option<Timestamp>, end: Option<Timestamp> },
    WeatherLocked,
    /// Every gate passed but the persisted `locked` flag has not been
    /// flipped by an unlock operation yet.
    Unknown,
}

/// Ephemeral per-session inputs to condition resolution. `distance_km` is
/// precomputed externally from the viewer's location to the bottle's drop
/// point.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    pub now: Timestamp,
    pub distance_km: f64,
    pub supplied_password: String,
}
