//! # Condition Resolver
//!
//! Pure mapping from (bottle, viewer context) to an [`AccessState`]. Total
//! for well-formed input, no side effects. Callers must re-run it whenever
//! the bottle snapshot, the clock, the viewer's distance, or the supplied
//! password changes; it never mutates a previously returned state.

use domains::access::{AccessState, LockReason, ViewerContext};
use domains::models::Bottle;

/// Evaluation order is strict: the first matching rule wins, earlier checks
/// dominate later ones. A dead bottle with an unmet password still resolves
/// to `Expired`.
pub fn resolve(bottle: &Bottle, ctx: &ViewerContext) -> AccessState {
    let now = ctx.now;

    // 1. Lifecycle dominates everything. Expiry boundary is inclusive.
    if bottle.status.dead || now >= bottle.status.alive_until {
        return AccessState::Expired;
    }

    // 2. An already-unlocked bottle ignores its conditions.
    if !bottle.status.locked {
        return AccessState::Unlocked;
    }

    let conditions = &bottle.conditions;

    // 3. Absolute unlock time.
    if let Some(unlock_at) = conditions.unlock_at_time {
        if now < unlock_at {
            return AccessState::Locked(LockReason::TimeLocked { unlock_at });
        }
    }

    // 4. Recurring window.
    if let Some(window) = conditions.time_window {
        if let Some(start) = window.start {
            if now < start {
                return AccessState::Locked(LockReason::TimeWindow {
                    start: Some(start),
                    end: window.end,
                });
            }
        }
        if let Some(end) = window.end {
            if now > end {
                return AccessState::Locked(LockReason::TimeWindow {
                    start: window.start,
                    end: Some(end),
                });
            }
        }
    }

    // 5/6. Distance ring. Too-close is checked before too-far.
    if let Some(min_km) = conditions.distance_min {
        if ctx.distance_km < min_km {
            return AccessState::Locked(LockReason::TooClose {
                min_km,
                actual_km: ctx.distance_km,
            });
        }
    }
    if let Some(max_km) = conditions.distance_max {
        if ctx.distance_km > max_km {
            return AccessState::Locked(LockReason::TooFar {
                max_km,
                actual_km: ctx.distance_km,
            });
        }
    }

    // 7. Weather is never evaluated locally; a present condition always
    // locks until an external weather oracle is introduced.
    if let Some(weather) = &conditions.weather {
        if weather.is_set() {
            return AccessState::Locked(LockReason::WeatherLocked);
        }
    }

    // 8. Password.
    if let Some(password) = &conditions.password {
        if !password.is_empty() {
            if ctx.supplied_password.is_empty() {
                return AccessState::Locked(LockReason::PasswordRequired);
            }
            if &ctx.supplied_password != password {
                return AccessState::Locked(LockReason::PasswordIncorrect);
            }
        }
    }

    // 9. Every gate passed; the persisted `locked` flag still needs an
    // explicit unlock operation to flip.
    AccessState::Locked(LockReason::Unknown)
}
