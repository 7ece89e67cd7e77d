//! Shared fixtures for the end-to-end scenarios under `tests/`: a pinned
//! clock, canned bottles, and direct store seeding that bypasses the
//! creation flow.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use domains::models::{Bottle, BottleConditions, BottleContent, BottleLocation, BottleStatus};
use domains::paths::DbPath;
use domains::ports::{Clock, MockClock, Store};
use domains::time::{Timestamp, DISTANT_FUTURE};
use services::creation::BottleDraft;
use storage_adapters::MemoryStore;

/// The fixed "now" every scenario runs at (2023-11-14T22:13:20Z).
pub const NOW: Timestamp = 1_700_000_000.0;

/// Installs a test subscriber at the configured level. Safe to call from
/// every test; only the first call wins.
pub fn init_tracing() {
    let level = configs::AppConfig::load()
        .map(|cfg| cfg.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .with_test_writer()
        .try_init();
}

/// A clock pinned to `ts` epoch seconds.
pub fn clock_at(ts: Timestamp) -> Arc<dyn Clock> {
    let instant = to_datetime(ts);
    let mut clock = MockClock::new();
    clock.expect_now().returning(move || instant);
    Arc::new(clock)
}

fn to_datetime(ts: Timestamp) -> DateTime<Utc> {
    Utc.timestamp_millis_opt((ts * 1_000.0).round() as i64)
        .single()
        .expect("fixture timestamp in range")
}

/// A plain bottle: locked, not dead, chat enabled, no gating conditions.
pub fn bottle(owner_uid: &str) -> Bottle {
    Bottle {
        owner_uid: owner_uid.to_string(),
        created_at: NOW - 3_600.0,
        expires_at: None,
        opened_at: None,
        location: BottleLocation { lat: 45.5019, lng: -73.5674 },
        conditions: BottleConditions::default(),
        content: BottleContent {
            text: Some("set adrift".into()),
            image_path: None,
            audio_path: None,
        },
        chat_enabled: true,
        status: BottleStatus {
            locked: true,
            dead: false,
            alive_until: DISTANT_FUTURE,
            active_users_count: 0,
        },
    }
}

/// Writes a bottle straight into the store, as if it already existed before
/// the scenario began.
pub async fn seed_bottle(store: &MemoryStore, id: &str, bottle: &Bottle) {
    let payload = serde_json::to_value(bottle).expect("fixture bottle encodes");
    store
        .set(&DbPath::bottle(id), payload)
        .await
        .expect("memory store writes cannot fail");
}

/// A valid draft ready for submission.
pub fn draft() -> BottleDraft {
    BottleDraft {
        created_at: NOW,
        location: BottleLocation { lat: 45.5019, lng: -73.5674 },
        text: Some("set adrift".into()),
        chat_enabled: true,
        ..Default::default()
    }
}
