//! The central domain models and interface definitions for Castaway, the
//! core of a location-gated ephemeral-message platform.

pub mod access;
pub mod error;
pub mod geo;
pub mod models;
pub mod paths;
pub mod ports;
pub mod time;

// Re-exporting for easier access in other crates
pub use access::*;
pub use error::*;
pub use models::*;
pub use paths::DbPath;
pub use ports::*;
pub use time::{to_timestamp, Timestamp, DISTANT_FUTURE};

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn bottle_round_trips_through_wire_json() {
        let raw = serde_json::json!({
            "owner_uid": "u1",
            "created_at": 1_700_000_000.0,
            "location": { "lat": 45.5, "lng": -73.5 },
            "conditions": { "exact_location": false, "one_shot": false },
            "content": { "text": "hello" },
            "chat_enabled": true,
            "status": {
                "locked": true,
                "dead": false,
                "alive_until": 64_092_211_200.0f64,
                "active_users_count": 0
            }
        });

        let bottle: Bottle = serde_json::from_value(raw).unwrap();
        assert!(bottle.status.locked);
        assert!(bottle.conditions.password.is_none());
        assert_eq!(bottle.content.text.as_deref(), Some("hello"));

        // Unset optionals must not appear on the wire.
        let encoded = serde_json::to_value(&bottle).unwrap();
        assert!(encoded.get("expires_at").is_none());
        assert!(encoded["conditions"].get("password").is_none());
    }

    #[test]
    fn weather_condition_presence() {
        assert!(!WeatherCondition::default().is_set());
        assert!(WeatherCondition { r#type: Some("rain".into()), threshold: None }.is_set());
        assert!(WeatherCondition { r#type: None, threshold: Some(0.5) }.is_set());
    }
}
