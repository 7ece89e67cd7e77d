//! # Domain Models
//!
//! These structs represent the core entities of Castaway. Field names match
//! the snake_case keys of the existing realtime-store population byte for
//! byte, so do not rename them without a data migration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::time::Timestamp;

/// A dropped message, pinned to a geographic point and gated by conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottle {
    pub owner_uid: String,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<Timestamp>,
    pub location: BottleLocation,
    pub conditions: BottleConditions,
    pub content: BottleContent,
    pub chat_enabled: bool,
    pub status: BottleStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BottleLocation {
    pub lat: f64,
    pub lng: f64,
}

/// Gating rules attached to a bottle. Every field is independently optional;
/// absence means that rule does not apply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BottleConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherCondition>,
    #[serde(default)]
    pub exact_location: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_at_time: Option<Timestamp>,
    #[serde(default)]
    pub one_shot: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<Timestamp>,
}

/// Persisted but never evaluated locally: the presence of either field keeps
/// the bottle weather-locked until an external weather oracle exists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl WeatherCondition {
    /// A weather condition with neither field set gates nothing.
    pub fn is_set(&self) -> bool {
        self.r#type.is_some() || self.threshold.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BottleContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
}

/// Mutable lifecycle flags. `locked` is flipped by an unlock operation,
/// `dead` by the external cleanup worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleStatus {
    pub locked: bool,
    pub dead: bool,
    pub alive_until: Timestamp,
    pub active_users_count: i64,
}

/// Record of a viewer who successfully unlocked a bottle, persisted at
/// `bottle_openers/{bottleId}/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottleOpener {
    pub opened_at: Timestamp,
    pub distance_from_drop_km: f64,
}

/// One chat message inside a bottle's room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    pub timestamp: Timestamp,
    pub distance_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_memory: Option<BTreeMap<String, String>>,
}

/// A chat message paired with its store key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: String,
    pub message: ChatMessage,
}

/// Presence heartbeat payload at `presence/{bottleId}/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub last_seen: Timestamp,
}

/// Projection of a bottle for map rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationItem {
    pub id: String,
    pub owner_uid: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: BottleStatus,
    pub expires_at: Option<Timestamp>,
}

/// One aggregated cell of nearby annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterItem {
    /// Grid cell key, `"{latIndex}:{lonIndex}"`.
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub count: usize,
}

/// The visible map region: a center coordinate plus an angular span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Coordinate,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// A fix delivered by the location provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub horizontal_accuracy: f64,
    pub timestamp: Timestamp,
}
