//! # Bottle Creation
//!
//! Draft validation and the step machine that walks a creation attempt from
//! location confirmation to a sealed bottle. Any validation or transport
//! failure fails closed into [`CreationStep::Error`] with a human-readable
//! message; nothing is thrown past this boundary.

use bytes::Bytes;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use domains::error::AppError;
use domains::models::{
    Bottle, BottleConditions, BottleContent, BottleLocation, BottleStatus, TimeWindow,
    WeatherCondition,
};
use domains::paths::storage;
use domains::ports::MediaStore;
use domains::time::{Timestamp, DISTANT_FUTURE};

use crate::bottles::BottleService;

/// Everything the creator has chosen, pre-upload. Media is carried as raw
/// bytes; the byte transfer itself lives behind the [`MediaStore`] port.
#[derive(Debug, Clone, Default)]
pub struct BottleDraft {
    pub created_at: Timestamp,
    pub location: BottleLocation,

    pub text: Option<String>,
    pub image: Option<Bytes>,
    pub audio: Option<Bytes>,

    pub password: Option<String>,
    pub time_window: TimeWindow,
    pub weather: WeatherCondition,
    pub exact_location: bool,
    pub distance_min: Option<f64>,
    pub distance_max: Option<f64>,
    pub unlock_at_time: Option<Timestamp>,
    pub one_shot: bool,

    pub chat_enabled: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("bottle must contain text, image, or audio")]
    EmptyContent,
    #[error("minimum distance cannot be greater than maximum distance")]
    InvalidDistanceRange,
    #[error("time window start cannot be after end")]
    InvalidTimeWindow,
}

impl From<DraftError> for AppError {
    fn from(err: DraftError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl BottleDraft {
    pub fn validate_for_submission(&self) -> Result<(), DraftError> {
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_text && self.image.is_none() && self.audio.is_none() {
            return Err(DraftError::EmptyContent);
        }

        if let (Some(min), Some(max)) = (self.distance_min, self.distance_max) {
            if min > max {
                return Err(DraftError::InvalidDistanceRange);
            }
        }

        if let (Some(start), Some(end)) = (self.time_window.start, self.time_window.end) {
            if start > end {
                return Err(DraftError::InvalidTimeWindow);
            }
        }

        Ok(())
    }

    fn time_window_payload(&self) -> Option<TimeWindow> {
        (self.time_window.start.is_some() || self.time_window.end.is_some())
            .then_some(self.time_window)
    }

    fn weather_payload(&self) -> Option<WeatherCondition> {
        self.weather.is_set().then(|| self.weather.clone())
    }

    /// Seals the draft into a persisted bottle. New bottles start locked,
    /// not dead, with an effectively unbounded `alive_until`; the cleanup
    /// worker owns later lifecycle transitions.
    pub fn to_bottle(
        &self,
        owner_uid: &str,
        image_path: Option<String>,
        audio_path: Option<String>,
    ) -> Bottle {
        Bottle {
            owner_uid: owner_uid.to_string(),
            created_at: self.created_at,
            expires_at: None,
            opened_at: None,
            location: self.location,
            conditions: BottleConditions {
                password: self.password.clone(),
                time_window: self.time_window_payload(),
                weather: self.weather_payload(),
                exact_location: self.exact_location,
                distance_min: self.distance_min,
                distance_max: self.distance_max,
                unlock_at_time: self.unlock_at_time,
                one_shot: self.one_shot,
            },
            content: BottleContent {
                text: self.text.as_deref().map(|t| t.trim().to_string()),
                image_path,
                audio_path,
            },
            chat_enabled: self.chat_enabled,
            status: BottleStatus {
                locked: true,
                dead: false,
                alive_until: DISTANT_FUTURE,
                active_users_count: 0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreationStep {
    LocationConfirm,
    Content,
    Conditions,
    Review,
    Submitting,
    Completed { bottle_id: String },
    Error(String),
}

/// Drives one creation attempt. The step machine only moves forward through
/// `advance`/`submit` and backward through `go_back`; terminal steps are
/// `Completed` and `Error`.
pub struct CreationFlow {
    step: CreationStep,
    pub draft: BottleDraft,
    bottles: BottleService,
    media: std::sync::Arc<dyn MediaStore>,
}

impl CreationFlow {
    pub fn new(
        draft: BottleDraft,
        bottles: BottleService,
        media: std::sync::Arc<dyn MediaStore>,
    ) -> Self {
        Self { step: CreationStep::LocationConfirm, draft, bottles, media }
    }

    pub fn step(&self) -> &CreationStep {
        &self.step
    }

    pub fn advance(&mut self) {
        self.step = match self.step {
            CreationStep::LocationConfirm => CreationStep::Content,
            CreationStep::Content => CreationStep::Conditions,
            CreationStep::Conditions => CreationStep::Review,
            _ => return,
        };
    }

    pub fn go_back(&mut self) {
        self.step = match self.step {
            CreationStep::Content => CreationStep::LocationConfirm,
            CreationStep::Conditions => CreationStep::Content,
            CreationStep::Review => CreationStep::Conditions,
            _ => return,
        };
    }

    /// Validates, uploads draft media, and persists the bottle. The id is
    /// pre-generated so the media store and the database agree on it.
    pub async fn submit(&mut self) -> &CreationStep {
        if self.step != CreationStep::Review {
            return &self.step;
        }
        self.step = CreationStep::Submitting;

        match self.try_submit().await {
            Ok(bottle_id) => {
                info!(bottle_id, "bottle creation succeeded");
                self.step = CreationStep::Completed { bottle_id };
            }
            Err(err) => {
                error!(error = %err, "bottle creation failed");
                self.step = CreationStep::Error(err.to_string());
            }
        }
        &self.step
    }

    async fn try_submit(&self) -> Result<String, AppError> {
        self.draft.validate_for_submission()?;

        let bottle_id = Uuid::now_v7().to_string();

        let image_path = self.upload_asset(&bottle_id, self.draft.image.clone(), "jpg").await?;
        let audio_path = self.upload_asset(&bottle_id, self.draft.audio.clone(), "m4a").await?;

        self.bottles.create_bottle(&bottle_id, &self.draft, image_path, audio_path).await
    }

    async fn upload_asset(
        &self,
        bottle_id: &str,
        data: Option<Bytes>,
        ext: &str,
    ) -> Result<Option<String>, AppError> {
        let Some(data) = data else { return Ok(None) };

        let filename = format!("{}.{ext}", Uuid::now_v7());
        let path = storage::bottle_asset(bottle_id, &filename);
        let content_type = if ext == "jpg" { "image/jpeg" } else { "audio/m4a" };

        let stored = self
            .media
            .upload(data, &path, content_type)
            .await
            .map_err(|err| AppError::Internal(format!("media upload failed: {err}")))?;

        Ok(Some(stored))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BottleDraft {
        BottleDraft {
            created_at: 1_700_000_000.0,
            location: BottleLocation { lat: 45.5, lng: -73.5 },
            text: Some("set adrift".into()),
            chat_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn whitespace_only_text_is_empty_content() {
        let mut d = draft();
        d.text = Some("   \n".into());
        assert_eq!(d.validate_for_submission(), Err(DraftError::EmptyContent));

        d.image = Some(Bytes::from_static(b"\xff\xd8"));
        assert_eq!(d.validate_for_submission(), Ok(()));
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let mut d = draft();
        d.distance_min = Some(5.0);
        d.distance_max = Some(1.0);
        assert_eq!(d.validate_for_submission(), Err(DraftError::InvalidDistanceRange));

        let mut d = draft();
        d.time_window = TimeWindow { start: Some(200.0), end: Some(100.0) };
        assert_eq!(d.validate_for_submission(), Err(DraftError::InvalidTimeWindow));
    }

    #[test]
    fn sealed_bottle_starts_locked_and_alive() {
        let b = draft().to_bottle("u1", None, None);
        assert!(b.status.locked);
        assert!(!b.status.dead);
        assert_eq!(b.status.alive_until, DISTANT_FUTURE);
        assert_eq!(b.opened_at, None);
        // Empty window/weather collapse to absent on the wire.
        assert_eq!(b.conditions.time_window, None);
        assert_eq!(b.conditions.weather, None);
    }

    #[test]
    fn text_is_trimmed_when_sealed() {
        let mut d = draft();
        d.text = Some("  hello  ".into());
        let b = d.to_bottle("u1", None, None);
        assert_eq!(b.content.text.as_deref(), Some("hello"));
    }
}
