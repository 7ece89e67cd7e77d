//! Layered configuration for Castaway embedders: defaults, then an optional
//! `castaway.toml`, then `CASTAWAY_*` environment variables (highest
//! priority). `.env` files are honored before the environment is read.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    pub presence: PresenceConfig,
    pub location: LocationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PresenceConfig {
    /// Heartbeat period while inside a bottle's chat, in seconds.
    pub heartbeat_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LocationConfig {
    pub desired_accuracy_m: f64,
    pub distance_filter_m: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filter directive for the tracing subscriber (e.g. "info").
    pub level: String,
}

impl AppConfig {
    /// Loads defaults -> `castaway.toml` (if present) -> `CASTAWAY_*` env.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load_from(config::File::with_name("castaway").required(false))
    }

    fn load_from(
        file: config::File<config::FileSourceFile, config::FileFormat>,
    ) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .set_default("presence.heartbeat_secs", 8)?
            .set_default("location.desired_accuracy_m", 100.0)?
            .set_default("location.distance_filter_m", 50.0)?
            .set_default("logging.level", "info")?
            .add_source(file)
            .add_source(config::Environment::with_prefix("CASTAWAY").separator("__"))
            .build()?;

        let loaded: Self = settings.try_deserialize()?;
        debug!(?loaded, "configuration loaded");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file_or_env() {
        let cfg =
            AppConfig::load_from(config::File::with_name("does-not-exist").required(false))
                .unwrap();
        assert_eq!(cfg.presence.heartbeat_secs, 8);
        assert_eq!(cfg.location.distance_filter_m, 50.0);
        assert_eq!(cfg.logging.level, "info");
    }
}
