use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::interpolation::DEFAULT_INTERPOLATION_SECONDS;
use crate::mapping::{
    Calibration, DEFAULT_POSITION_OFFSET, DEFAULT_POSITION_SCALE_FACTOR, DEFAULT_REFERENCE_SCALE,
};
use crate::reconcile::MalformedEntityPolicy;
use crate::team::TeamTable;

pub const INTERPOLATION_ENV_VAR: &str = "REPLICA_INTERPOLATION_SECONDS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub interpolation_duration: f32,
    pub position_scale_factor: f32,
    pub position_offset: [f32; 3],
    pub reference_scale: [f32; 3],
    pub malformed_entity_policy: MalformedEntityPolicy,
    pub teams: TeamTable,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interpolation_duration: DEFAULT_INTERPOLATION_SECONDS,
            position_scale_factor: DEFAULT_POSITION_SCALE_FACTOR,
            position_offset: DEFAULT_POSITION_OFFSET.to_array(),
            reference_scale: DEFAULT_REFERENCE_SCALE.to_array(),
            malformed_entity_policy: MalformedEntityPolicy::default(),
            teams: TeamTable::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config json: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse config json at {path}: {source}")]
    ParseAt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl SyncConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let config = serde_path_to_error::deserialize::<_, SyncConfig>(&mut deserializer)
            .map_err(|error| {
                let path = error.path().to_string();
                let source = error.into_inner();
                if path.is_empty() || path == "." {
                    ConfigError::Parse { source }
                } else {
                    ConfigError::ParseAt { path, source }
                }
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn apply_env_overrides(&mut self) {
        match env::var(INTERPOLATION_ENV_VAR) {
            Ok(value) => self.override_interpolation_duration(&value),
            Err(env::VarError::NotPresent) => {}
            Err(err) => warn!(
                env_var = INTERPOLATION_ENV_VAR,
                error = %err,
                "unable to read interpolation env var; keeping config value"
            ),
        }
    }

    fn override_interpolation_duration(&mut self, raw: &str) {
        match raw.trim().parse::<f32>() {
            Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                self.interpolation_duration = seconds;
            }
            _ => warn!(
                env_var = INTERPOLATION_ENV_VAR,
                value = raw,
                fallback = self.interpolation_duration,
                "invalid interpolation env var value; keeping config value"
            ),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.interpolation_duration.is_finite() || self.interpolation_duration < 0.0 {
            return Err(invalid(
                "interpolation_duration",
                format!(
                    "expected finite seconds >= 0, got {}",
                    self.interpolation_duration
                ),
            ));
        }
        if !self.position_scale_factor.is_finite() {
            return Err(invalid(
                "position_scale_factor",
                format!("expected finite number, got {}", self.position_scale_factor),
            ));
        }
        if self.position_offset.iter().any(|value| !value.is_finite()) {
            return Err(invalid(
                "position_offset",
                format!("expected finite components, got {:?}", self.position_offset),
            ));
        }
        if self
            .reference_scale
            .iter()
            .any(|value| !value.is_finite() || *value == 0.0)
        {
            return Err(invalid(
                "reference_scale",
                format!(
                    "expected finite non-zero components, got {:?}",
                    self.reference_scale
                ),
            ));
        }
        if self.teams.is_empty() {
            return Err(invalid("teams", "at least one team code is required"));
        }
        Ok(())
    }

    pub fn calibration(&self) -> Calibration {
        Calibration {
            scale_factor: self.position_scale_factor,
            offset: Vec3::from_array(self.position_offset),
            reference_scale: Vec3::from_array(self.reference_scale),
        }
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}
