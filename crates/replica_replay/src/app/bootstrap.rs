use std::env;
use std::path::PathBuf;

use replica::{ConfigError, SyncConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub const CONFIG_PATH_ENV_VAR: &str = "REPLICA_CONFIG";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub fn load_config() -> Result<SyncConfig, ConfigError> {
    let mut config = match resolve_config_path() {
        Some(path) => {
            info!(path = %path.display(), "config_loading");
            SyncConfig::load(&path)?
        }
        None => SyncConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    info!(
        interpolation_duration = config.interpolation_duration,
        position_scale_factor = config.position_scale_factor,
        policy = ?config.malformed_entity_policy,
        team_codes = config.teams.len(),
        "config_ready"
    );
    Ok(config)
}

fn resolve_config_path() -> Option<PathBuf> {
    match env::var(CONFIG_PATH_ENV_VAR) {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(PathBuf::from(value)),
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            warn!(
                env_var = CONFIG_PATH_ENV_VAR,
                error = %err,
                "unable to read config path env var; using defaults"
            );
            None
        }
    }
}
