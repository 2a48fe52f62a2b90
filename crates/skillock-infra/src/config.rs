//! Configuration loader for skillock.
//!
//! Reads `skillock.toml` from the config directory and deserializes it into
//! [`SkillockConfig`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::{Path, PathBuf};

use skillock_types::config::SkillockConfig;

/// Config file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "skillock.toml";

/// Minimum search bound (safety floor).
const MIN_MAX_DECISIONS: u64 = 100;

/// Load configuration from `{config_dir}/skillock.toml`.
///
/// - If the file does not exist, returns [`SkillockConfig::default()`].
/// - If the file exists but cannot be read or parsed, logs a warning and
///   returns the default.
/// - A `max_decisions` below 100 is raised to 100.
pub fn load_config(config_dir: &Path) -> SkillockConfig {
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    let content = match std::fs::read_to_string(&config_path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE_NAME} found at {}, using defaults", config_path.display());
            return SkillockConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return SkillockConfig::default();
        }
    };

    let mut config = match toml::from_str::<SkillockConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            return SkillockConfig::default();
        }
    };

    if config.max_decisions < MIN_MAX_DECISIONS {
        tracing::warn!(
            configured = config.max_decisions,
            floor = MIN_MAX_DECISIONS,
            "max_decisions below minimum, raising"
        );
        config.max_decisions = MIN_MAX_DECISIONS;
    }
    config
}

/// Resolve the config directory from environment or platform defaults.
///
/// Priority:
/// 1. `SKILLOCK_CONFIG_DIR` environment variable
/// 2. Platform config directory (e.g. `~/.config/skillock` on Linux)
/// 3. `.skillock` in the current directory
pub fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SKILLOCK_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(config) = dirs::config_dir() {
        return config.join("skillock");
    }

    PathBuf::from(".skillock")
}
