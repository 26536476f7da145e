//! Bridge defaults and their environment overrides.

use crate::error::BridgeError;

pub const DEFAULT_FILE_NAME: &str = "project.sb3";
pub const DEFAULT_SAVE_MIME: &str = "application/octet-stream";
pub const DEFAULT_OPEN_MIME: &str = "*/*";

pub const ENV_DEFAULT_NAME: &str = "FILESAVE_DEFAULT_NAME";
pub const ENV_SAVE_MIME: &str = "FILESAVE_SAVE_MIME";
pub const ENV_OPEN_MIME: &str = "FILESAVE_OPEN_MIME";
pub const ENV_MAX_READ_BYTES: &str = "FILESAVE_MAX_READ_BYTES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Suggested name when a save request carries none.
    pub default_file_name: String,
    /// MIME hint when a save request carries none.
    pub default_save_mime: String,
    /// MIME filter when an open request carries none.
    pub default_open_mime: String,
    /// Upper bound on bytes read for one open. `None` reads everything.
    pub max_read_bytes: Option<u64>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            default_file_name: DEFAULT_FILE_NAME.to_string(),
            default_save_mime: DEFAULT_SAVE_MIME.to_string(),
            default_open_mime: DEFAULT_OPEN_MIME.to_string(),
            max_read_bytes: None,
        }
    }
}

impl BridgeConfig {
    /// Defaults overlaid with the `FILESAVE_*` environment variables.
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`BridgeConfig::from_env`] with a custom variable source.
    /// Empty values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BridgeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = BridgeConfig::default();
        if let Some(v) = get(ENV_DEFAULT_NAME) {
            cfg.default_file_name = v;
        }
        if let Some(v) = get(ENV_SAVE_MIME) {
            cfg.default_save_mime = v;
        }
        if let Some(v) = get(ENV_OPEN_MIME) {
            cfg.default_open_mime = v;
        }
        if let Some(v) = get(ENV_MAX_READ_BYTES) {
            let limit = v
                .trim()
                .parse::<u64>()
                .map_err(|e| BridgeError::Config(format!("{}={:?}: {}", ENV_MAX_READ_BYTES, v, e)))?;
            cfg.max_read_bytes = Some(limit);
        }
        Ok(cfg)
    }
}
