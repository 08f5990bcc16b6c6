//! Config file loading
//!
//! ## Environment Variables: `{env:VAR}`
//!
//! Any string value of the exact form `{env:VAR}` is replaced by the value of
//! `VAR` before the file is deserialized:
//!
//! ```toml
//! [memorydb]
//! resource = "{env:DSWARM_RESOURCE}"
//! ```
//!
//! The variable must be set or loading fails.

use crate::error::{ConfigError, ConfigResult};
use crate::DswarmConfig;
use std::path::Path;
use tracing::{debug, warn};

const ENV_REF_PREFIX: &str = "{env:";
const ENV_REF_SUFFIX: &str = "}";

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<DswarmConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::load_from_str(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse TOML text; parse errors carry an empty path
    pub fn load_from_str(content: &str) -> ConfigResult<DswarmConfig> {
        let parse_error = |e: toml::de::Error| ConfigError::Parse {
            path: Default::default(),
            message: e.to_string(),
        };

        let mut value: toml::Value = toml::from_str(content).map_err(parse_error)?;
        resolve_env_refs(&mut value)?;
        let config: DswarmConfig = value.try_into().map_err(parse_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<DswarmConfig> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(DswarmConfig::default()),
        }
    }
}

fn extract_env_var(s: &str) -> Option<&str> {
    s.strip_prefix(ENV_REF_PREFIX)?.strip_suffix(ENV_REF_SUFFIX)
}

/// Replace every `{env:VAR}` string in the tree; fails on the first unset variable
fn resolve_env_refs(value: &mut toml::Value) -> ConfigResult<()> {
    match value {
        toml::Value::String(s) => {
            if let Some(var_name) = extract_env_var(s) {
                let resolved = std::env::var(var_name).map_err(|_| {
                    warn!("Environment variable not found: {}", var_name);
                    ConfigError::EnvVarNotFound(var_name.to_string())
                })?;
                *value = toml::Value::String(resolved);
            }
        }
        toml::Value::Array(items) => {
            for item in items.iter_mut() {
                resolve_env_refs(item)?;
            }
        }
        toml::Value::Table(table) => {
            for (_key, val) in table.iter_mut() {
                resolve_env_refs(val)?;
            }
        }
        _ => {}
    }
    Ok(())
}
