use crate::config::read_file;
use crate::errors::{ConfigError, ConfigResult};
use crate::resolver::OverridePolicy;
use serde::Deserialize;
use std::path::Path;

pub const SETTINGS_FILE: &str = "hwconf.toml";

/// Tool settings from the optional `hwconf.toml` in the config directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub resolver: ResolverSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub override_policy: OverridePolicy,
}

pub fn parse_settings(path: &str, content: &str) -> ConfigResult<Settings> {
    toml::from_str(content).map_err(|source| ConfigError::FormatError {
        path: path.to_string(),
        source,
    })
}

/// Load `hwconf.toml` from `dir`; a missing file means defaults
pub fn load_settings(dir: &Path) -> ConfigResult<Settings> {
    let path = dir.join(SETTINGS_FILE);
    if !path.is_file() {
        return Ok(Settings::default());
    }
    let content = read_file(&path)?;
    parse_settings(&path.display().to_string(), &content)
}
