use crate::catalog::{Catalog, ParamSpec, PeripheralSpec, Roles};
use crate::config::read_file;
use crate::errors::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::Path;

/// Root of `catalog.toml`: `[roles]`, `[[param]]` and `[[peripheral]]` sections
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub version: u32,
    #[serde(default)]
    pub roles: Roles,
    #[serde(rename = "param", default)]
    pub params: Vec<ParamSpec>,
    #[serde(rename = "peripheral", default)]
    pub peripherals: Vec<PeripheralSpec>,
}

/// Parse catalog TOML. `path` is only used in error messages.
pub fn parse_catalog(path: &str, content: &str) -> ConfigResult<Catalog> {
    let file: CatalogFile = toml::from_str(content).map_err(|source| ConfigError::FormatError {
        path: path.to_string(),
        source,
    })?;
    Ok(Catalog::new(file.version, file.roles, file.params, file.peripherals)?)
}

/// Load catalog file
pub fn load_catalog(path: &Path) -> ConfigResult<Catalog> {
    let content = read_file(path)?;
    parse_catalog(&path.display().to_string(), &content)
}
