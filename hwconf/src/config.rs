pub mod catalog_config;
pub mod settings;
pub mod source_config;

pub use catalog_config::{load_catalog, parse_catalog};
pub use settings::{load_settings, Settings};
pub use source_config::{load_board_dir, load_source, merge_header, parse_source};

use crate::errors::{ConfigError, ConfigResult};
use std::fs;
use std::path::Path;

/// Read a config file, attaching the path to any I/O error
pub(crate) fn read_file(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.display().to_string(),
        source,
    })
}
