use crate::config::read_file;
use crate::errors::{ConfigError, ConfigResult};
use crate::source::{header, Source, Tier};
use crate::value::Value;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Legacy header that may sit next to a board's `board.toml`
pub const BOARD_HEADER: &str = "mpconfigboard.h";
pub const BOARD_FILE: &str = "board.toml";

/// Root of a source file: a `[source]` header and a `[params]` table
#[derive(Debug, Deserialize)]
pub struct SourceFile {
    pub source: SourceHeader,
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SourceHeader {
    pub tier: Tier,
    pub name: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub requires_catalog: Option<u32>,
}

/// Parse source TOML. `path` is only used in error messages.
pub fn parse_source(path: &str, content: &str) -> ConfigResult<Source> {
    let file: SourceFile = toml::from_str(content).map_err(|source| ConfigError::FormatError {
        path: path.to_string(),
        source,
    })?;

    let mut source = Source::new(file.source.tier, &file.source.name);
    if let Some(port) = &file.source.port {
        source = source.with_port(port);
    }
    if let Some(version) = file.source.requires_catalog {
        source = source.with_required_catalog(version);
    }

    for (name, raw) in &file.params {
        let value = Value::from_toml(raw).ok_or_else(|| ConfigError::InvalidValue {
            field: format!("{}: params.{}", path, name),
            reason: format!("{} values are not supported", raw.type_str()),
        })?;
        source.insert(name, value);
    }
    Ok(source)
}

/// Load a source file
pub fn load_source(path: &Path) -> ConfigResult<Source> {
    let content = read_file(path)?;
    parse_source(&path.display().to_string(), &content)
}

/// Load a board directory: `board.toml`, plus the defines of `mpconfigboard.h`
/// when present. A parameter may only be bound by one of the two files.
pub fn load_board_dir(dir: &Path) -> ConfigResult<Source> {
    let mut board = load_source(&dir.join(BOARD_FILE))?;

    let header_path = dir.join(BOARD_HEADER);
    if header_path.is_file() {
        let text = read_file(&header_path)?;
        merge_header(&mut board, &header_path.display().to_string(), &text)?;
    }
    Ok(board)
}

/// Add the defines of a legacy header to a board source
pub fn merge_header(board: &mut Source, path: &str, text: &str) -> ConfigResult<()> {
    let defines = header::parse(board.tier(), board.name(), path, text)?;
    debug!("[config] {}: {} define(s) from {}", board.name(), defines.len(), path);
    for (name, value) in defines.iter() {
        if board.get(name).is_some() {
            return Err(ConfigError::InvalidValue {
                field: name.to_string(),
                reason: format!("bound in both {} and {}", BOARD_FILE, path),
            });
        }
        board.insert(name, value.clone());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PinId;

    const EDGEBOX: &str = r#"
[source]
tier = "board"
name = "SEEED_EDGEBOX_ESP100"
port = "esp32"
requires_catalog = 3

[params]
MICROPY_HW_BOARD_NAME = "Seeed EdgeBox ESP-100"
MICROPY_HW_ENABLE_UART_REPL = true
MICROPY_HW_I2C0_SCL = 19
"#;

    #[test]
    fn test_parse_board_source() {
        let board = parse_source("board.toml", EDGEBOX).unwrap();
        assert_eq!(board.tier(), Tier::Board);
        assert_eq!(board.port(), Some("esp32"));
        assert_eq!(board.requires_catalog(), Some(3));
        assert_eq!(board.get("MICROPY_HW_I2C0_SCL").and_then(Value::as_pin), Some(PinId(19)));
    }

    #[test]
    fn test_float_values_rejected() {
        let err = parse_source("p.toml", "[source]\ntier = \"port\"\nname = \"esp32\"\n[params]\nX = 1.5\n").unwrap_err();
        match err {
            ConfigError::InvalidValue { field, .. } => assert!(field.ends_with("params.X")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_tier_is_format_error() {
        let err = parse_source("p.toml", "[source]\ntier = \"chip\"\nname = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::FormatError { .. }));
    }

    #[test]
    fn test_header_merge_rejects_double_binding() {
        let mut board = parse_source("board.toml", EDGEBOX).unwrap();
        merge_header(&mut board, "mpconfigboard.h", "#define MICROPY_HW_I2C0_SDA (20)\n").unwrap();
        assert_eq!(board.get("MICROPY_HW_I2C0_SDA"), Some(&Value::Int(20)));

        let err = merge_header(&mut board, "mpconfigboard.h", "#define MICROPY_HW_I2C0_SCL (18)\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
