/// Board definition for the Raspberry Pi Pico W
///
/// The board parameters come from the legacy `mpconfigboard.h`; `board.toml`
/// only names the board and its port.

use hwconf::config::{merge_header, parse_source};
use hwconf::{board_config_path, ConfigResult, Source};
use std::path::PathBuf;

/// Default configuration directory (embedded at compile time)
pub const CONFIG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config");

/// Embedded board files
pub const BOARD_TOML: &str = include_str!("../config/board.toml");
pub const BOARD_HEADER: &str = include_str!("../config/mpconfigboard.h");

pub const BOARD_ID: &str = "RPI_PICO_W";

/// Board name
pub const BOARD_NAME: &str = "Raspberry Pi Pico W";

/// The embedded board source with the header defines merged in
pub fn board_source() -> ConfigResult<Source> {
    let mut source = parse_source(concat!(env!("CARGO_MANIFEST_DIR"), "/config/board.toml"), BOARD_TOML)?;
    merge_header(
        &mut source,
        concat!(env!("CARGO_MANIFEST_DIR"), "/config/mpconfigboard.h"),
        BOARD_HEADER,
    )?;
    Ok(source)
}

/// Get the board directory (allow override via BOARD_CONFIG_PATH env var)
pub fn get_config_path() -> PathBuf {
    board_config_path(CONFIG_DIR)
}
