/// Board definition for the Seeed EdgeBox ESP-100
///
/// This board includes:
/// - ESP32-S3 with WLAN
/// - PCF8563 real time clock on I2C0
/// - REPL on a UART header

use hwconf::config::parse_source;
use hwconf::{board_config_path, ConfigResult, Source};
use std::path::PathBuf;

/// Default configuration directory (embedded at compile time)
pub const CONFIG_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config");

/// Embedded board source
pub const BOARD_TOML: &str = include_str!("../config/board.toml");

/// Board target id, as used by `hwconf check`
pub const BOARD_ID: &str = "SEEED_EDGEBOX_ESP100";

/// Board name
pub const BOARD_NAME: &str = "Seeed EdgeBox ESP-100";

/// The embedded board source
pub fn board_source() -> ConfigResult<Source> {
    parse_source(concat!(env!("CARGO_MANIFEST_DIR"), "/config/board.toml"), BOARD_TOML)
}

/// Get the board directory (allow override via BOARD_CONFIG_PATH env var)
pub fn get_config_path() -> PathBuf {
    board_config_path(CONFIG_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwconf::consumer::{initialize, InitStep, TracingHal};
    use hwconf::{SourceRegistry, Tier, Value};

    fn registry() -> SourceRegistry {
        let mut registry = SourceRegistry::builtin().unwrap();
        registry.add_board(board_source().unwrap()).unwrap();
        registry
    }

    #[test]
    fn test_board_source_embedded() {
        let source = board_source().unwrap();
        assert_eq!(source.tier(), Tier::Board);
        assert_eq!(source.name(), BOARD_ID);
        assert_eq!(source.port(), Some("esp32"));
    }

    #[test]
    fn test_board_overrides_port() {
        let checked = registry().check(BOARD_ID, &[]).unwrap();
        let config = &checked.config;
        assert_eq!(config.get_string("MICROPY_HW_BOARD_NAME"), Some(BOARD_NAME));
        assert_eq!(config.get_string("MICROPY_HW_MCU_NAME"), Some("ESP32S3"));
        assert_eq!(config.get_integer("MICROPY_HW_I2C0_SCL"), Some(19));
        assert_eq!(config.get_integer("MICROPY_HW_I2C0_SDA"), Some(20));
        assert_eq!(
            config.value("MICROPY_PY_NETWORK_HOSTNAME_DEFAULT"),
            Some(&Value::from("Seeed-EdgeBox"))
        );
        assert!(checked.notes.iter().any(|n| n.param == "MICROPY_HW_I2C0_SDA"));
    }

    #[tokio::test]
    async fn test_init_sequence() {
        let checked = registry().check(BOARD_ID, &[]).unwrap();
        let report = initialize(&checked.config, &mut TracingHal).await.unwrap();
        assert_eq!(
            report.steps,
            vec![
                InitStep::Identity {
                    board: BOARD_NAME.to_string(),
                    mcu: "ESP32S3".to_string()
                },
                InitStep::RootFs { mounted: true },
                InitStep::Bus("i2c0".into()),
                InitStep::Device("rtc".into()),
                InitStep::Transport("uart_repl".into()),
                InitStep::Transport("wlan".into()),
            ]
        );
    }
}
