use hwconf::consumer::{initialize, BoardHal, InitStep, PeripheralConfig};
use hwconf::errors::{HalResult, TargetError, ViolationKind};
use hwconf::{check_all, open_registry, SourceRegistry, Value};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn workspace_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

fn registry() -> SourceRegistry {
    open_registry(
        Some(&Path::new(env!("CARGO_MANIFEST_DIR")).join("config")),
        &workspace_dir().join("boards"),
    )
    .unwrap()
}

/// Records peripheral ids as they are brought up
#[derive(Default)]
struct MockHal {
    identity: Option<(String, String)>,
    opened: Vec<String>,
}

#[async_trait]
impl BoardHal for MockHal {
    async fn register_identity(&mut self, board: &str, mcu: &str) -> HalResult<()> {
        self.identity = Some((board.to_string(), mcu.to_string()));
        Ok(())
    }

    async fn mount_root_fs(&mut self) -> HalResult<()> {
        Ok(())
    }

    async fn open_bus(&mut self, bus: &PeripheralConfig) -> HalResult<()> {
        self.opened.push(bus.id.clone());
        Ok(())
    }

    async fn attach_device(&mut self, device: &PeripheralConfig) -> HalResult<()> {
        self.opened.push(device.id.clone());
        Ok(())
    }

    async fn start_transport(&mut self, transport: &PeripheralConfig) -> HalResult<()> {
        self.opened.push(transport.id.clone());
        Ok(())
    }
}

#[test]
fn test_loaded_config_matches_builtin() {
    let loaded = registry();
    let builtin = SourceRegistry::builtin().unwrap();
    assert_eq!(loaded.catalog(), builtin.catalog());
    assert_eq!(loaded.port("esp32"), builtin.port("esp32"));
    assert_eq!(loaded.settings(), builtin.settings());
}

#[test]
fn test_board_directories_discovered() {
    let registry = registry();
    let boards: Vec<&str> = registry.board_names().collect();
    assert_eq!(boards, vec!["RPI_PICO_W", "SEEED_EDGEBOX_ESP100"]);
}

#[test]
fn test_edgebox_with_builtin_catalog() {
    let checked = registry().check("SEEED_EDGEBOX_ESP100", &[]).unwrap();
    let config = &checked.config;
    assert_eq!(config.get_string("MICROPY_HW_BOARD_NAME"), Some("Seeed EdgeBox ESP-100"));
    assert_eq!(config.get_string("MICROPY_HW_MCU_NAME"), Some("ESP32S3"));
    assert_eq!(config.get_integer("MICROPY_HW_I2C0_SCL"), Some(19));
    assert_eq!(config.get_integer("MICROPY_HW_I2C0_SDA"), Some(20));
    assert_eq!(config.get_integer("MICROPY_HW_I2C0_FREQ"), Some(400_000));
    assert!(config.get_bool("MICROPY_HW_ENABLE_FLASH_FS"));
    assert!(!config.is_present("MICROPY_HW_LED_PIN"));
}

#[tokio::test]
async fn test_every_board_validates() {
    let registry = Arc::new(registry());
    let boards = registry.board_names().map(str::to_string).collect();
    let reports = check_all(registry, boards, Vec::new()).await;
    for report in &reports {
        assert!(report.is_ok(), "{} failed: {:?}", report.board, report.outcome);
    }
}

#[tokio::test]
async fn test_pico_w_brings_up_cyw43() {
    let checked = registry().check("RPI_PICO_W", &[]).unwrap();
    let mut hal = MockHal::default();
    let report = initialize(&checked.config, &mut hal).await.unwrap();

    assert_eq!(
        hal.identity,
        Some(("Raspberry Pi Pico W".to_string(), "RP2040".to_string()))
    );
    assert_eq!(hal.opened, vec!["i2c0", "spi1", "cyw43"]);
    assert_eq!(report.steps.first().map(|s| matches!(s, InitStep::Identity { .. })), Some(true));
}

#[test]
fn test_out_of_range_override() {
    let overrides = vec![("MICROPY_HW_I2C0_SCL".to_string(), Value::Int(64))];
    match registry().check("SEEED_EDGEBOX_ESP100", &overrides) {
        Err(TargetError::Invalid(violations)) => {
            assert_eq!(violations.kinds(), vec![ViolationKind::OutOfRange])
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_dependency_override() {
    let overrides = vec![("MICROPY_PY_NETWORK".to_string(), Value::Bool(false))];
    match registry().check("RPI_PICO_W", &overrides) {
        Err(TargetError::Invalid(violations)) => {
            assert_eq!(violations.kinds(), vec![ViolationKind::UnsatisfiedDependency])
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
