// Public modules
pub mod catalog;
pub mod config;
pub mod consumer;
pub mod emit;
pub mod errors;
pub mod matrix;
pub mod registry;
pub mod resolved;
pub mod resolver;
pub mod source;
pub mod validator;
pub mod value;

// Re-export commonly used types
pub use catalog::{Catalog, ParamSpec, PeripheralKind, PeripheralSpec, Roles};
pub use consumer::{initialize, BoardHal, InitReport, PeripheralConfig, TracingHal};
pub use errors::{ConfigError, ConfigResult, TargetError, TargetResult, Violation, Violations};
pub use matrix::{check_all, TargetReport};
pub use registry::SourceRegistry;
pub use resolved::{install, installed, ResolvedConfiguration, ValidatedConfig};
pub use resolver::{OverridePolicy, Resolver};
pub use source::{Origin, Source, SourceStack, Tier};
pub use validator::{check_target, CheckedTarget, Validator};
pub use value::{ParamType, PinId, Value};

use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

/// Environment variable naming the config directory (catalog, defaults, ports)
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Environment variable naming a single board's directory, for board binaries
pub const BOARD_CONFIG_PATH_ENV: &str = "BOARD_CONFIG_PATH";

/// Config directory from `CONFIG_PATH`, if set
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from)
}

/// Board directory from `BOARD_CONFIG_PATH`, else `default`
pub fn board_config_path(default: &str) -> PathBuf {
    std::env::var_os(BOARD_CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Registry from `CONFIG_PATH` when set, else the built-in configuration.
/// No boards are added.
pub fn default_registry() -> ConfigResult<SourceRegistry> {
    match config_path() {
        Some(dir) => SourceRegistry::load(&dir),
        None => SourceRegistry::builtin(),
    }
}

/// Registry from `config_dir` when given, else the built-in configuration,
/// with every board under `boards_dir` added
pub fn open_registry(config_dir: Option<&Path>, boards_dir: &Path) -> ConfigResult<SourceRegistry> {
    let mut registry = match config_dir {
        Some(dir) => SourceRegistry::load(dir)?,
        None => SourceRegistry::builtin()?,
    };
    if boards_dir.is_dir() {
        registry.load_boards(boards_dir)?;
    }
    Ok(registry)
}

/// Validate one board, install its snapshot and run the init sequence on a
/// dry-run hardware layer
pub async fn run_board(registry: &SourceRegistry, board: &str) -> Result<InitReport, Box<dyn std::error::Error>> {
    info!("[hwconf] bringing up {}...", board);

    let checked = registry.check(board, &[])?;
    for note in &checked.notes {
        info!("[hwconf] {} overridden by {}", note.param, note.winner);
    }

    let config = install(checked.config)?;
    let report = initialize(config, &mut TracingHal).await?;
    info!("[hwconf] {} ready after {} step(s)", board, report.steps.len());
    Ok(report)
}
