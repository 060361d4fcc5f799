//! Loads the catalog and every source, and assembles the stack for a board.

use crate::catalog::Catalog;
use crate::config::{
    load_board_dir, load_catalog, load_settings, load_source, parse_catalog, parse_source,
    settings::parse_settings, source_config::BOARD_FILE, Settings,
};
use crate::errors::{ConfigError, ConfigResult, TargetError, TargetResult};
use crate::resolver::Resolver;
use crate::source::{Source, SourceStack, Tier};
use crate::validator::{check_target, CheckedTarget};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Embedded configuration, used when no config directory is given
pub const CATALOG_TOML: &str = include_str!("../config/catalog.toml");
pub const DEFAULTS_TOML: &str = include_str!("../config/defaults.toml");
pub const SETTINGS_TOML: &str = include_str!("../config/hwconf.toml");
pub const PORT_TOMLS: &[(&str, &str)] = &[
    ("esp32", include_str!("../config/ports/esp32.toml")),
    ("rp2", include_str!("../config/ports/rp2.toml")),
];

/// Name of the source holding command-line overrides
pub const USER_SOURCE: &str = "command-line";

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    catalog: Arc<Catalog>,
    settings: Settings,
    defaults: Source,
    ports: BTreeMap<String, Source>,
    boards: BTreeMap<String, Source>,
}

impl SourceRegistry {
    pub fn new(catalog: Catalog, defaults: Source) -> ConfigResult<Self> {
        expect_tier(&defaults, Tier::Default)?;
        Ok(Self {
            catalog: Arc::new(catalog),
            settings: Settings::default(),
            defaults,
            ports: BTreeMap::new(),
            boards: BTreeMap::new(),
        })
    }

    /// Catalog, defaults and ports compiled into the crate. No boards.
    pub fn builtin() -> ConfigResult<Self> {
        let catalog = parse_catalog("<builtin>/catalog.toml", CATALOG_TOML)?;
        let defaults = parse_source("<builtin>/defaults.toml", DEFAULTS_TOML)?;
        let mut registry = Self::new(catalog, defaults)?;
        registry.settings = parse_settings("<builtin>/hwconf.toml", SETTINGS_TOML)?;
        for (name, content) in PORT_TOMLS {
            registry.add_port(parse_source(&format!("<builtin>/ports/{}.toml", name), content)?)?;
        }
        Ok(registry)
    }

    /// Load `catalog.toml`, `defaults.toml`, `hwconf.toml` and `ports/*.toml`
    /// from a config directory
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        info!("[registry] loading configuration from {}", config_dir.display());
        let catalog = load_catalog(&config_dir.join("catalog.toml"))?;
        let defaults = load_source(&config_dir.join("defaults.toml"))?;
        let mut registry = Self::new(catalog, defaults)?;
        registry.settings = load_settings(config_dir)?;

        let ports_dir = config_dir.join("ports");
        for path in sorted_entries(&ports_dir)? {
            if path.extension().is_some_and(|ext| ext == "toml") {
                registry.add_port(load_source(&path)?)?;
            }
        }
        info!(
            "[registry] catalog v{} with {} parameter(s), {} port(s)",
            registry.catalog.version(),
            registry.catalog.len(),
            registry.ports.len()
        );
        Ok(registry)
    }

    /// Add every board under `boards_dir`. A board lives in `<dir>/board.toml`
    /// or `<dir>/config/board.toml`, optionally next to `mpconfigboard.h`.
    pub fn load_boards(&mut self, boards_dir: &Path) -> ConfigResult<usize> {
        let mut added = 0;
        for dir in sorted_entries(boards_dir)? {
            let board_dir = if dir.join(BOARD_FILE).is_file() {
                dir
            } else if dir.join("config").join(BOARD_FILE).is_file() {
                dir.join("config")
            } else {
                debug!("[registry] skipping {}: no {}", dir.display(), BOARD_FILE);
                continue;
            };
            self.add_board(load_board_dir(&board_dir)?)?;
            added += 1;
        }
        info!("[registry] loaded {} board(s) from {}", added, boards_dir.display());
        Ok(added)
    }

    pub fn add_port(&mut self, port: Source) -> ConfigResult<()> {
        expect_tier(&port, Tier::Port)?;
        self.check_catalog_version(&port)?;
        debug!("[registry] port {} ({} parameter(s))", port.name(), port.len());
        self.ports.insert(port.name().to_string(), port);
        Ok(())
    }

    pub fn add_board(&mut self, board: Source) -> ConfigResult<()> {
        expect_tier(&board, Tier::Board)?;
        self.check_catalog_version(&board)?;
        debug!("[registry] board {} ({} parameter(s))", board.name(), board.len());
        self.boards.insert(board.name().to_string(), board);
        Ok(())
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn board_names(&self) -> impl Iterator<Item = &str> {
        self.boards.keys().map(String::as_str)
    }

    pub fn board(&self, name: &str) -> Option<&Source> {
        self.boards.get(name)
    }

    pub fn port(&self, name: &str) -> Option<&Source> {
        self.ports.get(name)
    }

    /// Ordered stack for a board: defaults, its port, the board, then any
    /// user overrides on top
    pub fn stack_for(&self, board: &str, overrides: &[(String, Value)]) -> ConfigResult<SourceStack> {
        let board_source = self.boards.get(board).ok_or_else(|| ConfigError::UnknownBoard {
            board: board.to_string(),
        })?;

        let mut stack = SourceStack::new();
        stack.push(self.defaults.clone());
        if let Some(port_name) = board_source.port() {
            let port = self.ports.get(port_name).ok_or_else(|| ConfigError::UnknownPort {
                board: board.to_string(),
                port: port_name.to_string(),
            })?;
            stack.push(port.clone());
        }
        stack.push(board_source.clone());

        if !overrides.is_empty() {
            let mut user = Source::new(Tier::User, USER_SOURCE);
            for (name, value) in overrides {
                user.insert(name, value.clone());
            }
            stack.push(user);
        }
        Ok(stack)
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.catalog.clone()).with_policy(self.settings.resolver.override_policy)
    }

    /// Resolve and validate one board
    pub fn check(&self, board: &str, overrides: &[(String, Value)]) -> TargetResult<CheckedTarget> {
        let stack = self.stack_for(board, overrides)?;
        check_target(&self.resolver(), &stack).map_err(TargetError::from)
    }

    fn check_catalog_version(&self, source: &Source) -> ConfigResult<()> {
        match source.requires_catalog() {
            Some(required) if required > self.catalog.version() => Err(ConfigError::CatalogTooOld {
                name: source.name().to_string(),
                required,
                available: self.catalog.version(),
            }),
            _ => Ok(()),
        }
    }
}

fn expect_tier(source: &Source, tier: Tier) -> ConfigResult<()> {
    if source.tier() == tier {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: format!("{}: source.tier", source.name()),
            reason: format!("expected a {} source, found {}", tier, source.tier()),
        })
    }
}

fn sorted_entries(dir: &Path) -> ConfigResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::LoadError {
        path: dir.display().to_string(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::LoadError {
            path: dir.display().to_string(),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}
