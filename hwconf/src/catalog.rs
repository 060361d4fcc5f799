//! Parameter catalog: the closed, versioned set of recognized parameters.
//!
//! The catalog is the compatibility contract between the firmware core and board
//! authors. Entries are only ever appended; removing or retyping one is a
//! breaking change and bumps `version`.

use crate::errors::CatalogError;
use crate::value::{ParamType, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// One recognized parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub min: Option<i64>,
    #[serde(default)]
    pub max: Option<i64>,
    /// Flag gating a standalone pin; the pin claims nothing while the flag is unset
    #[serde(default)]
    pub enabled_by: Option<String>,
    /// Parameters that must be configured while this one is enabled
    #[serde(default)]
    pub requires: Vec<String>,
    /// Peripherals that must be configured while this one is enabled
    #[serde(default)]
    pub requires_peripherals: Vec<String>,
    #[serde(default)]
    pub doc: Option<String>,
}

impl ParamSpec {
    pub fn new(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: None,
            mandatory: false,
            min: None,
            max: None,
            enabled_by: None,
            requires: Vec::new(),
            requires_peripherals: Vec::new(),
            doc: None,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn enabled_by(mut self, flag: &str) -> Self {
        self.enabled_by = Some(flag.to_string());
        self
    }

    pub fn requires(mut self, param: &str) -> Self {
        self.requires.push(param.to_string());
        self
    }

    pub fn requires_peripheral(mut self, peripheral: &str) -> Self {
        self.requires_peripherals.push(peripheral.to_string());
        self
    }

    pub fn has_dependencies(&self) -> bool {
        !self.requires.is_empty() || !self.requires_peripherals.is_empty()
    }
}

/// Peripheral kinds the firmware core knows how to bring up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeripheralKind {
    I2c,
    Spi,
    Uart,
    Network,
    I2cDevice,
}

/// Order in which the consumer brings peripherals up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitPhase {
    Bus,
    Device,
    Transport,
}

impl PeripheralKind {
    pub fn phase(self) -> InitPhase {
        match self {
            PeripheralKind::I2c | PeripheralKind::Spi => InitPhase::Bus,
            PeripheralKind::I2cDevice => InitPhase::Device,
            PeripheralKind::Uart | PeripheralKind::Network => InitPhase::Transport,
        }
    }

    pub fn is_bus(self) -> bool {
        self.phase() == InitPhase::Bus
    }
}

impl std::fmt::Display for PeripheralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PeripheralKind::I2c => "i2c",
            PeripheralKind::Spi => "spi",
            PeripheralKind::Uart => "uart",
            PeripheralKind::Network => "network",
            PeripheralKind::I2cDevice => "i2c-device",
        };
        f.write_str(name)
    }
}

/// Grouping of pin and setting parameters that the consumer opens as a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralSpec {
    pub id: String,
    pub kind: PeripheralKind,
    #[serde(default)]
    pub enabled_by: Option<String>,
    /// Bus peripheral a device is attached to
    #[serde(default)]
    pub bus: Option<String>,
    /// role -> pin parameter
    #[serde(default)]
    pub pins: BTreeMap<String, String>,
    /// key -> non-pin parameter
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl PeripheralSpec {
    pub fn new(id: &str, kind: PeripheralKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            enabled_by: None,
            bus: None,
            pins: BTreeMap::new(),
            settings: BTreeMap::new(),
        }
    }

    pub fn pin(mut self, role: &str, param: &str) -> Self {
        self.pins.insert(role.to_string(), param.to_string());
        self
    }

    pub fn setting(mut self, key: &str, param: &str) -> Self {
        self.settings.insert(key.to_string(), param.to_string());
        self
    }

    pub fn enabled_by(mut self, flag: &str) -> Self {
        self.enabled_by = Some(flag.to_string());
        self
    }

    pub fn on_bus(mut self, bus: &str) -> Self {
        self.bus = Some(bus.to_string());
        self
    }
}

/// Parameters the consumer reads for fixed purposes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    #[serde(default)]
    pub board_name: Option<String>,
    #[serde(default)]
    pub mcu_name: Option<String>,
    #[serde(default)]
    pub flash_fs: Option<String>,
    #[serde(default)]
    pub gpio_count: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    version: u32,
    roles: Roles,
    params: Vec<ParamSpec>,
    index: HashMap<String, usize>,
    peripherals: Vec<PeripheralSpec>,
    /// pin parameter -> index of the peripheral that owns it
    pin_owner: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, checking its internal consistency
    pub fn new(
        version: u32,
        roles: Roles,
        params: Vec<ParamSpec>,
        peripherals: Vec<PeripheralSpec>,
    ) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(params.len());
        for (i, p) in params.iter().enumerate() {
            if index.insert(p.name.clone(), i).is_some() {
                return Err(CatalogError::DuplicateParameter { name: p.name.clone() });
            }
        }

        let mut seen_peripherals = HashSet::new();
        for per in &peripherals {
            if !seen_peripherals.insert(per.id.as_str()) {
                return Err(CatalogError::DuplicatePeripheral { id: per.id.clone() });
            }
        }

        let catalog = Self {
            version,
            roles,
            params,
            index,
            peripherals,
            pin_owner: HashMap::new(),
        };
        catalog.check_params()?;
        let pin_owner = catalog.check_peripherals()?;
        catalog.check_roles()?;

        Ok(Self { pin_owner, ..catalog })
    }

    /// Catalog with only parameters, no peripherals or roles
    pub fn from_params(params: Vec<ParamSpec>) -> Result<Self, CatalogError> {
        Self::new(1, Roles::default(), params, Vec::new())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter()
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.index.get(name).map(|&i| &self.params[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn peripherals(&self) -> impl Iterator<Item = &PeripheralSpec> {
        self.peripherals.iter()
    }

    pub fn peripheral(&self, id: &str) -> Option<&PeripheralSpec> {
        self.peripherals.iter().find(|p| p.id == id)
    }

    /// Peripheral owning a pin parameter, if any
    pub fn owner_of(&self, pin_param: &str) -> Option<&PeripheralSpec> {
        self.pin_owner.get(pin_param).map(|&i| &self.peripherals[i])
    }

    fn expect_param(&self, from: &str, to: &str, ty: Option<ParamType>) -> Result<(), CatalogError> {
        let target = self.param(to).ok_or_else(|| CatalogError::DanglingReference {
            from: from.to_string(),
            to: to.to_string(),
        })?;
        match ty {
            Some(expected) if target.ty != expected => Err(CatalogError::WrongReferenceType {
                from: from.to_string(),
                to: to.to_string(),
                expected,
            }),
            _ => Ok(()),
        }
    }

    fn check_params(&self) -> Result<(), CatalogError> {
        for p in &self.params {
            let ranged = matches!(p.ty, ParamType::Integer | ParamType::Pin);
            if (p.min.is_some() || p.max.is_some()) && !ranged {
                return Err(CatalogError::InvalidDefinition {
                    name: p.name.clone(),
                    reason: format!("a {} parameter cannot have a range", p.ty),
                });
            }
            if let (Some(min), Some(max)) = (p.min, p.max) {
                if min > max {
                    return Err(CatalogError::InvalidDefinition {
                        name: p.name.clone(),
                        reason: format!("empty range {}..={}", min, max),
                    });
                }
            }

            if let Some(default) = &p.default {
                if !default.conforms_to(p.ty) {
                    return Err(CatalogError::InvalidDefinition {
                        name: p.name.clone(),
                        reason: format!("default {} is not a {}", default, p.ty),
                    });
                }
                if let Some(n) = default.numeric(p.ty) {
                    if p.min.is_some_and(|min| n < min) || p.max.is_some_and(|max| n > max) {
                        return Err(CatalogError::InvalidDefinition {
                            name: p.name.clone(),
                            reason: format!("default {} is outside the declared range", n),
                        });
                    }
                }
            }

            if let Some(flag) = &p.enabled_by {
                self.expect_param(&p.name, flag, Some(ParamType::Flag))?;
            }
            for dep in &p.requires {
                self.expect_param(&p.name, dep, None)?;
            }
            for dep in &p.requires_peripherals {
                if self.peripheral(dep).is_none() {
                    return Err(CatalogError::DanglingReference {
                        from: p.name.clone(),
                        to: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_peripherals(&self) -> Result<HashMap<String, usize>, CatalogError> {
        let mut pin_owner: HashMap<String, usize> = HashMap::new();

        for (i, per) in self.peripherals.iter().enumerate() {
            if let Some(flag) = &per.enabled_by {
                self.expect_param(&per.id, flag, Some(ParamType::Flag))?;
            } else if per.pins.is_empty() {
                // nothing would ever make it active
                return Err(CatalogError::InvalidDefinition {
                    name: per.id.clone(),
                    reason: "a peripheral without pins needs an enabled_by flag".to_string(),
                });
            }

            for param in per.pins.values() {
                self.expect_param(&per.id, param, Some(ParamType::Pin))?;
                if let Some(&other) = pin_owner.get(param) {
                    return Err(CatalogError::SharedPinParameter {
                        param: param.clone(),
                        first: self.peripherals[other].id.clone(),
                        second: per.id.clone(),
                    });
                }
                pin_owner.insert(param.clone(), i);
            }

            for param in per.settings.values() {
                self.expect_param(&per.id, param, None)?;
                if self.param(param).is_some_and(|p| p.ty == ParamType::Pin) {
                    return Err(CatalogError::InvalidDefinition {
                        name: per.id.clone(),
                        reason: format!("pin parameter '{}' listed as a setting", param),
                    });
                }
            }

            match (&per.bus, per.kind) {
                (None, PeripheralKind::I2cDevice) => {
                    return Err(CatalogError::MissingBus { peripheral: per.id.clone() })
                }
                (Some(bus), _) => {
                    let is_bus = self.peripheral(bus).is_some_and(|b| b.kind.is_bus());
                    if !is_bus {
                        return Err(CatalogError::DanglingReference {
                            from: per.id.clone(),
                            to: bus.clone(),
                        });
                    }
                }
                (None, _) => {}
            }
        }

        Ok(pin_owner)
    }

    fn check_roles(&self) -> Result<(), CatalogError> {
        let roles = [
            ("roles.board_name", &self.roles.board_name, ParamType::String),
            ("roles.mcu_name", &self.roles.mcu_name, ParamType::String),
            ("roles.flash_fs", &self.roles.flash_fs, ParamType::Flag),
            ("roles.gpio_count", &self.roles.gpio_count, ParamType::Integer),
        ];
        for (role, param, ty) in roles {
            if let Some(param) = param {
                self.expect_param(role, param, Some(ty))?;
            }
        }
        Ok(())
    }
}
