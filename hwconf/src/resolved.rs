//! The frozen output of resolution and its read-only accessors.

use crate::catalog::{Catalog, ParamSpec, PeripheralSpec};
use crate::errors::InstallError;
use crate::source::Origin;
use crate::value::{ParamType, PinId, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// A resolved value and the source that supplied it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub value: Value,
    pub origin: Origin,
}

/// One value (or explicit absence) for every catalog parameter.
///
/// Produced only by the resolver and never mutated afterwards. Accessors return
/// `None` for absent parameters and for values that do not fit the requested
/// type; after validation the latter cannot happen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfiguration {
    target: String,
    catalog_version: u32,
    #[serde(skip)]
    catalog: Arc<Catalog>,
    params: BTreeMap<String, Option<Binding>>,
}

impl ResolvedConfiguration {
    pub(crate) fn new(
        target: &str,
        catalog: Arc<Catalog>,
        params: BTreeMap<String, Option<Binding>>,
    ) -> Self {
        Self {
            target: target.to_string(),
            catalog_version: catalog.version(),
            catalog,
            params,
        }
    }

    /// Board target this configuration was resolved for
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.params.get(name).and_then(Option::as_ref)
    }

    /// Every catalog parameter with its binding, in name order
    pub fn bindings(&self) -> impl Iterator<Item = (&str, Option<&Binding>)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.binding(name).map(|b| &b.value)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.binding(name).is_some()
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn get_integer(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_int)
    }

    /// Flag state; absent means disabled
    pub fn get_bool(&self, name: &str) -> bool {
        self.value(name).and_then(Value::as_flag).unwrap_or(false)
    }

    pub fn get_pin(&self, name: &str) -> Option<PinId> {
        self.value(name).and_then(Value::as_pin)
    }

    /// Whether a parameter counts as switched on: flags must be set, anything
    /// else must be bound
    pub fn is_enabled(&self, param: &ParamSpec) -> bool {
        let own = match param.ty {
            ParamType::Flag => self.get_bool(&param.name),
            _ => self.is_present(&param.name),
        };
        own && param.enabled_by.as_deref().map_or(true, |flag| self.get_bool(flag))
    }

    /// Active peripherals are either switched on by their flag or, without a
    /// flag, have at least one pin bound
    pub fn peripheral_active(&self, peripheral: &PeripheralSpec) -> bool {
        match &peripheral.enabled_by {
            Some(flag) => self.get_bool(flag),
            None => peripheral.pins.values().any(|p| self.is_present(p)),
        }
    }

    /// Active with every pin bound to a valid pin number
    pub fn peripheral_configured(&self, peripheral: &PeripheralSpec) -> bool {
        self.peripheral_active(peripheral) && peripheral.pins.values().all(|p| self.get_pin(p).is_some())
    }
}

/// A resolved configuration that passed validation.
///
/// Only the validator constructs these. Cloning shares the same snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    inner: Arc<ResolvedConfiguration>,
}

impl ValidatedConfig {
    pub(crate) fn new(config: ResolvedConfiguration) -> Self {
        Self { inner: Arc::new(config) }
    }

    pub fn resolved(&self) -> &ResolvedConfiguration {
        &self.inner
    }
}

impl Deref for ValidatedConfig {
    type Target = ResolvedConfiguration;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

static INSTALLED: OnceLock<ValidatedConfig> = OnceLock::new();

/// Install the process-wide snapshot. Succeeds exactly once.
pub fn install(config: ValidatedConfig) -> Result<&'static ValidatedConfig, InstallError> {
    let rejected = config.target().to_string();
    let mut fresh = false;
    let stored = INSTALLED.get_or_init(|| {
        fresh = true;
        config
    });
    if fresh {
        Ok(stored)
    } else {
        Err(InstallError::AlreadyInstalled {
            installed: stored.target().to_string(),
            rejected,
        })
    }
}

/// The installed snapshot, if any
pub fn installed() -> Option<&'static ValidatedConfig> {
    INSTALLED.get()
}
