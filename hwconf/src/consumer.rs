//! Generic initialization sequence driven by a validated configuration.
//!
//! The sequence is the same for every board: identity, root filesystem, buses,
//! bus-attached devices, then transports. It only reads the configuration
//! through the catalog's roles and peripheral declarations and never branches
//! on which board it is running for.

use crate::catalog::{InitPhase, PeripheralKind, PeripheralSpec};
use crate::errors::{HalError, HalResult, InitError};
use crate::resolved::{ResolvedConfiguration, ValidatedConfig};
use crate::value::{PinId, Value};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Resolved view of one peripheral handed to the hardware layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralConfig {
    pub id: String,
    pub kind: PeripheralKind,
    pub bus: Option<String>,
    /// role -> pin
    pub pins: BTreeMap<String, PinId>,
    /// key -> value, only settings that are bound
    pub settings: BTreeMap<String, Value>,
}

impl PeripheralConfig {
    fn from_spec(config: &ResolvedConfiguration, spec: &PeripheralSpec) -> Self {
        let pins = spec
            .pins
            .iter()
            .filter_map(|(role, param)| config.get_pin(param).map(|pin| (role.clone(), pin)))
            .collect();
        let settings = spec
            .settings
            .iter()
            .filter_map(|(key, param)| config.value(param).map(|v| (key.clone(), v.clone())))
            .collect();
        Self {
            id: spec.id.clone(),
            kind: spec.kind,
            bus: spec.bus.clone(),
            pins,
            settings,
        }
    }

    pub fn pin(&self, role: &str) -> Option<PinId> {
        self.pins.get(role).copied()
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.settings.get(key)
    }
}

/// Hardware layer the firmware core drives. Implemented by the board support
/// code outside this crate.
#[async_trait]
pub trait BoardHal: Send {
    async fn register_identity(&mut self, board: &str, mcu: &str) -> HalResult<()>;
    async fn mount_root_fs(&mut self) -> HalResult<()>;
    async fn open_bus(&mut self, bus: &PeripheralConfig) -> HalResult<()>;
    async fn attach_device(&mut self, device: &PeripheralConfig) -> HalResult<()>;
    async fn start_transport(&mut self, transport: &PeripheralConfig) -> HalResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStep {
    Identity { board: String, mcu: String },
    RootFs { mounted: bool },
    Bus(String),
    Device(String),
    Transport(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub steps: Vec<InitStep>,
}

/// Configured peripherals of one phase, in catalog order
pub fn peripherals_in_phase(config: &ResolvedConfiguration, phase: InitPhase) -> Vec<PeripheralConfig> {
    config
        .catalog()
        .peripherals()
        .filter(|spec| spec.kind.phase() == phase && config.peripheral_configured(spec))
        .map(|spec| PeripheralConfig::from_spec(config, spec))
        .collect()
}

/// Run the fixed initialization sequence
pub async fn initialize<H>(config: &ValidatedConfig, hal: &mut H) -> Result<InitReport, InitError>
where
    H: BoardHal + ?Sized,
{
    let mut report = InitReport::default();
    let roles = config.catalog().roles();

    let role_string = |role: &Option<String>| {
        role.as_deref()
            .and_then(|name| config.get_string(name))
            .unwrap_or_default()
            .to_string()
    };
    let board = role_string(&roles.board_name);
    let mcu = role_string(&roles.mcu_name);
    hal.register_identity(&board, &mcu)
        .await
        .map_err(|source| step_failed("identity", source))?;
    info!("[init] {} with {}", board, mcu);
    report.steps.push(InitStep::Identity { board, mcu });

    if roles.flash_fs.as_deref().is_some_and(|flag| config.get_bool(flag)) {
        // a broken filesystem is repaired later; boot continues without it
        let mounted = match hal.mount_root_fs().await {
            Ok(()) => true,
            Err(e) => {
                warn!("[init] {}", e);
                false
            }
        };
        report.steps.push(InitStep::RootFs { mounted });
    }

    for bus in peripherals_in_phase(config, InitPhase::Bus) {
        hal.open_bus(&bus)
            .await
            .map_err(|source| step_failed(&bus.id, source))?;
        info!("[init] bus {} ({}) open", bus.id, bus.kind);
        report.steps.push(InitStep::Bus(bus.id));
    }

    for device in peripherals_in_phase(config, InitPhase::Device) {
        hal.attach_device(&device)
            .await
            .map_err(|source| step_failed(&device.id, source))?;
        info!("[init] device {} attached", device.id);
        report.steps.push(InitStep::Device(device.id));
    }

    for transport in peripherals_in_phase(config, InitPhase::Transport) {
        hal.start_transport(&transport)
            .await
            .map_err(|source| step_failed(&transport.id, source))?;
        info!("[init] transport {} started", transport.id);
        report.steps.push(InitStep::Transport(transport.id));
    }

    Ok(report)
}

fn step_failed(step: &str, source: HalError) -> InitError {
    InitError::StepFailed {
        step: step.to_string(),
        source,
    }
}

/// Dry-run hardware layer that only logs what a board would do
#[derive(Debug, Default)]
pub struct TracingHal;

#[async_trait]
impl BoardHal for TracingHal {
    async fn register_identity(&mut self, board: &str, mcu: &str) -> HalResult<()> {
        info!("[hal] identity: {} with {}", board, mcu);
        Ok(())
    }

    async fn mount_root_fs(&mut self) -> HalResult<()> {
        info!("[hal] mount flash filesystem at /");
        Ok(())
    }

    async fn open_bus(&mut self, bus: &PeripheralConfig) -> HalResult<()> {
        info!("[hal] open {} {} pins={:?} settings={:?}", bus.kind, bus.id, bus.pins, bus.settings);
        Ok(())
    }

    async fn attach_device(&mut self, device: &PeripheralConfig) -> HalResult<()> {
        info!(
            "[hal] attach {} on {} settings={:?}",
            device.id,
            device.bus.as_deref().unwrap_or("-"),
            device.settings
        );
        Ok(())
    }

    async fn start_transport(&mut self, transport: &PeripheralConfig) -> HalResult<()> {
        info!("[hal] start {} {} settings={:?}", transport.kind, transport.id, transport.settings);
        Ok(())
    }
}
