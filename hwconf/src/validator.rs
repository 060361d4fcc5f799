//! Checks over a resolved configuration.
//!
//! Every check runs on every call so a board author sees all problems at once:
//!
//! 1. completeness: mandatory parameters are bound
//! 2. type conformance: values fit their declared type and range
//! 3. pin conflicts: no physical pin is claimed twice
//! 4. dependencies: enabled features have what they need

use crate::errors::{Violation, Violations};
use crate::resolved::{ResolvedConfiguration, ValidatedConfig};
use crate::resolver::{OverrideNote, Resolution, Resolver};
use crate::source::SourceStack;
use crate::value::{ParamType, PinId};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Whoever claims a pin: a pin parameter, optionally through its peripheral
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Claimant {
    pub param: String,
    pub peripheral: Option<String>,
}

impl fmt::Display for Claimant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.peripheral {
            Some(peripheral) => write!(f, "{} ({})", peripheral, self.param),
            None => f.write_str(&self.param),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinClaim {
    pub pin: PinId,
    pub claimant: Claimant,
}

/// A board target that resolved and validated
#[derive(Debug, Clone)]
pub struct CheckedTarget {
    pub config: ValidatedConfig,
    pub notes: Vec<OverrideNote>,
}

pub struct Validator;

impl Validator {
    /// Run every check and return all violations, in check order
    pub fn check(config: &ResolvedConfiguration) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_completeness(config, &mut violations);
        check_types(config, &mut violations);
        check_pin_conflicts(config, &mut violations);
        check_dependencies(config, &mut violations);

        debug!(
            "[validator] {}: {} violation(s)",
            config.target(),
            violations.len()
        );
        violations
    }

    pub fn validate(config: ResolvedConfiguration) -> Result<ValidatedConfig, Violations> {
        match Violations::from_vec(Self::check(&config)) {
            Some(violations) => Err(violations),
            None => {
                info!("[validator] {}: configuration valid", config.target());
                Ok(ValidatedConfig::new(config))
            }
        }
    }

    /// Pins claimed by enabled parameters, in catalog order.
    ///
    /// A pin parameter claims its pin when it is bound to a valid pin, its own
    /// `enabled_by` flag (if any) is set and its peripheral (if any) is active.
    pub fn pin_claims(config: &ResolvedConfiguration) -> Vec<PinClaim> {
        let catalog = config.catalog();
        catalog
            .params()
            .filter(|p| p.ty == ParamType::Pin)
            .filter_map(|p| {
                let pin = config.get_pin(&p.name)?;
                if !config.is_enabled(p) {
                    return None;
                }
                let owner = catalog.owner_of(&p.name);
                if owner.is_some_and(|per| !config.peripheral_active(per)) {
                    return None;
                }
                Some(PinClaim {
                    pin,
                    claimant: Claimant {
                        param: p.name.clone(),
                        peripheral: owner.map(|per| per.id.clone()),
                    },
                })
            })
            .collect()
    }
}

/// Resolve and validate in one pass: unknown names from the resolver come
/// first, then every validator finding.
pub fn check_target(resolver: &Resolver, stack: &SourceStack) -> Result<CheckedTarget, Violations> {
    let Resolution {
        config,
        mut violations,
        notes,
    } = resolver.resolve_partial(stack);
    violations.extend(Validator::check(&config));

    match Violations::from_vec(violations) {
        Some(violations) => Err(violations),
        None => {
            info!("[validator] {}: configuration valid", config.target());
            Ok(CheckedTarget {
                config: ValidatedConfig::new(config),
                notes,
            })
        }
    }
}

fn check_completeness(config: &ResolvedConfiguration, out: &mut Vec<Violation>) {
    for p in config.catalog().params() {
        if p.mandatory && !config.is_present(&p.name) {
            out.push(Violation::MissingMandatoryParameter { name: p.name.clone() });
        }
    }
}

fn check_types(config: &ResolvedConfiguration, out: &mut Vec<Violation>) {
    let catalog = config.catalog();
    let gpio_count = catalog
        .roles()
        .gpio_count
        .as_deref()
        .and_then(|name| config.get_integer(name))
        .filter(|&n| n > 0);

    for p in catalog.params() {
        let Some(binding) = config.binding(&p.name) else {
            continue;
        };

        if !binding.value.conforms_to(p.ty) {
            out.push(Violation::TypeMismatch {
                name: p.name.clone(),
                expected: p.ty,
                found: binding.value.clone(),
                origin: binding.origin.clone(),
            });
            continue;
        }

        let Some(n) = binding.value.numeric(p.ty) else {
            continue;
        };
        let (min, max) = (p.min.unwrap_or(i64::MIN), p.max.unwrap_or(i64::MAX));
        if n < min || n > max {
            out.push(Violation::OutOfRange {
                name: p.name.clone(),
                value: n,
                min,
                max,
                origin: binding.origin.clone(),
            });
        } else if p.ty == ParamType::Pin {
            if let Some(count) = gpio_count.filter(|&count| n >= count) {
                out.push(Violation::OutOfRange {
                    name: p.name.clone(),
                    value: n,
                    min: 0,
                    max: count - 1,
                    origin: binding.origin.clone(),
                });
            }
        }
    }
}

fn check_pin_conflicts(config: &ResolvedConfiguration, out: &mut Vec<Violation>) {
    let mut first_claims: BTreeMap<PinId, Claimant> = BTreeMap::new();
    for claim in Validator::pin_claims(config) {
        match first_claims.get(&claim.pin) {
            Some(first) => out.push(Violation::PinConflict {
                pin: claim.pin,
                first: first.clone(),
                second: claim.claimant,
            }),
            None => {
                first_claims.insert(claim.pin, claim.claimant);
            }
        }
    }
}

fn check_dependencies(config: &ResolvedConfiguration, out: &mut Vec<Violation>) {
    let catalog = config.catalog();

    for p in catalog.params().filter(|p| p.has_dependencies()) {
        if !config.is_enabled(p) {
            continue;
        }
        for dep in &p.requires {
            let satisfied = catalog.param(dep).is_some_and(|d| match d.ty {
                ParamType::Flag => config.get_bool(dep),
                _ => config.is_present(dep),
            });
            if !satisfied {
                out.push(Violation::UnsatisfiedDependency {
                    feature: p.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        for dep in &p.requires_peripherals {
            let configured = catalog
                .peripheral(dep)
                .is_some_and(|per| config.peripheral_configured(per));
            if !configured {
                out.push(Violation::UnsatisfiedDependency {
                    feature: p.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    for per in catalog.peripherals().filter(|per| config.peripheral_active(per)) {
        let feature = per.enabled_by.clone().unwrap_or_else(|| per.id.clone());

        for param in per.pins.values() {
            if !config.is_present(param) {
                out.push(Violation::UnsatisfiedDependency {
                    feature: feature.clone(),
                    dependency: param.clone(),
                });
            }
        }
        if let Some(bus) = &per.bus {
            let bus_ready = catalog
                .peripheral(bus)
                .is_some_and(|b| config.peripheral_configured(b));
            if !bus_ready {
                out.push(Violation::UnsatisfiedDependency {
                    feature,
                    dependency: bus.clone(),
                });
            }
        }
    }
}
