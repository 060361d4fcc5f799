//! Precedence merge of a source stack against the catalog.

use crate::catalog::Catalog;
use crate::errors::{Violation, Violations};
use crate::resolved::{Binding, ResolvedConfiguration};
use crate::source::{Origin, SourceStack};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How shadowed bindings are reported. They never fail a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverridePolicy {
    /// Log overrides at debug level
    #[default]
    Silent,
    /// Log overrides that change a value at warn level
    Warn,
}

/// A binding in a lower tier hidden by a higher one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideNote {
    pub param: String,
    pub winner: Origin,
    pub shadowed: Origin,
    /// Both tiers gave the same value
    pub redundant: bool,
}

/// Outcome of a merge that does not stop at the first problem
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: ResolvedConfiguration,
    /// Unknown parameter names found in the sources
    pub violations: Vec<Violation>,
    pub notes: Vec<OverrideNote>,
}

#[derive(Debug, Clone)]
pub struct Resolver {
    catalog: Arc<Catalog>,
    policy: OverridePolicy,
}

impl Resolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            policy: OverridePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OverridePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Merge without failing. Mandatory parameters nobody defines are left
    /// absent for the validator to report.
    pub fn resolve_partial(&self, stack: &SourceStack) -> Resolution {
        let target = stack.target_name();
        let mut params = BTreeMap::new();
        let mut notes = Vec::new();

        for param in self.catalog.params() {
            let mut defining = stack
                .iter_highest_first()
                .filter_map(|source| source.get(&param.name).map(|value| (source, value)));

            let binding = match defining.next() {
                Some((winner, value)) => {
                    for (shadowed, other) in defining {
                        notes.push(OverrideNote {
                            param: param.name.clone(),
                            winner: winner.origin(),
                            shadowed: shadowed.origin(),
                            redundant: other == value,
                        });
                    }
                    Some(Binding {
                        value: value.clone(),
                        origin: winner.origin(),
                    })
                }
                None => param.default.clone().map(|value| Binding {
                    value,
                    origin: Origin::CatalogDefault,
                }),
            };

            match &binding {
                Some(b) => debug!("[resolver] {}: {} = {} ({})", target, param.name, b.value, b.origin),
                None => debug!("[resolver] {}: {} unset", target, param.name),
            }
            params.insert(param.name.clone(), binding);
        }

        let violations: Vec<Violation> = stack
            .iter()
            .flat_map(|source| {
                source
                    .names()
                    .filter(move |name| !self.catalog.contains(name))
                    .map(move |name| Violation::UnknownParameterName {
                        name: name.to_string(),
                        origin: source.origin(),
                    })
            })
            .collect();

        self.report_overrides(target, &notes);
        info!(
            "[resolver] {}: resolved {} parameter(s) from {} source(s)",
            target,
            params.values().filter(|b| b.is_some()).count(),
            stack.len()
        );

        Resolution {
            config: ResolvedConfiguration::new(target, self.catalog.clone(), params),
            violations,
            notes,
        }
    }

    /// Merge, failing if a mandatory parameter has no value anywhere or a
    /// source names a parameter outside the catalog. All such problems are
    /// reported together.
    pub fn resolve(&self, stack: &SourceStack) -> Result<ResolvedConfiguration, Violations> {
        let Resolution { config, violations: unknown, .. } = self.resolve_partial(stack);

        let mut violations: Vec<Violation> = self
            .catalog
            .params()
            .filter(|p| p.mandatory && !config.is_present(&p.name))
            .map(|p| Violation::MissingMandatoryParameter { name: p.name.clone() })
            .collect();
        violations.extend(unknown);

        match Violations::from_vec(violations) {
            Some(violations) => Err(violations),
            None => Ok(config),
        }
    }

    fn report_overrides(&self, target: &str, notes: &[OverrideNote]) {
        for note in notes {
            if note.redundant {
                debug!(
                    "[resolver] {}: {} repeats {} from {}",
                    target, note.winner, note.param, note.shadowed
                );
            } else if self.policy == OverridePolicy::Warn {
                warn!(
                    "[resolver] {}: {} overrides {} from {}",
                    target, note.winner, note.param, note.shadowed
                );
            } else {
                debug!(
                    "[resolver] {}: {} overrides {} from {}",
                    target, note.winner, note.param, note.shadowed
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ParamSpec;
    use crate::errors::ViolationKind;
    use crate::source::{Source, Tier};
    use crate::value::{ParamType, Value};

    fn catalog() -> Arc<Catalog> {
        Arc::new(
            Catalog::from_params(vec![
                ParamSpec::new("MCU_NAME", ParamType::String).mandatory(),
                ParamSpec::new("HOSTNAME", ParamType::String).with_default("mpy-device"),
                ParamSpec::new("LED", ParamType::Pin),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_board_overrides_port_overrides_default() {
        let stack = SourceStack::new()
            .with(Source::new(Tier::Default, "global").define("MCU_NAME", "GENERIC"))
            .with(Source::new(Tier::Port, "esp32").define("MCU_NAME", "ESP32"))
            .with(Source::new(Tier::Board, "B").define("MCU_NAME", "ESP32S3"));

        let config = Resolver::new(catalog()).resolve(&stack).unwrap();
        assert_eq!(config.get_string("MCU_NAME"), Some("ESP32S3"));
        assert_eq!(
            config.binding("MCU_NAME").map(|b| b.origin.clone()),
            Some(Origin::Source { tier: Tier::Board, name: "B".into() })
        );
    }

    #[test]
    fn test_catalog_default_used_last() {
        let stack = SourceStack::new().with(Source::new(Tier::Board, "B").define("MCU_NAME", "RP2040"));
        let config = Resolver::new(catalog()).resolve(&stack).unwrap();
        assert_eq!(config.get_string("HOSTNAME"), Some("mpy-device"));
        assert_eq!(config.binding("HOSTNAME").map(|b| &b.origin), Some(&Origin::CatalogDefault));
        assert!(!config.is_present("LED"));
    }

    #[test]
    fn test_override_notes_mark_redundancy() {
        let stack = SourceStack::new()
            .with(Source::new(Tier::Default, "global").define("MCU_NAME", "X").define("LED", 2))
            .with(Source::new(Tier::Board, "B").define("MCU_NAME", "X").define("LED", 25));

        let resolution = Resolver::new(catalog()).with_policy(OverridePolicy::Warn).resolve_partial(&stack);
        assert_eq!(resolution.notes.len(), 2);

        let led = resolution.notes.iter().find(|n| n.param == "LED").unwrap();
        assert!(!led.redundant);
        let mcu = resolution.notes.iter().find(|n| n.param == "MCU_NAME").unwrap();
        assert!(mcu.redundant);
    }

    #[test]
    fn test_missing_and_unknown_reported_together() {
        let stack = SourceStack::new()
            .with(Source::new(Tier::Port, "esp32").define("MICROPY_HW_TYPO", 1))
            .with(Source::new(Tier::Board, "B").define("LED", 2));

        let violations = Resolver::new(catalog()).resolve(&stack).unwrap_err();
        assert_eq!(
            violations.kinds(),
            vec![ViolationKind::MissingMandatoryParameter, ViolationKind::UnknownParameterName]
        );
    }

    #[test]
    fn test_partial_resolution_keeps_going() {
        let stack = SourceStack::new().with(Source::new(Tier::Board, "B").define("LED", 2));
        let resolution = Resolver::new(catalog()).resolve_partial(&stack);
        assert!(resolution.violations.is_empty());
        assert!(!resolution.config.is_present("MCU_NAME"));
        assert_eq!(resolution.config.value("LED"), Some(&Value::Int(2)));
    }
}
