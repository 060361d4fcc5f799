pub mod header;

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Precedence tier label.
///
/// Precedence itself is the position in a [`SourceStack`]; the tier only
/// labels diagnostics and tells the registry where a source belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Default,
    Port,
    Board,
    /// Build-time overrides given on the command line
    User,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Default => "default",
            Tier::Port => "port",
            Tier::Board => "board",
            Tier::User => "user",
        };
        f.write_str(name)
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Origin {
    Source { tier: Tier, name: String },
    CatalogDefault,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Source { tier, name } => write!(f, "{} source '{}'", tier, name),
            Origin::CatalogDefault => f.write_str("catalog default"),
        }
    }
}

/// A named set of parameter bindings at one tier. Pure data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    tier: Tier,
    name: String,
    port: Option<String>,
    requires_catalog: Option<u32>,
    params: BTreeMap<String, Value>,
}

impl Source {
    pub fn new(tier: Tier, name: &str) -> Self {
        Self {
            tier,
            name: name.to_string(),
            port: None,
            requires_catalog: None,
            params: BTreeMap::new(),
        }
    }

    /// Port this board is built on
    pub fn with_port(mut self, port: &str) -> Self {
        self.port = Some(port.to_string());
        self
    }

    /// Minimum catalog version this source was written against
    pub fn with_required_catalog(mut self, version: u32) -> Self {
        self.requires_catalog = Some(version);
        self
    }

    pub fn define(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Bind `name`, returning the value it replaces within this source
    pub fn insert(&mut self, name: &str, value: Value) -> Option<Value> {
        self.params.insert(name.to_string(), value)
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn requires_catalog(&self) -> Option<u32> {
        self.requires_catalog
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn origin(&self) -> Origin {
        Origin::Source {
            tier: self.tier,
            name: self.name.clone(),
        }
    }
}

/// Sources in ascending precedence: the last source wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceStack {
    sources: Vec<Source>,
}

impl SourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a source above every source already in the stack
    pub fn push(&mut self, source: Source) -> &mut Self {
        self.sources.push(source);
        self
    }

    pub fn with(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Lowest precedence first
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn iter_highest_first(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Name of the target this stack describes: the most specific board source,
    /// falling back to the highest source of any tier
    pub fn target_name(&self) -> &str {
        self.iter_highest_first()
            .find(|s| s.tier == Tier::Board)
            .or_else(|| self.sources.last())
            .map_or("", |s| s.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_replaces_within_source() {
        let mut source = Source::new(Tier::Board, "B").define("HOSTNAME", "a");
        assert_eq!(source.insert("HOSTNAME", Value::from("b")), Some(Value::from("a")));
        assert_eq!(source.get("HOSTNAME"), Some(&Value::from("b")));
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_target_name_prefers_board_over_user_tier() {
        let stack = SourceStack::new()
            .with(Source::new(Tier::Default, "global"))
            .with(Source::new(Tier::Port, "esp32"))
            .with(Source::new(Tier::Board, "SEEED_EDGEBOX_ESP100"))
            .with(Source::new(Tier::User, "command-line"));
        assert_eq!(stack.target_name(), "SEEED_EDGEBOX_ESP100");

        let tiers: Vec<Tier> = stack.iter_highest_first().map(Source::tier).collect();
        assert_eq!(tiers, vec![Tier::User, Tier::Board, Tier::Port, Tier::Default]);
    }

    #[test]
    fn test_origin_display() {
        let source = Source::new(Tier::Port, "esp32");
        assert_eq!(source.origin().to_string(), "port source 'esp32'");
        assert_eq!(Origin::CatalogDefault.to_string(), "catalog default");
    }
}
