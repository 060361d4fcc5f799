use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical pin identifier (GPIO number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub u16);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Semantic type of a catalog parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    /// Presence flag; absent means disabled
    Flag,
    Pin,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Flag => "flag",
            ParamType::Pin => "pin",
        };
        f.write_str(name)
    }
}

/// Raw value as written in a source.
///
/// Sources are untyped; the catalog decides how a value is interpreted and the
/// validator reports values that do not conform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Value {
    /// Short name of the value's own kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Flags accept booleans and the legacy `(0)` / `(1)` integer spelling
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            _ => None,
        }
    }

    pub fn as_pin(&self) -> Option<PinId> {
        match self {
            Value::Int(n) => u16::try_from(*n).ok().map(PinId),
            _ => None,
        }
    }

    pub fn conforms_to(&self, ty: ParamType) -> bool {
        match ty {
            ParamType::String => self.as_str().is_some(),
            ParamType::Integer => self.as_int().is_some(),
            ParamType::Flag => self.as_flag().is_some(),
            ParamType::Pin => self.as_pin().is_some(),
        }
    }

    /// Numeric view used for range checks (integers and pins only)
    pub fn numeric(&self, ty: ParamType) -> Option<i64> {
        match ty {
            ParamType::Integer => self.as_int(),
            ParamType::Pin => self.as_pin().map(|p| i64::from(p.0)),
            _ => None,
        }
    }

    /// Convert a TOML scalar. Floats, dates, arrays and tables are not source values.
    pub fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::String(s) => Some(Value::Str(s.clone())),
            toml::Value::Integer(n) => Some(Value::Int(*n)),
            toml::Value::Boolean(b) => Some(Value::Bool(*b)),
            _ => None,
        }
    }

    /// Parse a C-style literal: `"text"`, `19`, `0x51`, `(1)`, `true`, `false`.
    ///
    /// Returns `None` for anything else (expressions, identifiers, macros).
    pub fn parse_literal(text: &str) -> Option<Self> {
        let mut text = text.trim();
        while let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            text = inner.trim();
        }

        if let Some(body) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return unescape(body).map(Value::Str);
        }

        match text {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            _ => {}
        }

        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()?
        } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            digits.parse::<i64>().ok()?
        } else {
            return None;
        };
        Some(Value::Int(if negative { -magnitude } else { magnitude }))
    }
}

fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                _ => return None,
            },
            // an unescaped quote means two adjacent literals or garbage
            '"' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<PinId> for Value {
    fn from(pin: PinId) -> Self {
        Value::Int(i64::from(pin.0))
    }
}
