//! Render a resolved configuration for consumption outside this crate.

use crate::resolved::{ResolvedConfiguration, ValidatedConfig};
use crate::value::{ParamType, Value};

/// C header with one `#define` per bound parameter, in catalog order
pub fn c_header(config: &ValidatedConfig) -> String {
    let guard = format!(
        "HWCONF_{}_H",
        config
            .target()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect::<String>()
    );

    let mut lines = vec![
        format!("// Generated for {} (catalog v{})", config.target(), config.catalog().version()),
        format!("#ifndef {guard}"),
        format!("#define {guard}"),
        String::new(),
    ];
    for spec in config.catalog().params() {
        if let Some(binding) = config.binding(&spec.name) {
            lines.push(format!("// from {}", binding.origin));
            lines.push(format!("#define {} {}", spec.name, c_literal(spec.ty, &binding.value)));
        }
    }
    lines.push(String::new());
    lines.push(format!("#endif // {guard}"));
    lines.push(String::new());
    lines.join("\n")
}

fn c_literal(ty: ParamType, value: &Value) -> String {
    match (ty, value) {
        (ParamType::Flag, v) => format!("({})", u8::from(v.as_flag().unwrap_or(false))),
        (_, Value::Str(s)) => format!("\"{}\"", c_escape(s)),
        (_, Value::Int(n)) => format!("({n})"),
        (_, Value::Bool(b)) => format!("({})", u8::from(*b)),
    }
}

fn c_escape(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '"' => "\\\"".to_string(),
            '\\' => "\\\\".to_string(),
            '\n' => "\\n".to_string(),
            '\t' => "\\t".to_string(),
            c if c.is_ascii_control() => format!("\\x{:02x}", c as u32),
            c => c.to_string(),
        })
        .collect()
}

/// Pretty JSON snapshot: target, catalog version and every binding with its origin
pub fn json(config: &ResolvedConfiguration) -> serde_json::Result<String> {
    serde_json::to_string_pretty(config)
}
