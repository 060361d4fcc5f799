//! Import of legacy board headers.
//!
//! Board descriptions have historically been written as guarded defines:
//!
//! ```c
//! #ifndef MICROPY_HW_BOARD_NAME
//! #define MICROPY_HW_BOARD_NAME "Seeed EdgeBox ESP-100"
//! #endif
//! #define MICROPY_HW_I2C0_SCL (19)
//! ```
//!
//! The guards only encode "unless a more specific scope already set it", which
//! the source stack already expresses, so they are dropped and the guarded
//! `#define` becomes a binding. A guard must wrap exactly the `#define` of the
//! name it tests. Any other conditional is rejected since its outcome depends
//! on build state the importer does not have.

use crate::errors::{ConfigError, ConfigResult};
use crate::source::{Source, Tier};
use crate::value::Value;
use tracing::debug;

/// Parse header text into a source. `path` is only used in error messages.
pub fn parse(tier: Tier, name: &str, path: &str, text: &str) -> ConfigResult<Source> {
    let mut state = HeaderState {
        source: Source::new(tier, name),
        guard: None,
    };
    let mut in_block_comment = false;
    let mut pending = String::new();
    let mut pending_line = 0;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let (code, still_in_block) = strip_comments(raw, in_block_comment);
        in_block_comment = still_in_block;

        if pending.is_empty() {
            pending_line = line_no;
        }
        if let Some(head) = code.trim_end().strip_suffix('\\') {
            pending.push_str(head);
            pending.push(' ');
            continue;
        }
        pending.push_str(&code);
        let logical = std::mem::take(&mut pending);

        state.apply_line(logical.trim(), path, pending_line)?;
    }

    if in_block_comment {
        return Err(header_error(path, text.lines().count(), "unterminated block comment"));
    }
    if !pending.trim().is_empty() {
        return Err(header_error(path, pending_line, "line continuation at end of file"));
    }
    if let Some(guard) = state.guard {
        return Err(header_error(
            path,
            guard.line,
            &format!("#ifndef {} has no matching #endif", guard.name),
        ));
    }

    Ok(state.source)
}

/// An open `#ifndef NAME` guard
struct Guard {
    name: String,
    line: usize,
    defined: bool,
}

struct HeaderState {
    source: Source,
    guard: Option<Guard>,
}

impl HeaderState {
    fn apply_line(&mut self, line: &str, path: &str, line_no: usize) -> ConfigResult<()> {
        if line.is_empty() {
            return Ok(());
        }
        let Some(directive) = line.strip_prefix('#') else {
            return Err(header_error(path, line_no, "expected a preprocessor directive"));
        };
        let directive = directive.trim_start();
        let (keyword, rest) = directive
            .split_once(|c: char| c.is_whitespace())
            .map_or((directive, ""), |(k, r)| (k, r.trim()));

        match keyword {
            "define" => self.define(rest, path, line_no),
            "ifndef" => {
                if let Some(open) = &self.guard {
                    return Err(header_error(
                        path,
                        line_no,
                        &format!("#ifndef nested inside the guard for {}", open.name),
                    ));
                }
                if rest.is_empty() || rest.contains(|c: char| c.is_whitespace()) {
                    return Err(header_error(path, line_no, "#ifndef takes a single macro name"));
                }
                self.guard = Some(Guard {
                    name: rest.to_string(),
                    line: line_no,
                    defined: false,
                });
                Ok(())
            }
            "endif" => match self.guard.take() {
                Some(guard) if guard.defined => {
                    debug!("[header] {}:{}: dropped guard for {}", path, guard.line, guard.name);
                    Ok(())
                }
                Some(guard) => Err(header_error(
                    path,
                    line_no,
                    &format!("guard for {} closed without defining it", guard.name),
                )),
                None => Err(header_error(path, line_no, "#endif without #ifndef")),
            },
            "pragma" if rest == "once" => Ok(()),
            "if" | "ifdef" | "elif" | "else" => Err(header_error(
                path,
                line_no,
                &format!("conditional #{} is not supported; only #ifndef guards are", keyword),
            )),
            other => Err(header_error(
                path,
                line_no,
                &format!("unsupported directive #{}", other),
            )),
        }
    }

    fn define(&mut self, rest: &str, path: &str, line_no: usize) -> ConfigResult<()> {
        let (name, value_text) = rest
            .split_once(|c: char| c.is_whitespace())
            .map_or((rest, ""), |(n, v)| (n, v.trim()));
        if name.is_empty() || name.contains('(') {
            return Err(header_error(path, line_no, "function-like or empty macro"));
        }

        if let Some(guard) = &mut self.guard {
            if guard.defined {
                return Err(header_error(
                    path,
                    line_no,
                    &format!("expected #endif for the guard on {}", guard.name),
                ));
            }
            if guard.name != name {
                return Err(header_error(
                    path,
                    line_no,
                    &format!("guard on {} wraps a define of {}", guard.name, name),
                ));
            }
            guard.defined = true;
        }

        let value = if value_text.is_empty() {
            // bare `#define X` marks presence
            Value::Bool(true)
        } else {
            Value::parse_literal(value_text).ok_or_else(|| {
                header_error(path, line_no, &format!("unsupported value `{}` for {}", value_text, name))
            })?
        };

        if let Some(previous) = self.source.get(name) {
            if previous != &value {
                return Err(header_error(
                    path,
                    line_no,
                    &format!("{} redefined from {} to {}", name, previous, value),
                ));
            }
        }
        self.source.insert(name, value);
        Ok(())
    }
}

/// Remove `//` and `/* */` comments outside string literals
fn strip_comments(line: &str, mut in_block: bool) -> (String, bool) {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
            }
            continue;
        }
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('/', Some('/')) => break,
            ('/', Some('*')) => {
                chars.next();
                in_block = true;
                out.push(' ');
            }
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    (out, in_block)
}

fn header_error(path: &str, line: usize, reason: &str) -> ConfigError {
    ConfigError::HeaderError {
        path: path.to_string(),
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PinId;

    const EDGEBOX_HEADER: &str = r#"
#ifndef MICROPY_HW_BOARD_NAME
// Can be set by the build system.
#define MICROPY_HW_BOARD_NAME               "Seeed EdgeBox ESP-100"
#endif
#define MICROPY_HW_MCU_NAME                 "ESP32S3"

// Enable UART REPL for modules that have an external USB-UART and don't use native USB.
#define MICROPY_HW_ENABLE_UART_REPL         (1)

#define MICROPY_HW_I2C0_SCL                 (19)
#define MICROPY_HW_I2C0_SDA                 (20)
#define MICROPY_PY_NETWORK_HOSTNAME_DEFAULT "Seeed-EdgeBox"
"#;

    #[test]
    fn test_parse_guarded_board_header() {
        let source = parse(Tier::Board, "SEEED_EDGEBOX_ESP100", "mpconfigboard.h", EDGEBOX_HEADER).unwrap();

        assert_eq!(source.len(), 6);
        assert_eq!(
            source.get("MICROPY_HW_BOARD_NAME").and_then(Value::as_str),
            Some("Seeed EdgeBox ESP-100")
        );
        assert_eq!(source.get("MICROPY_HW_ENABLE_UART_REPL").and_then(Value::as_flag), Some(true));
        assert_eq!(source.get("MICROPY_HW_I2C0_SCL").and_then(Value::as_pin), Some(PinId(19)));
        assert_eq!(source.get("MICROPY_HW_I2C0_SDA").and_then(Value::as_pin), Some(PinId(20)));
    }

    #[test]
    fn test_block_comments_and_continuations() {
        let text = "/* board\n   notes */\n#define A \\\n    (0x10) /* trailing */\n#define B // empty\n";
        let source = parse(Tier::Board, "T", "t.h", text).unwrap();
        assert_eq!(source.get("A"), Some(&Value::Int(16)));
        assert_eq!(source.get("B"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_comment_markers_inside_strings_are_kept() {
        let source = parse(Tier::Board, "T", "t.h", "#define URL \"http://x/*y*/\"\n").unwrap();
        assert_eq!(source.get("URL").and_then(Value::as_str), Some("http://x/*y*/"));
    }

    #[test]
    fn test_expression_values_report_line() {
        let err = parse(Tier::Board, "T", "t.h", "\n#define SCL (GPIO_NUM_18)\n").unwrap_err();
        match err {
            ConfigError::HeaderError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_conflicting_redefinition_rejected() {
        let err = parse(Tier::Board, "T", "t.h", "#define A (1)\n#define A (2)\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 2, .. }));
    }

    #[test]
    fn test_function_like_macro_rejected() {
        let err = parse(Tier::Board, "T", "t.h", "#define PIN(x) (x)\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 1, .. }));
    }

    #[test]
    fn test_dead_if_block_rejected() {
        let err = parse(Tier::Board, "T", "t.h", "#if 0\n#define MICROPY_HW_LED_PIN (5)\n#endif\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 1, .. }));
    }

    #[test]
    fn test_ifdef_else_rejected_at_directive() {
        let text = "#ifdef X\n#define A (1)\n#else\n#define A (0)\n#endif\n";
        let err = parse(Tier::Board, "T", "t.h", text).unwrap_err();
        match err {
            ConfigError::HeaderError { line, reason, .. } => {
                assert_eq!(line, 1);
                assert!(reason.contains("#ifdef"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_guard_must_wrap_its_own_define() {
        let err = parse(Tier::Board, "T", "t.h", "#ifndef A\n#define B (1)\n#endif\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 2, .. }));

        let err = parse(Tier::Board, "T", "t.h", "#ifndef A\n#define A (1)\n#define C (2)\n#endif\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 3, .. }));
    }

    #[test]
    fn test_unbalanced_guards_rejected() {
        let err = parse(Tier::Board, "T", "t.h", "\n#ifndef A\n#define A (1)\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 2, .. }));

        let err = parse(Tier::Board, "T", "t.h", "#define A (1)\n#endif\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 2, .. }));

        let err = parse(Tier::Board, "T", "t.h", "#ifndef A\n#endif\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 2, .. }));
    }

    #[test]
    fn test_include_is_unsupported() {
        let err = parse(Tier::Board, "T", "t.h", "#include \"other.h\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::HeaderError { line: 1, .. }));
    }
}
