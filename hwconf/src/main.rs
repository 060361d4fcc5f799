use clap::{Parser, Subcommand, ValueEnum};
use hwconf::errors::TargetError;
use hwconf::{check_all, config_path, emit, init_tracing, open_registry, SourceRegistry, TargetReport, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// hwconf: resolve and validate layered board configuration
#[derive(Parser, Debug)]
struct Args {
    /// Config directory holding catalog.toml, defaults.toml and ports/.
    /// Falls back to CONFIG_PATH, then to the built-in configuration.
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,
    /// Directory with one subdirectory per board
    #[clap(long, short = 'b', default_value = "boards")]
    boards: PathBuf,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists known boards
    Boards,
    /// Validates the given boards
    Check {
        #[clap(required = true)]
        boards: Vec<String>,
        /// Override a parameter, e.g. --set MICROPY_HW_LED_PIN=2
        #[clap(long = "set", value_parser = parse_override)]
        overrides: Vec<(String, Value)>,
    },
    /// Validates every known board
    CheckAll {
        #[clap(long = "set", value_parser = parse_override)]
        overrides: Vec<(String, Value)>,
    },
    /// Prints the resolved configuration of a board
    Show {
        board: String,
        #[clap(long, short = 'f', value_enum, default_value = "table")]
        format: Format,
        #[clap(long = "set", value_parser = parse_override)]
        overrides: Vec<(String, Value)>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    Table,
    Json,
    Header,
}

/// `NAME=VALUE`; values that are not literals are taken as strings
fn parse_override(arg: &str) -> Result<(String, Value), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{arg}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{arg}'"));
    }
    let value = Value::parse_literal(raw).unwrap_or_else(|| Value::Str(raw.to_string()));
    Ok((name.to_string(), value))
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let config_dir = args.config.clone().or_else(config_path);
    let registry = match open_registry(config_dir.as_deref(), &args.boards) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("[hwconf] {}", e);
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Command::Boards => {
            for board in registry.board_names() {
                let port = registry.board(board).and_then(|b| b.port()).unwrap_or("-");
                println!("{board:<32} {port}");
            }
            ExitCode::SUCCESS
        }
        Command::Check { boards, overrides } => report(check_all(registry, boards, overrides).await),
        Command::CheckAll { overrides } => {
            let boards = registry.board_names().map(str::to_string).collect();
            report(check_all(registry, boards, overrides).await)
        }
        Command::Show { board, format, overrides } => show(&registry, &board, format, &overrides),
    }
}

fn report(reports: Vec<TargetReport>) -> ExitCode {
    let mut failed = 0;
    for report in &reports {
        match &report.outcome {
            Ok(checked) => {
                println!("ok    {}", report.board);
                for note in checked.notes.iter().filter(|n| !n.redundant) {
                    println!("      {} from {} hides {}", note.param, note.winner, note.shadowed);
                }
            }
            Err(TargetError::Invalid(violations)) => {
                failed += 1;
                println!("FAIL  {} ({} violation(s))", report.board, violations.len());
                for violation in violations.iter() {
                    println!("      {violation}");
                }
            }
            Err(e) => {
                failed += 1;
                println!("FAIL  {}: {}", report.board, e);
            }
        }
    }
    info!("[hwconf] {} of {} board(s) valid", reports.len() - failed, reports.len());
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn show(registry: &SourceRegistry, board: &str, format: Format, overrides: &[(String, Value)]) -> ExitCode {
    let checked = match registry.check(board, overrides) {
        Ok(checked) => checked,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let config = &checked.config;

    match format {
        Format::Table => {
            for (name, binding) in config.bindings() {
                match binding {
                    Some(b) => println!("{name:<40} {:<24} {}", b.value.to_string(), b.origin),
                    None => println!("{name:<40} -"),
                }
            }
        }
        Format::Json => match emit::json(config) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                error!("[hwconf] {}", e);
                return ExitCode::FAILURE;
            }
        },
        Format::Header => print!("{}", emit::c_header(config)),
    }
    ExitCode::SUCCESS
}
