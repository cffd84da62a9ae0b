//! Purpose: `layerlens` CLI entry point and command dispatch bootstrap.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit JSON on stdout (pretty when stdout is a terminal).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Tracing output goes to stderr so stdout stays machine-readable.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod report_json;

use layerlens::api::{
    DEFAULT_MAX_STRUCTURES, DEFAULT_MAX_TETRAHEDRA, Engine, EngineOptions, Error, ErrorKind,
    LayeredSolidTorus, LensSpace, Triangulation, to_exit_code,
};
use report_json::{lens_space_json, manifold_json, skeleton_json, torus_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint(clap_error_hint(&err)));
            }
        },
    };

    init_tracing();
    let options = EngineOptions::new()
        .with_max_structures(cli.max_structures)
        .with_max_tetrahedra(cli.max_tetrahedra);
    command_dispatch::dispatch_command(cli.command, options)
        .map_err(add_corrupt_hint)
        .map_err(add_internal_hint)
}

#[derive(Parser, Debug)]
#[command(
    name = "layerlens",
    version,
    about = "Build and recognize layered lens space triangulations",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"A layered lens space is a layered solid torus whose two boundary faces
are folded onto each other. Output is JSON.
"#,
    after_help = r#"EXAMPLES
  $ layerlens build 7 2 --out l72.json
  $ layerlens recognize l72.json
  $ layerlens name 12 7
  $ layerlens torus 3 5

LEARN MORE
  $ layerlens <command> --help
  RUST_LOG=debug layerlens build 5 2    # trace engine activity on stderr"#,
    arg_required_else_help = true,
    disable_help_subcommand = false
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_MAX_STRUCTURES,
        help = "Maximum live structures (triangulations plus lens spaces) held by the engine"
    )]
    max_structures: usize,

    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_MAX_TETRAHEDRA,
        help = "Maximum tetrahedra in a built triangulation"
    )]
    max_tetrahedra: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(
        about = "Build a layered lens space L(p,q)",
        long_about = r#"Build a layered triangulation of the lens space L(p,q).

q is normalized into 0..=p/2 first; p and q must be coprime (L(0,1) is S2 x S1)."#,
        after_help = r#"EXAMPLES
  $ layerlens build 5 2
  $ layerlens build 0 1
  $ layerlens build 13 5 --out l13_5.json"#
    )]
    Build {
        #[arg(help = "Order of the fundamental group")]
        p: u64,
        #[arg(help = "Twist parameter, coprime to p")]
        q: u64,
        #[arg(
            long,
            help = "Write the triangulation JSON to this file instead of stdout",
            value_hint = ValueHint::FilePath
        )]
        out: Option<PathBuf>,
    },
    #[command(
        about = "Build a layered solid torus with meridinal cuts (a, b, a+b)",
        after_help = r#"EXAMPLES
  $ layerlens torus 1 2
  $ layerlens torus 3 5"#
    )]
    Torus {
        #[arg(help = "First meridinal cut count")]
        a: u64,
        #[arg(help = "Second meridinal cut count, coprime to the first")]
        b: u64,
    },
    #[command(
        about = "Print the canonical name of L(p,q)",
        after_help = r#"EXAMPLES
  $ layerlens name 7 3
  $ layerlens name 1 0"#
    )]
    Name {
        #[arg(help = "Order of the fundamental group")]
        p: u64,
        #[arg(help = "Twist parameter, coprime to p")]
        q: u64,
    },
    #[command(
        about = "Recognize layered lens spaces in a triangulation",
        long_about = r#"Read a triangulation as JSON and report every component that is a
layered lens space. Reads stdin when FILE is omitted or `-`.

Format: {"tetrahedra": [[g0, g1, g2, g3], ...]} with each gi null or
{"tet": n, "perm": [a, b, c, d]}."#,
        after_help = r#"EXAMPLES
  $ layerlens recognize l72.json
  $ layerlens build 5 2 --out - | layerlens recognize"#
    )]
    Recognize {
        #[arg(help = "Triangulation JSON file (default: stdin)", value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    #[command(about = "Print version info")]
    Version,
    #[command(
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ layerlens completion bash > ~/.local/share/bash-completion/completions/layerlens
  $ layerlens completion zsh > ~/.zfunc/_layerlens"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_triangulation(path: Option<&Path>) -> Result<Triangulation, Error> {
    let text = match path {
        Some(path) if !is_stdio(path) => std::fs::read_to_string(path).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_message("failed to read triangulation")
                .with_path(path)
                .with_source(err)
        })?,
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read triangulation from stdin")
                    .with_source(err)
            })?;
            text
        }
    };
    serde_json::from_str(&text).map_err(|err| {
        let err = Error::new(ErrorKind::Corrupt)
            .with_message("invalid triangulation json")
            .with_source(err);
        match path {
            Some(path) if !is_stdio(path) => err.with_path(path),
            _ => err,
        }
    })
}

fn write_triangulation(path: &Path, tri: &Triangulation) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(tri).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode triangulation")
            .with_source(err)
    })?;
    std::fs::write(path, format!("{text}\n")).map_err(|err| {
        Error::new(map_io_error_kind(&err))
            .with_message("failed to write triangulation")
            .with_path(path)
            .with_source(err)
    })
}

fn triangulation_json(tri: &Triangulation) -> Result<Value, Error> {
    serde_json::to_value(tri).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode triangulation")
            .with_source(err)
    })
}

fn map_io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        _ => ErrorKind::Io,
    }
}

fn add_corrupt_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Corrupt || err.hint().is_some() {
        return err;
    }
    err.with_hint("Triangulations are JSON: {\"tetrahedra\": [[null | {\"tet\": n, \"perm\": [a,b,c,d]}, x4], ...]}.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint("Rerun with RUST_LOG=trace and report the output.")
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("layerlens {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "layerlens",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_error(err: &Error) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::InvalidHandle => "invalid handle".to_string(),
        ErrorKind::AllocationFailed => "allocation failed".to_string(),
        ErrorKind::Corrupt => "corrupt data".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(handle) = err.handle() {
        inner.insert("handle".to_string(), json!(handle));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(path) = err.path() {
        lines.push(format!("path: {}", path.display()));
    }
    if let Some(handle) = err.handle() {
        lines.push(format!("handle: {handle}"));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

/// Points at the failing subcommand's help; commands here are one level deep.
fn clap_error_hint(err: &clap::Error) -> String {
    let subcommand = err.to_string().lines().find_map(|line| {
        let mut words = line.trim().strip_prefix("Usage: layerlens ")?.split_whitespace();
        words
            .next()
            .filter(|word| Cli::command().find_subcommand(word).is_some())
            .map(str::to_string)
    });
    match subcommand {
        Some(name) => format!("Try `layerlens {name} --help`."),
        None => "Try `layerlens --help`.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Cli, Command, DEFAULT_MAX_TETRAHEDRA, add_internal_hint, clap_error_hint, error_json,
        error_text,
    };
    use clap::Parser;
    use layerlens::api::{Error, ErrorKind};

    #[test]
    fn error_json_carries_handle_and_hint() {
        let err = Error::new(ErrorKind::InvalidHandle)
            .with_message("lens space handle is not live")
            .with_hint("Use a handle returned by the engine.")
            .with_handle(9);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "InvalidHandle");
        assert_eq!(value["error"]["handle"], 9);
        assert_eq!(value["error"]["hint"], "Use a handle returned by the engine.");
        assert!(value["error"].get("path").is_none());
    }

    #[test]
    fn error_text_falls_back_to_kind_message() {
        let err = add_internal_hint(Error::new(ErrorKind::Internal));
        let text = error_text(&err);
        assert!(text.starts_with("error: internal error"));
        assert!(text.contains("hint: Rerun with RUST_LOG=trace"));
    }

    #[test]
    fn global_capacity_flag_parses_after_subcommand() {
        let cli = Cli::try_parse_from(["layerlens", "build", "5", "2", "--max-structures", "8"])
            .expect("parse");
        assert_eq!(cli.max_structures, 8);
        assert_eq!(cli.max_tetrahedra, DEFAULT_MAX_TETRAHEDRA);
        assert!(matches!(cli.command, Command::Build { p: 5, q: 2, out: None }));

        let cli = Cli::try_parse_from(["layerlens", "--max-tetrahedra", "64", "torus", "3", "5"])
            .expect("parse");
        assert_eq!(cli.max_tetrahedra, 64);
    }

    #[test]
    fn usage_hint_names_the_failing_subcommand() {
        let err = Cli::try_parse_from(["layerlens", "build", "seven", "2"]).expect_err("bad p");
        assert_eq!(clap_error_hint(&err), "Try `layerlens build --help`.");
        let err = Cli::try_parse_from(["layerlens", "bogus"]).expect_err("bad command");
        assert_eq!(clap_error_hint(&err), "Try `layerlens --help`.");
    }
}
