//! Command-line interface for mlwrap
//! Reads an HTML fragment (or a JSON response body) and prints it with typed
//! text runs wrapped in spans.
//!
//! Usage:
//!   mlwrap [PATH] --selector `<sel>` [--exclude `<sel>`] [--types en,ko]   - Wrap a file or stdin
//!   mlwrap --mode shortcode [PATH]                                        - Wrap using the fallback tags
//!   mlwrap --print-frontend-config                                        - Print the client config script

use clap::{Arg, ArgAction, ArgMatches, Command};
use mlwrap::{WrapConfig, Wrapper};
use mlwrap_config::{ConfigError, Loader};
use std::io::{self, Read, Write};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
}

fn main() {
    let matches = build_command().get_matches();
    init_tracing(matches.get_flag("verbose"));

    if let Err(err) = run(&matches) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn build_command() -> Command {
    Command::new("mlwrap")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Wrap multilingual text runs in HTML with typed spans")
        .arg(
            Arg::new("path")
                .help("HTML file to process ('-' or absent reads stdin)")
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file (TOML or JSON) layered over the defaults"),
        )
        .arg(
            Arg::new("types")
                .long("types")
                .short('t')
                .help("Comma-separated character classes (e.g. 'en,ko,num')"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .short('p')
                .help("Class prefix for generated spans"),
        )
        .arg(
            Arg::new("selector")
                .long("selector")
                .short('s')
                .help("Element selector whose text is wrapped (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("exclude")
                .long("exclude")
                .short('x')
                .help("Selector of elements never wrapped (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("whitelist")
                .long("whitelist")
                .short('w')
                .help("Shortcode tag left untouched inside text (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .short('m')
                .help("content: auto selectors; shortcode: fallback tags; json: response body")
                .value_parser(["content", "shortcode", "json"])
                .default_value("content"),
        )
        .arg(
            Arg::new("print-frontend-config")
                .long("print-frontend-config")
                .help("Print the client-side configuration script and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log fast-path decisions and recovered failures")
                .action(ArgAction::SetTrue),
        )
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();
}

fn run(matches: &ArgMatches) -> Result<(), CliError> {
    let config = load_config(matches)?;

    if matches.get_flag("print-frontend-config") {
        println!("{}", config.frontend().inline_script());
        return Ok(());
    }

    let path = matches.get_one::<String>("path").map(String::as_str);
    let input = read_input(path)?;

    let wrapper = Wrapper::new(config);
    let mode = matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("content");
    info!(mode, bytes = input.len(), "wrapping input");

    let output = match mode {
        "shortcode" => wrapper.wrap_shortcode_output(&input),
        "json" => wrapper.wrap_response_body(&input),
        _ => wrapper.wrap_content(&input),
    };

    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes()).map_err(CliError::Write)?;
    stdout.flush().map_err(CliError::Write)
}

/// Defaults, then `--config`, then individual flags
fn load_config(matches: &ArgMatches) -> Result<WrapConfig, CliError> {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }

    if let Some(types) = matches.get_one::<String>("types") {
        let types: Vec<String> = types
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        loader = loader.set_override("types", types)?;
    }
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        loader = loader.set_override("class_prefix", prefix.as_str())?;
    }
    for (flag, key) in [
        ("selector", "auto_selectors"),
        ("exclude", "exclude_selectors"),
        ("whitelist", "shortcode_whitelist"),
    ] {
        if let Some(values) = matches.get_many::<String>(flag) {
            let values: Vec<String> = values.cloned().collect();
            loader = loader.set_override(key, values)?;
        }
    }

    Ok(loader.build_config()?)
}

fn read_input(path: Option<&str>) -> Result<String, CliError> {
    match path {
        None | Some("-") => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map_err(|source| CliError::Read {
                    path: "stdin".to_string(),
                    source,
                })?;
            Ok(input)
        }
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_string(),
            source,
        }),
    }
}
