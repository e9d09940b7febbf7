mod config;
mod error;
mod gateway;
mod ipc;
mod llm;
mod process;
mod sandbox;
mod store;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::gateway::Gateway;
use crate::llm::bridge::CHILD_SUBCOMMAND;

const DEFAULT_CONFIG_PATH: &str = "config/gateway.toml";

fn print_help() {
    println!(
        "\
browser-gateway v{}

Privileged-operation gateway for a desktop browser shell. Reads one JSON
request per line on stdin and writes one JSON response per line on stdout.

USAGE:
    browser-gateway [OPTIONS] [CONFIG_PATH]
    browser-gateway ai-query

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file [default: {DEFAULT_CONFIG_PATH}]

COMMANDS:
    ai-query       Answer one AI query from the environment and exit
                   (spawned by the gateway itself for query-gemini)

OPTIONS:
        --root DIR   Sandbox root, overrides [gateway] root
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG              Log level filter for tracing, written to stderr
                          (e.g. debug, browser_gateway=debug,warn)
    GEMINI_API_KEY        API key for Google Gemini
                          (from https://aistudio.google.com/)
    GEMINI_QUERY          Query text, ai-query mode only
    GEMINI_MODEL          Model name, ai-query mode only
    GEMINI_BASE_URL       API base URL, ai-query mode only

EXAMPLES:
    browser-gateway                              # uses {DEFAULT_CONFIG_PATH}
    browser-gateway --root ~/project             # custom sandbox root
    RUST_LOG=debug browser-gateway gateway.toml  # with debug logging",
        env!("CARGO_PKG_VERSION"),
    );
}

/// Command line after option parsing
struct Args {
    config_path: PathBuf,
    root: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut config_path = None;
    let mut root = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--root" => match args.next() {
                Some(dir) => root = Some(PathBuf::from(dir)),
                None => bail!("--root needs a directory"),
            },
            flag if flag.starts_with('-') => bail!("unknown option {flag} (see --help)"),
            path => {
                if config_path.is_some() {
                    bail!("unexpected argument {path} (see --help)");
                }
                config_path = Some(PathBuf::from(path));
            }
        }
    }

    Ok(Args {
        config_path: config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
        root,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version / ai-query before anything else
    let argv: Vec<String> = std::env::args().skip(1).collect();
    for arg in &argv {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("browser-gateway v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }
    if argv.first().map(String::as_str) == Some(CHILD_SUBCOMMAND) {
        std::process::exit(llm::run_query_child().await);
    }

    // stdout carries the protocol, logs go to stderr (RUST_LOG=debug for debug mode)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("browser_gateway=info")),
        )
        .init();

    let args = parse_args(argv)?;

    info!(
        "browser-gateway v{} loading configuration from {}",
        env!("CARGO_PKG_VERSION"),
        args.config_path.display()
    );
    if !args.config_path.exists() {
        info!("No configuration file, using defaults");
    }
    let mut config = Config::load(&args.config_path)?;
    if let Some(root) = args.root {
        config.gateway.root = root;
    }

    info!("AI: {}", config.ai_description());
    info!(
        "Ticket TTL: {}s, output cap: {} bytes",
        config.gateway.ticket_ttl_secs, config.gateway.max_output_bytes
    );
    info!("Exposed env: {}", config.gateway.exposed_env.join(", "));

    let gateway = Arc::new(Gateway::new(config)?);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    info!("Ready, serving requests on stdin");
    tokio::select! {
        result = ipc::serve(gateway, stdin, stdout) => {
            if let Err(e) = &result {
                error!("Transport error: {e}");
            }
            info!("Host closed the pipe, exiting");
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, exiting");
            Ok(())
        }
    }
}
