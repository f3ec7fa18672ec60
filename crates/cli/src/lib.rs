pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use cartmatch_core::config::{AppConfig, LoadOptions};
use clap::{Parser, Subcommand};
use tracing::Level;

use commands::match_item::MatchArgs;
use commands::resolve::ResolveArgs;

#[derive(Debug, Parser)]
#[command(
    name = "cartmatch",
    about = "Grocery product matching CLI",
    long_about = "Resolve shopping-list items to retailer products with confidence scores.",
    after_help = "Examples:\n  cartmatch resolve --items cart.json --catalog products.json\n  \
                  cartmatch match --name \"whole milk\" --catalog products.json\n  \
                  cartmatch config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a cartmatch.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Resolve a JSON cart of items and emit the batch result as JSON")]
    Resolve(ResolveArgs),
    #[command(about = "Resolve a single item described on the command line")]
    Match(MatchArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

fn init_logging(config_path: Option<PathBuf>) {
    use cartmatch_core::config::LogFormat::*;

    let Ok(config) = AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) else {
        // Commands report config errors themselves.
        return;
    };
    let log_level = log_level(&config);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .compact()
                .init();
        }
        Pretty => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .pretty()
                .init();
        }
        Json => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
    }
}

fn log_level(config: &AppConfig) -> Level {
    config.logging.level.parse::<Level>().unwrap_or(Level::INFO)
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.config.clone());

    let result = match &cli.command {
        Command::Resolve(args) => commands::resolve::run(args, cli.config.clone()),
        Command::Match(args) => commands::match_item::run(args, cli.config.clone()),
        Command::Config => commands::config::run(cli.config.clone()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
