//! `stackscope` binary entry point.

mod cli_logger;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;

use cli_logger::CliLogger;
use stackscope::{
    Config, ExportOptions, RecordOptions, ViewOptions, export_command, record_command,
    view_command,
};

#[derive(Debug, Parser)]
#[command(
    name = "stackscope",
    version,
    about = "Record goroutine stack samples and reconstruct where the time went"
)]
struct Cli {
    /// Print machine-readable JSON instead of pretty output.
    #[arg(long, global = true)]
    json: bool,

    /// Disable ANSI colors.
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file path.
    #[arg(long, global = true, default_value = "stackscope.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Record periodic goroutine dumps from a running process.
    Record(RecordOptions),
    /// Reconstruct and render a timeline from a stack log.
    View(ViewOptions),
    /// Export a stack log in machine-readable formats.
    Export(ExportOptions),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let logger = CliLogger::new(cli.json, cli.no_color);
    let config = Config::load_optional(&cli.config);

    let result = match &cli.command {
        Command::Record(opts) => record_command(&config, opts),
        Command::View(opts) => view_command(&config, opts),
        Command::Export(opts) => export_command(&config, opts),
    };

    match result {
        Ok(value) => {
            if let Err(err) = logger.print_payload(&value) {
                logger.print_error(&err.to_string());
                std::process::exit(1);
            }
        }
        Err(err) => {
            logger.print_error(&err.to_string());
            std::process::exit(1);
        }
    }
}
