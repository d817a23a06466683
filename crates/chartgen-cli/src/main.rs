//! Chartgen CLI - convert cluster manifests into chart artifacts

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use commands::GeneratorArgs;

#[derive(Parser)]
#[command(name = "chartgen")]
#[command(author = "Chartgen Contributors")]
#[command(version)]
#[command(about = "Convert cluster manifests into chart templates, values and external files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract templates, values, dependencies and external files
    Extract {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        manifests: Vec<PathBuf>,

        #[command(flatten)]
        generator: GeneratorArgs,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Fail when a resource is not handled by any strategy
        #[arg(long)]
        strict: bool,
    },

    /// Print the suggested structure of the external files
    Structure {
        /// Manifest files (multi-document YAML)
        #[arg(required = true)]
        manifests: Vec<PathBuf>,

        #[command(flatten)]
        generator: GeneratorArgs,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

fn main() -> miette::Result<()> {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match cli.command {
        Commands::Extract {
            manifests,
            generator,
            json,
            strict,
        } => commands::extract::run(&manifests, &generator, json, strict),

        Commands::Structure {
            manifests,
            generator,
        } => commands::structure::run(&manifests, &generator),
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }

    Ok(())
}
