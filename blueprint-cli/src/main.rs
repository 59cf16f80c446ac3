//! Blueprint: generate project skeletons from declarative blueprints.
//!
//! # Usage
//!
//! ```text
//! blueprint list [--json]
//! blueprint show <id> [--json]
//! blueprint validate <path>
//! blueprint generate <id> --out <dir> [--set KEY=VALUE]... [--vars-file <file>]
//!                    [--force] [--dry-run] [--json]
//! ```
//!
//! Blueprints are read from `~/.blueprint/blueprints/` unless
//! `--blueprints-dir` (or `BLUEPRINT_DIR`) points elsewhere.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    generate::GenerateArgs, list::ListArgs, show::ShowArgs, validate::ValidateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "blueprint",
    version,
    about = "Generate project skeletons from declarative blueprints",
    long_about = None,
)]
struct Cli {
    /// Directory holding blueprints [default: ~/.blueprint/blueprints].
    #[arg(long, global = true, env = "BLUEPRINT_DIR", value_name = "DIR")]
    blueprints_dir: Option<PathBuf>,

    /// Log progress to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available blueprints.
    List(ListArgs),

    /// Show a blueprint's variables, files, dependencies and hooks.
    Show(ShowArgs),

    /// Check a single blueprint manifest and its templates.
    Validate(ValidateArgs),

    /// Generate a project from a blueprint.
    Generate(GenerateArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let dir = cli.blueprints_dir.as_deref();
    match cli.command {
        Commands::List(args) => args.run(dir),
        Commands::Show(args) => args.run(dir),
        Commands::Validate(args) => args.run(),
        Commands::Generate(args) => args.run(dir),
    }
}
