//! Standalone fold split tool: prints `cp` commands for one held-out fold.

use clap::Parser;
use std::path::PathBuf;

use bathy_tools::cli::{self, CopyCommandsArgs};

#[derive(Parser)]
#[command(name = "get-copy-commands")]
#[command(about = "Print cp commands splitting files into training/testing folds", version)]
struct Cli {
    #[command(flatten)]
    args: CopyCommandsArgs,

    /// Path to YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose);

    let config = cli::load_config(cli.config.as_deref());
    cli::cmd_copy_commands(&cli.args, &config);
}
