mod run;
mod script;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "replay-lab", version, about = "Deterministic session replays for everwhen")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a script and print the events each action produced.
    Run {
        script: PathBuf,
        /// Print only the transcript digest, for comparing replays.
        #[arg(long)]
        digest_only: bool,
        /// Optional engine config; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a starter script to stdout.
    Example,
}

fn main() -> Result<()> {
    everwhen::logging::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            script,
            digest_only,
            config,
        } => run::run_script(&script, config.as_deref(), digest_only),
        Command::Example => {
            print!("{}", script::EXAMPLE);
            Ok(())
        }
    }
}
