use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use aquaerp_cli::Script;
use aquaerp_infra::LedgerConfig;

/// Lot ledger tool: replays scripted lot operations and prints the outcome.
#[derive(Parser, Debug)]
#[command(name = "lotbook", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a JSON script through a fresh registry and print the report.
    Run {
        /// Path to the script file.
        script: PathBuf,
        /// Print single-line JSON.
        #[arg(long)]
        compact: bool,
    },
    /// Print the ledger configuration read from the environment.
    Config,
}

fn main() -> anyhow::Result<()> {
    aquaerp_observability::init();

    let cli = Cli::parse();
    let config = LedgerConfig::from_env().context("invalid ledger configuration")?;

    match cli.command {
        Commands::Run { script, compact } => {
            let raw = std::fs::read_to_string(&script)
                .with_context(|| format!("failed to read {}", script.display()))?;
            let parsed = Script::parse(&raw)
                .with_context(|| format!("malformed script {}", script.display()))?;
            let report = parsed.run(&config)?;

            let out = if compact {
                serde_json::to_string(&report)?
            } else {
                serde_json::to_string_pretty(&report)?
            };
            println!("{out}");
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
