//! SRT ledger operator CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use srt_ledger::{amount::to_human, Config, Ledger};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "srt-ledger", version, about = "Append-only SRT token ledger")]
struct Cli {
    /// TOML configuration file (defaults plus SRT_LEDGER_* environment otherwise)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ledger file, overrides the configured path
    #[arg(long, global = true)]
    ledger_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the ledger file with its genesis block if it does not exist
    Init,
    /// Verify every block and the derived balances
    Audit,
    /// Print the balance of an address
    Balance {
        /// Address to query
        address: String,
    },
    /// Mint new tokens to an address
    Mint {
        /// Credited address
        address: String,
        /// Amount in tokens (up to 18 decimals)
        amount: Decimal,
    },
    /// Transfer tokens between addresses
    Transfer {
        /// Debited address
        from: String,
        /// Credited address
        to: String,
        /// Amount in tokens (up to 18 decimals)
        amount: Decimal,
    },
    /// List the entries touching an address
    History {
        /// Address to query
        address: String,
    },
    /// Dump the whole chain as JSON
    Export,
    /// Print ledger metrics in the Prometheus text format
    Metrics,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env()?,
    };
    if let Some(path) = &cli.ledger_file {
        config.storage.ledger_file = path.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let symbol = config.token.symbol.clone();

    let ledger = Ledger::open(config)
        .await
        .context("opening ledger")?;

    let outcome = run(&ledger, cli.command, &symbol).await;
    ledger.shutdown().await?;
    outcome
}

async fn run(ledger: &Ledger, command: Command, symbol: &str) -> Result<()> {
    match command {
        Command::Init => {
            println!(
                "Ledger ready: {} blocks at {}",
                ledger.block_count(),
                ledger.config().storage.ledger_file.display()
            );
        }

        Command::Audit => {
            let report = ledger.audit();
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_secure() {
                anyhow::bail!("audit failed: {}", report.status);
            }
        }

        Command::Balance { address } => {
            println!("{} {}", ledger.balance_of_human(&address)?, symbol);
        }

        Command::Mint { address, amount } => {
            let entry_id = ledger.mint(&address, amount).await?;
            println!("Minted {} {} to {} (entry {})", amount, symbol, address, entry_id);
        }

        Command::Transfer { from, to, amount } => {
            let entry_id = ledger.transfer(&from, &to, amount).await?;
            println!("Transferred {} {} from {} to {} (entry {})", amount, symbol, from, to, entry_id);
        }

        Command::History { address } => {
            for entry in ledger.history(&address) {
                println!(
                    "{} {} {} -> {} {} {}",
                    entry.timestamp,
                    entry.kind,
                    entry.from,
                    entry.to,
                    to_human(entry.amount)?,
                    symbol
                );
            }
        }

        Command::Export => {
            println!("{}", serde_json::to_string_pretty(&ledger.export())?);
        }

        Command::Metrics => {
            print!("{}", ledger.metrics());
        }
    }

    Ok(())
}
