//! Finvo CLI, a command-line client for a running finvo node.
//!
//! Subcommands: create, invoices, pay, convert, prices, balance.

mod commands;

use clap::{Parser, Subcommand};

/// Finvo, multi-currency invoicing and settlement.
#[derive(Parser, Debug)]
#[command(name = "finvo", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new invoice.
    Create(commands::create::CreateArgs),
    /// List invoices.
    Invoices(commands::invoices::InvoicesArgs),
    /// Settle an invoice with a payment.
    Pay(commands::pay::PayArgs),
    /// Convert an amount between currencies.
    Convert(commands::convert::ConvertArgs),
    /// Show cached crypto prices.
    Prices(commands::prices::PricesArgs),
    /// Show a Solana wallet balance.
    Balance(commands::balance::BalanceArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Create(args) => commands::create::run(args).await,
        Commands::Invoices(args) => commands::invoices::run(args).await,
        Commands::Pay(args) => commands::pay::run(args).await,
        Commands::Convert(args) => commands::convert::run(args).await,
        Commands::Prices(args) => commands::prices::run(args).await,
        Commands::Balance(args) => commands::balance::run(args).await,
    }
}
