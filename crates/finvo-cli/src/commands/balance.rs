//! `finvo balance` shows a Solana wallet balance via the node.

use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Wallet address to look up.
    pub address: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceView {
    address: String,
    balance: Decimal,
    lamports: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(args: &BalanceArgs) -> anyhow::Result<()> {
    let url = format!(
        "{}/api/solana/wallets/{}/balance",
        args.endpoint, args.address
    );

    let client = reqwest::Client::new();
    let resp = client.get(&url).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let view: BalanceView = r.json().await?;
            println!("Wallet {}", view.address);
            println!("  Balance:  {} SOL", view.balance);
            println!("  Lamports: {}", view.lamports);
        }
        Ok(r) => {
            let status = r.status();
            if let Ok(err) = r.json::<ErrorResponse>().await {
                anyhow::bail!("balance lookup failed (HTTP {}): {}", status, err.error);
            } else {
                anyhow::bail!("balance lookup failed (HTTP {})", status);
            }
        }
        Err(e) => {
            println!("Could not reach node at {}", args.endpoint);
            println!("  Error: {}", e);
            println!();
            println!("Is the node running? Start it with: finvo-node");
        }
    }

    Ok(())
}
