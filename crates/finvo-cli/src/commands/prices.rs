//! `finvo prices` shows crypto prices from the node's cache.

use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct PricesArgs {
    /// Show a single symbol (e.g. SOL) instead of all.
    pub symbol: Option<String>,

    /// Force a refresh from the upstream feed.
    #[arg(long)]
    pub refresh: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceView {
    symbol: String,
    price_usd: Decimal,
    observed_at: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

fn print_price(price: &PriceView) {
    println!(
        "  {:<6} {:>16} USD   (as of {})",
        price.symbol, price.price_usd, price.observed_at
    );
}

pub async fn run(args: &PricesArgs) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let resp = match args.symbol {
        Some(ref symbol) => {
            let url = format!("{}/api/crypto-prices/{}", args.endpoint, symbol);
            client.get(&url).send().await
        }
        None => {
            let url = format!("{}/api/crypto-prices", args.endpoint);
            let query = [("update", args.refresh)];
            client.get(&url).query(&query).send().await
        }
    };

    match resp {
        Ok(r) if r.status().is_success() => {
            if args.symbol.is_some() {
                let price: PriceView = r.json().await?;
                print_price(&price);
            } else {
                let prices: Vec<PriceView> = r.json().await?;
                for price in &prices {
                    print_price(price);
                }
            }
        }
        Ok(r) => {
            let status = r.status();
            if let Ok(err) = r.json::<ErrorResponse>().await {
                anyhow::bail!("price lookup failed (HTTP {}): {}", status, err.error);
            } else {
                anyhow::bail!("price lookup failed (HTTP {})", status);
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
