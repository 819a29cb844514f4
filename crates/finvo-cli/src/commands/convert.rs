//! `finvo convert` converts an amount between currencies at market rates.

use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finvo_core::Currency;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Amount to convert.
    pub amount: Decimal,

    /// Source currency code.
    pub from: String,

    /// Target currency code.
    pub to: String,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConvertRequest<'a> {
    amount: Decimal,
    from_currency: &'a str,
    to_currency: &'a str,
}

#[derive(Deserialize)]
struct ConversionLeg {
    currency: String,
    amount: Decimal,
}

#[derive(Deserialize)]
struct ConversionResponse {
    from: ConversionLeg,
    to: ConversionLeg,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(args: &ConvertArgs) -> anyhow::Result<()> {
    let from = Currency::parse(&args.from.to_uppercase())?;
    let to = Currency::parse(&args.to.to_uppercase())?;
    let url = format!("{}/api/convert", args.endpoint);
    let body = ConvertRequest {
        amount: args.amount,
        from_currency: from.code(),
        to_currency: to.code(),
    };

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let conversion: ConversionResponse = r.json().await?;
            println!(
                "{} {} = {} {}",
                conversion.from.amount,
                conversion.from.currency,
                conversion.to.amount,
                conversion.to.currency,
            );
        }
        Ok(r) => {
            let status = r.status();
            if let Ok(err) = r.json::<ErrorResponse>().await {
                anyhow::bail!("conversion failed (HTTP {}): {}", status, err.error);
            } else {
                anyhow::bail!("conversion failed (HTTP {})", status);
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
