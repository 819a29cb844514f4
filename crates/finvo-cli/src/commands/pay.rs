//! `finvo pay` settles an invoice with a recorded payment.

use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finvo_core::Currency;

#[derive(Args, Debug)]
pub struct PayArgs {
    /// Invoice id to settle.
    #[arg(short, long)]
    pub invoice: String,

    /// Paying wallet address.
    #[arg(short, long)]
    pub payer: String,

    /// Amount paid, in the payment currency.
    #[arg(short, long)]
    pub amount: Decimal,

    /// Payment currency code.
    #[arg(short, long)]
    pub currency: String,

    /// Transaction hash on the payment rail.
    #[arg(long)]
    pub hash: String,

    /// Optional memo recorded with the payment.
    #[arg(short, long)]
    pub memo: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequest<'a> {
    invoice_id: &'a str,
    sender_address: &'a str,
    amount: Decimal,
    currency: &'a str,
    transaction_hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionView {
    id: String,
    status: String,
    amount: Decimal,
    currency: String,
    fiat_amount: Option<Decimal>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(args: &PayArgs) -> anyhow::Result<()> {
    let currency = Currency::parse(&args.currency.to_uppercase())?;
    let url = format!("{}/api/transactions", args.endpoint);
    let body = PaymentRequest {
        invoice_id: &args.invoice,
        sender_address: &args.payer,
        amount: args.amount,
        currency: currency.code(),
        transaction_hash: &args.hash,
        memo: args.memo.as_deref(),
    };

    println!("Settling invoice {}...", args.invoice);
    println!("  Payer:    {}", args.payer);
    println!("  Amount:   {} {}", args.amount, currency.code());
    println!("  Via:      {}", args.endpoint);
    println!();

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let tx: TransactionView = r.json().await?;
            println!("Payment recorded!");
            println!("  TX ID:    {}", tx.id);
            println!("  Status:   {}", tx.status);
            println!("  Amount:   {} {}", tx.amount, tx.currency);
            if let Some(fiat) = tx.fiat_amount {
                println!("  USD:      {:.2}", fiat);
            }
        }
        Ok(r) => {
            let status = r.status();
            if let Ok(err) = r.json::<ErrorResponse>().await {
                anyhow::bail!("payment failed (HTTP {}): {}", status, err.error);
            } else {
                anyhow::bail!("payment failed (HTTP {})", status);
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
