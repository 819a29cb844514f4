//! `finvo create` issues a new invoice on a running node.

use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use finvo_core::Currency;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Creator account id.
    #[arg(long)]
    pub creator: String,

    /// Payout address for the invoice.
    #[arg(short, long)]
    pub recipient: String,

    /// Invoice amount.
    #[arg(short, long)]
    pub amount: Decimal,

    /// Currency code (e.g. USD, SOL, BTC).
    #[arg(short, long)]
    pub currency: String,

    /// Free-form description.
    #[arg(short, long)]
    pub description: Option<String>,

    /// Issue as pending instead of draft.
    #[arg(long)]
    pub pending: bool,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateInvoiceRequest<'a> {
    creator_id: &'a str,
    recipient_address: &'a str,
    amount: Decimal,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceView {
    id: String,
    invoice_number: String,
    status: String,
    amount: Decimal,
    currency: String,
    fiat_amount: Option<Decimal>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(args: &CreateArgs) -> anyhow::Result<()> {
    let currency = Currency::parse(&args.currency.to_uppercase())?;
    let url = format!("{}/api/invoices", args.endpoint);
    let body = CreateInvoiceRequest {
        creator_id: &args.creator,
        recipient_address: &args.recipient,
        amount: args.amount,
        currency: currency.code(),
        status: args.pending.then_some("pending"),
        description: args.description.as_deref(),
    };

    println!("Creating invoice...");
    println!("  Creator:  {}", args.creator);
    println!("  Amount:   {} {}", args.amount, currency.code());
    println!("  Via:      {}", args.endpoint);
    println!();

    let client = reqwest::Client::new();
    let resp = client.post(&url).json(&body).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let invoice: InvoiceView = r.json().await?;
            println!("Invoice created!");
            println!("  ID:       {}", invoice.id);
            println!("  Number:   {}", invoice.invoice_number);
            println!("  Status:   {}", invoice.status);
            println!("  Amount:   {} {}", invoice.amount, invoice.currency);
            if let Some(fiat) = invoice.fiat_amount {
                println!("  USD:      {:.2}", fiat);
            }
        }
        Ok(r) => {
            let status = r.status();
            if let Ok(err) = r.json::<ErrorResponse>().await {
                anyhow::bail!("invoice creation failed (HTTP {}): {}", status, err.error);
            } else {
                anyhow::bail!("invoice creation failed (HTTP {})", status);
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
