//! `finvo invoices` lists invoices known to a running node.

use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct InvoicesArgs {
    /// Filter by creator account id.
    #[arg(long)]
    pub creator: Option<String>,

    /// Filter by status (draft, pending, paid, released, refunded, overdue).
    #[arg(short, long)]
    pub status: Option<String>,

    /// API endpoint of the node.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceView {
    id: String,
    invoice_number: String,
    creator_id: String,
    status: String,
    amount: Decimal,
    currency: String,
    fiat_amount: Option<Decimal>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(args: &InvoicesArgs) -> anyhow::Result<()> {
    let url = format!("{}/api/invoices", args.endpoint);
    let mut query: Vec<(&str, &str)> = Vec::new();
    if let Some(ref creator) = args.creator {
        query.push(("creatorId", creator));
    }
    if let Some(ref status) = args.status {
        query.push(("status", status));
    }

    let client = reqwest::Client::new();
    let resp = client.get(&url).query(&query).send().await;

    match resp {
        Ok(r) if r.status().is_success() => {
            let invoices: Vec<InvoiceView> = r.json().await?;
            if invoices.is_empty() {
                println!("No invoices found.");
                return Ok(());
            }
            println!("{} invoice(s):", invoices.len());
            for invoice in &invoices {
                let fiat = invoice
                    .fiat_amount
                    .map(|f| format!(" (~{:.2} USD)", f))
                    .unwrap_or_default();
                println!(
                    "  {}  {:<10} {:>12} {}{}  {} [{}]",
                    invoice.id,
                    invoice.status,
                    invoice.amount,
                    invoice.currency,
                    fiat,
                    invoice.invoice_number,
                    invoice.creator_id,
                );
            }
        }
        Ok(r) => {
            let status = r.status();
            if let Ok(err) = r.json::<ErrorResponse>().await {
                anyhow::bail!("listing failed (HTTP {}): {}", status, err.error);
            } else {
                anyhow::bail!("listing failed (HTTP {})", status);
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
