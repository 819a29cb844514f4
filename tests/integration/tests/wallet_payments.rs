//! Integration test: simulated wallet flows feeding the settlement pipeline.
//!
//! Connects simulated wallets from finvo-wallet, signs payment references,
//! and settles invoices through finvo-settlement.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use finvo_core::{CryptoCurrency, Currency, InvoiceStatus, TransactionType};
use finvo_ledger::{CreateInvoice, InvoiceStore, TransactionLedger, TransactionFilter};
use finvo_rates::{CurrencyConverter, PriceCache, SimulatedFeed};
use finvo_settlement::{DirectPayment, PaymentRequest, SettlementProcessor};
use finvo_wallet::{
    SimulatedWalletAdapter, WalletAdapter, WalletBalanceResolver, LAMPORTS_PER_SOL,
};

const MERCHANT: &str = "merch11111111111111111111111111111111111111";

fn settlement_stack() -> (
    Arc<InvoiceStore>,
    Arc<TransactionLedger>,
    Arc<SettlementProcessor>,
) {
    let invoices = Arc::new(InvoiceStore::new());
    let ledger = Arc::new(TransactionLedger::new(Arc::clone(&invoices)));
    let feed = Arc::new(SimulatedFeed::new());
    let cache = Arc::new(PriceCache::with_default_ttl(feed));
    let converter = Arc::new(CurrencyConverter::new(cache));
    let processor = Arc::new(SettlementProcessor::new(
        Arc::clone(&invoices),
        Arc::clone(&ledger),
        converter,
    ));
    (invoices, ledger, processor)
}

fn pending_sol_invoice(invoices: &InvoiceStore, amount: Decimal) -> finvo_ledger::Invoice {
    invoices
        .create(CreateInvoice {
            creator_id: "acct-merchant".to_string(),
            recipient_address: MERCHANT.to_string(),
            amount,
            currency: Currency::Crypto(CryptoCurrency::SOL),
            invoice_number: None,
            status: Some(InvoiceStatus::Pending),
            fiat_amount: None,
            description: None,
            due_date: Some(Utc::now() + chrono::Duration::days(7)),
        })
        .expect("invoice creation should succeed")
}

// =========================================================================
// Wallet connect → sign → settle
// =========================================================================

#[tokio::test]
async fn test_connected_wallet_pays_invoice() {
    let (invoices, ledger, processor) = settlement_stack();
    let wallet = SimulatedWalletAdapter::new();

    let payer = wallet
        .connect("alice-demo-seed")
        .await
        .expect("connect should succeed");
    assert_eq!(payer, SimulatedWalletAdapter::derive_address("alice-demo-seed"));

    let invoice = pending_sol_invoice(&invoices, dec!(2.5));
    let signature = wallet
        .sign_message(&payer, invoice.id.as_uuid().as_bytes())
        .await
        .expect("connected wallet should sign");
    let hash = bs58::encode(signature).into_string();

    let settled = processor
        .process_payment(PaymentRequest {
            invoice_id: invoice.id,
            payer_address: payer.clone(),
            amount: dec!(2.5),
            currency: Currency::Crypto(CryptoCurrency::SOL),
            transaction_hash: hash.clone(),
            memo: None,
        })
        .await
        .expect("settlement should succeed");

    assert_eq!(settled.sender_address, payer);
    assert_eq!(settled.recipient_address, MERCHANT);
    assert_eq!(settled.transaction_hash, hash);
    assert_eq!(
        invoices.get(invoice.id).unwrap().status,
        InvoiceStatus::Paid
    );
    assert_eq!(ledger.count(), 1);
}

#[tokio::test]
async fn test_disconnected_wallet_cannot_sign() {
    let wallet = SimulatedWalletAdapter::new();
    let stranger = SimulatedWalletAdapter::derive_address("never-connected");
    assert!(wallet.sign_message(&stranger, b"anything").await.is_err());
}

// =========================================================================
// Balance resolution
// =========================================================================

#[tokio::test]
async fn test_resolver_answers_for_simulated_wallets() {
    let adapter = Arc::new(SimulatedWalletAdapter::new());
    let resolver = WalletBalanceResolver::new(adapter, Duration::from_secs(1));

    let address = SimulatedWalletAdapter::derive_address("alice-demo-seed");
    let view = resolver.balance(&address).await;

    assert_eq!(view.address, address);
    assert!(view.lamports < 100 * LAMPORTS_PER_SOL);

    // Deterministic per address
    let again = resolver.balance(&address).await;
    assert_eq!(again.lamports, view.lamports);
}

#[tokio::test]
async fn test_resolver_never_fails_on_garbage() {
    let adapter = Arc::new(SimulatedWalletAdapter::new());
    let resolver = WalletBalanceResolver::new(adapter, Duration::from_secs(1));

    let view = resolver.balance("not-a-real-address").await;
    assert_eq!(view.address, "not-a-real-address");
    assert_eq!(view.lamports, 1_500_000_000);
    assert_eq!(view.balance, dec!(1.5));
}

// =========================================================================
// Direct transfers between wallets
// =========================================================================

#[tokio::test]
async fn test_direct_transfer_listed_for_both_parties() {
    let (_invoices, ledger, processor) = settlement_stack();
    let sender = SimulatedWalletAdapter::derive_address("alice-demo-seed");
    let recipient = SimulatedWalletAdapter::derive_address("bob-demo-seed");

    let row = processor
        .record_direct(DirectPayment {
            sender_address: sender.clone(),
            recipient_address: recipient.clone(),
            amount: dec!(5),
            currency: Currency::Crypto(CryptoCurrency::SOL),
            fiat_amount: None,
            transaction_hash: "direct-tx-1".to_string(),
            memo: Some("rent split".to_string()),
        })
        .expect("direct transfer should record");

    assert_eq!(row.transaction_type, TransactionType::Payment);
    assert!(row.invoice_id.is_none());

    let sent = ledger.list(&TransactionFilter {
        invoice_id: None,
        address: Some(sender),
    });
    assert_eq!(sent.len(), 1);

    let received = ledger.list(&TransactionFilter {
        invoice_id: None,
        address: Some(recipient),
    });
    assert_eq!(received.len(), 1);
    assert_eq!(sent[0].id, received[0].id);
}
