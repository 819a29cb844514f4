//! Integration test: invoice lifecycle and settlement across crates.
//!
//! Drives the create, issue, settle, refund, and release flows using
//! finvo-ledger, finvo-rates, and finvo-settlement together.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use finvo_core::{
    CryptoCurrency, Currency, FiatCurrency, InvoiceStatus, TransactionStatus, TransactionType,
};
use finvo_ledger::{CreateInvoice, Invoice, InvoiceStore, TransactionLedger, TransactionFilter};
use finvo_rates::{CurrencyConverter, PriceCache, SimulatedFeed};
use finvo_settlement::{PaymentRequest, RefundRequest, SettlementError, SettlementProcessor};

const MERCHANT: &str = "merch11111111111111111111111111111111111111";
const PAYER: &str = "payer11111111111111111111111111111111111111";

/// Helper: a fully wired settlement stack over the simulated price feed.
/// Returns the store, the ledger, and the processor.
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

fn invoice_payload(amount: Decimal, currency: Currency) -> CreateInvoice {
    CreateInvoice {
        creator_id: "acct-merchant".to_string(),
        recipient_address: MERCHANT.to_string(),
        amount,
        currency,
        invoice_number: None,
        status: Some(InvoiceStatus::Pending),
        fiat_amount: None,
        description: Some("hosting".to_string()),
        due_date: Some(Utc::now() + Duration::days(7)),
    }
}

fn payment(invoice: &Invoice, amount: Decimal, currency: Currency, hash: &str) -> PaymentRequest {
    PaymentRequest {
        invoice_id: invoice.id,
        payer_address: PAYER.to_string(),
        amount,
        currency,
        transaction_hash: hash.to_string(),
        memo: None,
    }
}

// =========================================================================
// Invoice lifecycle: draft → pending → overdue (derived) → paid
// =========================================================================

#[tokio::test]
async fn test_overdue_invoice_settles_once() {
    let (invoices, ledger, processor) = settlement_stack();
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    let invoice = invoices
        .create(CreateInvoice {
            status: None,
            due_date: Some(Utc::now() - Duration::days(1)),
            ..invoice_payload(dec!(250), sol)
        })
        .expect("creation should succeed");
    assert_eq!(invoice.status, InvoiceStatus::Draft);

    // Issue the draft
    invoices
        .transition(invoice.id, InvoiceStatus::Draft, InvoiceStatus::Pending)
        .expect("issuing should succeed");

    // Reads derive overdue, the stored record stays pending
    assert_eq!(
        invoices.get(invoice.id).unwrap().status,
        InvoiceStatus::Overdue
    );
    assert_eq!(
        invoices.stored(invoice.id).unwrap().status,
        InvoiceStatus::Pending
    );

    // An overdue invoice is still payable
    let settled = processor
        .process_payment(payment(&invoice, dec!(250), sol, "tx123"))
        .await
        .expect("settlement should succeed");
    assert_eq!(settled.transaction_type, TransactionType::Payment);
    assert_eq!(settled.status, TransactionStatus::Success);

    let paid = invoices.get(invoice.id).unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert!(paid.paid_at.is_some());

    // A repeat settlement conflicts and records nothing
    let repeat = processor
        .process_payment(payment(&invoice, dec!(250), sol, "tx124"))
        .await;
    assert!(matches!(repeat, Err(SettlementError::AlreadySettled(_))));
    assert_eq!(ledger.count(), 1);
}

#[tokio::test]
async fn test_cross_currency_settlement_records_both_legs() {
    let (invoices, ledger, processor) = settlement_stack();
    let usd = Currency::Fiat(FiatCurrency::USD);
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    // 1000 USD invoice paid with 12.5 SOL at the simulated 80 USD/SOL rate
    let invoice = invoices.create(invoice_payload(dec!(1000), usd)).unwrap();
    let settled = processor
        .process_payment(payment(&invoice, dec!(12.5), sol, "tx-sol"))
        .await
        .expect("converted payment should settle");

    // The row keeps the rail's own denomination plus the USD leg
    assert_eq!(settled.amount, dec!(12.5));
    assert_eq!(settled.currency, sol);
    assert_eq!(settled.fiat_amount, Some(dec!(1000.00)));

    assert_eq!(
        invoices.get(invoice.id).unwrap().status,
        InvoiceStatus::Paid
    );
    assert_eq!(ledger.count(), 1);
}

// =========================================================================
// Refund and release
// =========================================================================

#[tokio::test]
async fn test_refund_mirrors_the_payment_row() {
    let (invoices, ledger, processor) = settlement_stack();
    let usd = Currency::Fiat(FiatCurrency::USD);
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    let invoice = invoices.create(invoice_payload(dec!(1000), usd)).unwrap();
    processor
        .process_payment(payment(&invoice, dec!(12.5), sol, "tx-pay"))
        .await
        .unwrap();

    let refund = processor
        .record_refund(RefundRequest {
            invoice_id: invoice.id,
            transaction_hash: "tx-refund".to_string(),
            memo: Some("customer dispute".to_string()),
        })
        .expect("refund should succeed");

    // Addresses swap, value legs carry over unchanged
    assert_eq!(refund.transaction_type, TransactionType::Refund);
    assert_eq!(refund.sender_address, MERCHANT);
    assert_eq!(refund.recipient_address, PAYER);
    assert_eq!(refund.amount, dec!(12.5));
    assert_eq!(refund.currency, sol);
    assert_eq!(refund.fiat_amount, Some(dec!(1000.00)));

    let refunded = invoices.get(invoice.id).unwrap();
    assert_eq!(refunded.status, InvoiceStatus::Refunded);
    assert!(refunded.paid_at.is_none());

    let rows = ledger.list(&TransactionFilter {
        invoice_id: Some(invoice.id),
        address: None,
    });
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_release_finalizes_without_new_rows() {
    let (invoices, ledger, processor) = settlement_stack();
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    let invoice = invoices.create(invoice_payload(dec!(250), sol)).unwrap();
    processor
        .process_payment(payment(&invoice, dec!(250), sol, "tx-pay"))
        .await
        .unwrap();

    let released = processor.release(invoice.id).expect("release should succeed");
    assert_eq!(released.status, InvoiceStatus::Released);
    assert!(released.paid_at.is_some());
    assert_eq!(ledger.count(), 1);

    // Terminal states accept no further lifecycle moves
    assert!(processor.release(invoice.id).is_err());
    assert!(processor
        .record_refund(RefundRequest {
            invoice_id: invoice.id,
            transaction_hash: "tx-late".to_string(),
            memo: None,
        })
        .is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refund_release_race_has_one_winner() {
    let (invoices, ledger, processor) = settlement_stack();
    let sol = Currency::Crypto(CryptoCurrency::SOL);

    let invoice = invoices.create(invoice_payload(dec!(250), sol)).unwrap();
    processor
        .process_payment(payment(&invoice, dec!(250), sol, "tx-pay"))
        .await
        .unwrap();

    let refund_processor = Arc::clone(&processor);
    let refund_id = invoice.id;
    let refund = tokio::task::spawn_blocking(move || {
        refund_processor.record_refund(RefundRequest {
            invoice_id: refund_id,
            transaction_hash: "tx-refund".to_string(),
            memo: None,
        })
    });

    let release_processor = Arc::clone(&processor);
    let release_id = invoice.id;
    let release = tokio::task::spawn_blocking(move || release_processor.release(release_id));

    let refund = refund.await.unwrap();
    let release = release.await.unwrap();

    assert!(
        refund.is_ok() != release.is_ok(),
        "exactly one of refund/release must win"
    );
    let final_status = invoices.get(invoice.id).unwrap().status;
    if refund.is_ok() {
        assert_eq!(final_status, InvoiceStatus::Refunded);
        assert_eq!(ledger.count(), 2);
    } else {
        assert_eq!(final_status, InvoiceStatus::Released);
        assert_eq!(ledger.count(), 1);
    }
}
