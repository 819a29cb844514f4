//! Payment settlement pipeline.
//!
//! `process_payment` is the only path that moves an invoice to `paid`. The
//! store's compare-and-set transition is the serialization point: under
//! concurrent submissions exactly one caller wins and everyone else observes
//! `AlreadySettled`. The ledger row is appended only after the transition,
//! so a crash between the two leaves a paid invoice without a row, which is
//! recoverable from chain data by transaction hash.

use std::sync::Arc;

use finvo_core::{
    address, Currency, FiatCurrency, InvoiceId, InvoiceStatus, TransactionStatus, TransactionType,
};
use finvo_ledger::{
    Invoice, InvoiceStore, LedgerError, NewTransaction, Transaction, TransactionFilter,
    TransactionLedger,
};
use finvo_rates::{convert_with, CurrencyConverter};
use rust_decimal::Decimal;

use crate::error::SettlementError;
use crate::types::{DirectPayment, PaymentRequest, RefundRequest};

/// Settles invoices and records value transfers.
pub struct SettlementProcessor {
    store: Arc<InvoiceStore>,
    ledger: Arc<TransactionLedger>,
    converter: Arc<CurrencyConverter>,
    tolerance: Decimal,
}

impl SettlementProcessor {
    /// Create a processor with the default 0.5% shortfall tolerance.
    pub fn new(
        store: Arc<InvoiceStore>,
        ledger: Arc<TransactionLedger>,
        converter: Arc<CurrencyConverter>,
    ) -> Self {
        Self::with_tolerance(store, ledger, converter, Decimal::new(5, 3))
    }

    /// Create a processor with an explicit tolerance. The tolerance is the
    /// accepted relative shortfall: `0.005` accepts payments down to 99.5%
    /// of the invoice amount, covering conversion rounding.
    pub fn with_tolerance(
        store: Arc<InvoiceStore>,
        ledger: Arc<TransactionLedger>,
        converter: Arc<CurrencyConverter>,
        tolerance: Decimal,
    ) -> Self {
        Self {
            store,
            ledger,
            converter,
            tolerance,
        }
    }

    /// Settle an invoice with an observed payment.
    ///
    /// The payment may be denominated in any supported currency; a payment
    /// in another currency than the invoice is valued against the invoice
    /// currency from a single rate snapshot. Rate resolution is strict: if
    /// the feed cannot be reached the invoice is left untouched and the
    /// caller sees `Upstream`.
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<Transaction, SettlementError> {
        if !address::is_plausible(&request.payer_address) {
            return Err(SettlementError::Validation(format!(
                "implausible payer address: {}",
                request.payer_address
            )));
        }
        if request.amount <= Decimal::ZERO {
            return Err(SettlementError::Validation(format!(
                "payment amount must be positive, got {}",
                request.amount
            )));
        }
        if request.transaction_hash.trim().is_empty() {
            return Err(SettlementError::Validation(
                "transaction hash is required".into(),
            ));
        }

        let invoice = self.load(request.invoice_id)?;
        if invoice.status.is_settled() {
            return Err(SettlementError::AlreadySettled(invoice.id));
        }

        // Value the payment in the invoice currency. Same-currency payments
        // never touch the rate feed.
        let (effective, fiat_amount) = if request.currency == invoice.currency {
            let fiat = match invoice.currency {
                Currency::Fiat(FiatCurrency::USD) => Some(request.amount),
                _ => None,
            };
            (request.amount, fiat)
        } else {
            let snapshot = self
                .converter
                .snapshot_for(request.currency, invoice.currency)
                .await?;
            let effective =
                convert_with(&snapshot, request.amount, request.currency, invoice.currency)?;
            let fiat = convert_with(
                &snapshot,
                request.amount,
                request.currency,
                Currency::Fiat(FiatCurrency::USD),
            )
            .ok();
            (effective, fiat)
        };

        let floor = invoice.amount * (Decimal::ONE - self.tolerance);
        if effective < floor {
            return Err(SettlementError::AmountMismatch {
                expected: invoice.amount,
                received: effective,
                currency: invoice.currency,
            });
        }

        // The single serialization point: at most one caller moves the
        // invoice to paid, `paid_at` is stamped in the same critical section.
        let paid = self
            .store
            .transition(invoice.id, InvoiceStatus::Pending, InvoiceStatus::Paid)
            .map_err(|err| match err {
                LedgerError::Conflict { actual, .. } if actual.is_settled() => {
                    SettlementError::AlreadySettled(invoice.id)
                }
                LedgerError::Conflict { actual, .. } => SettlementError::NotPayable {
                    invoice_id: invoice.id,
                    status: actual,
                },
                LedgerError::InvoiceNotFound(id) => SettlementError::InvoiceNotFound(id),
                other => SettlementError::Internal(other.to_string()),
            })?;

        let recorded = self.ledger.append(NewTransaction {
            invoice_id: Some(paid.id),
            sender_address: request.payer_address,
            recipient_address: paid.recipient_address,
            amount: request.amount,
            currency: request.currency,
            fiat_amount,
            transaction_type: TransactionType::Payment,
            status: TransactionStatus::Success,
            transaction_hash: request.transaction_hash.clone(),
            memo: request.memo,
        });
        match recorded {
            Ok(transaction) => {
                tracing::info!(
                    invoice_id = %paid.id,
                    transaction_id = %transaction.id,
                    amount = %transaction.amount,
                    currency = %transaction.currency,
                    "invoice settled"
                );
                Ok(transaction)
            }
            Err(err) => {
                // The invoice is paid but the row is missing. Reconcilable
                // from chain data by the supplied hash.
                tracing::error!(
                    invoice_id = %paid.id,
                    transaction_hash = %request.transaction_hash,
                    error = %err,
                    "invoice marked paid but payment row not recorded"
                );
                Err(SettlementError::Internal(format!(
                    "invoice {} settled but the payment was not recorded: {err}",
                    paid.id
                )))
            }
        }
    }

    /// Record a payment that settles no invoice.
    pub fn record_direct(&self, payment: DirectPayment) -> Result<Transaction, SettlementError> {
        if !address::is_plausible(&payment.sender_address) {
            return Err(SettlementError::Validation(format!(
                "implausible sender address: {}",
                payment.sender_address
            )));
        }
        if !address::is_plausible(&payment.recipient_address) {
            return Err(SettlementError::Validation(format!(
                "implausible recipient address: {}",
                payment.recipient_address
            )));
        }
        if payment.amount <= Decimal::ZERO {
            return Err(SettlementError::Validation(format!(
                "payment amount must be positive, got {}",
                payment.amount
            )));
        }
        if payment.transaction_hash.trim().is_empty() {
            return Err(SettlementError::Validation(
                "transaction hash is required".into(),
            ));
        }

        self.ledger
            .append(NewTransaction {
                invoice_id: None,
                sender_address: payment.sender_address,
                recipient_address: payment.recipient_address,
                amount: payment.amount,
                currency: payment.currency,
                fiat_amount: payment.fiat_amount,
                transaction_type: TransactionType::Payment,
                status: TransactionStatus::Success,
                transaction_hash: payment.transaction_hash,
                memo: payment.memo,
            })
            .map_err(|err| match err {
                LedgerError::Validation(message) => SettlementError::Validation(message),
                other => SettlementError::Internal(other.to_string()),
            })
    }

    /// Refund a settled invoice in full.
    ///
    /// The refund row mirrors the recorded payment with the addresses
    /// swapped. The payment row is located before the status flips so a
    /// refund that cannot be completed never leaves the invoice half moved.
    pub fn record_refund(&self, refund: RefundRequest) -> Result<Transaction, SettlementError> {
        if refund.transaction_hash.trim().is_empty() {
            return Err(SettlementError::Validation(
                "transaction hash is required".into(),
            ));
        }

        let invoice = self.load(refund.invoice_id)?;
        if invoice.status != InvoiceStatus::Paid {
            return Err(SettlementError::InvalidState(format!(
                "invoice {} cannot be refunded from status {}",
                invoice.id, invoice.status
            )));
        }

        let payment = self
            .ledger
            .list(&TransactionFilter {
                invoice_id: Some(invoice.id),
                address: None,
            })
            .into_iter()
            .find(|transaction| {
                transaction.transaction_type == TransactionType::Payment
                    && transaction.status == TransactionStatus::Success
            })
            .ok_or_else(|| {
                SettlementError::InvalidState(format!(
                    "invoice {} has no recorded payment to refund",
                    invoice.id
                ))
            })?;

        let refunded = self
            .store
            .transition(invoice.id, InvoiceStatus::Paid, InvoiceStatus::Refunded)
            .map_err(|err| match err {
                LedgerError::Conflict { actual, .. } => SettlementError::InvalidState(format!(
                    "invoice {} cannot be refunded from status {actual}",
                    invoice.id
                )),
                LedgerError::InvoiceNotFound(id) => SettlementError::InvoiceNotFound(id),
                other => SettlementError::Internal(other.to_string()),
            })?;

        let recorded = self.ledger.append(NewTransaction {
            invoice_id: Some(refunded.id),
            sender_address: payment.recipient_address,
            recipient_address: payment.sender_address,
            amount: payment.amount,
            currency: payment.currency,
            fiat_amount: payment.fiat_amount,
            transaction_type: TransactionType::Refund,
            status: TransactionStatus::Success,
            transaction_hash: refund.transaction_hash.clone(),
            memo: refund.memo,
        });
        match recorded {
            Ok(transaction) => {
                tracing::info!(
                    invoice_id = %refunded.id,
                    transaction_id = %transaction.id,
                    amount = %transaction.amount,
                    currency = %transaction.currency,
                    "invoice refunded"
                );
                Ok(transaction)
            }
            Err(err) => {
                tracing::error!(
                    invoice_id = %refunded.id,
                    transaction_hash = %refund.transaction_hash,
                    error = %err,
                    "invoice marked refunded but refund row not recorded"
                );
                Err(SettlementError::Internal(format!(
                    "invoice {} refunded but the refund was not recorded: {err}",
                    refunded.id
                )))
            }
        }
    }

    /// Release a settled invoice out of escrow.
    pub fn release(&self, invoice_id: InvoiceId) -> Result<Invoice, SettlementError> {
        self.store
            .transition(invoice_id, InvoiceStatus::Paid, InvoiceStatus::Released)
            .map_err(|err| match err {
                LedgerError::Conflict { actual, .. } => SettlementError::InvalidState(format!(
                    "invoice {invoice_id} cannot be released from status {actual}"
                )),
                LedgerError::InvoiceNotFound(id) => SettlementError::InvoiceNotFound(id),
                other => SettlementError::Internal(other.to_string()),
            })
    }

    fn load(&self, invoice_id: InvoiceId) -> Result<Invoice, SettlementError> {
        self.store.stored(invoice_id).map_err(|err| match err {
            LedgerError::InvoiceNotFound(id) => SettlementError::InvoiceNotFound(id),
            other => SettlementError::Internal(other.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finvo_core::CryptoCurrency;
    use finvo_ledger::CreateInvoice;
    use finvo_rates::{PriceCache, SimulatedFeed};
    use rust_decimal_macros::dec;

    const PAYER: &str = "payer11111111111111111111111111111111111111";
    const MERCHANT: &str = "merch11111111111111111111111111111111111111";
    const HASH: &str = "5wHu1qwD4kF3TgYkAqkkrEUsL3mM5CcaXBS44fMkWrVg";

    fn sol() -> Currency {
        Currency::Crypto(CryptoCurrency::SOL)
    }

    fn usd() -> Currency {
        Currency::Fiat(FiatCurrency::USD)
    }

    struct Stack {
        store: Arc<InvoiceStore>,
        ledger: Arc<TransactionLedger>,
        feed: Arc<SimulatedFeed>,
        processor: SettlementProcessor,
    }

    fn stack() -> Stack {
        let store = Arc::new(InvoiceStore::new());
        let ledger = Arc::new(TransactionLedger::new(store.clone()));
        let feed = Arc::new(SimulatedFeed::new());
        let cache = Arc::new(PriceCache::with_default_ttl(feed.clone()));
        let converter = Arc::new(CurrencyConverter::new(cache));
        let processor = SettlementProcessor::new(store.clone(), ledger.clone(), converter);
        Stack {
            store,
            ledger,
            feed,
            processor,
        }
    }

    fn pending_invoice(store: &InvoiceStore, amount: Decimal, currency: Currency) -> Invoice {
        store
            .create(CreateInvoice {
                creator_id: "acct-1".to_string(),
                recipient_address: MERCHANT.to_string(),
                amount,
                currency,
                invoice_number: None,
                status: Some(InvoiceStatus::Pending),
                fiat_amount: None,
                description: None,
                due_date: None,
            })
            .unwrap()
    }

    fn payment_for(invoice: &Invoice) -> PaymentRequest {
        PaymentRequest {
            invoice_id: invoice.id,
            payer_address: PAYER.to_string(),
            amount: invoice.amount,
            currency: invoice.currency,
            transaction_hash: HASH.to_string(),
            memo: None,
        }
    }

    #[tokio::test]
    async fn test_settle_pending_invoice() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());

        let transaction = stack
            .processor
            .process_payment(payment_for(&invoice))
            .await
            .unwrap();

        assert_eq!(transaction.invoice_id, Some(invoice.id));
        assert_eq!(transaction.sender_address, PAYER);
        assert_eq!(transaction.recipient_address, MERCHANT);
        assert_eq!(transaction.amount, dec!(250));
        assert_eq!(transaction.status, TransactionStatus::Success);

        let settled = stack.store.stored(invoice.id).unwrap();
        assert_eq!(settled.status, InvoiceStatus::Paid);
        assert!(settled.paid_at.is_some());
    }

    #[tokio::test]
    async fn test_settle_is_idempotent_after_success() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());

        stack
            .processor
            .process_payment(payment_for(&invoice))
            .await
            .unwrap();
        let second = stack.processor.process_payment(payment_for(&invoice)).await;

        assert!(matches!(second, Err(SettlementError::AlreadySettled(_))));
        assert_eq!(stack.ledger.count(), 1);
    }

    #[tokio::test]
    async fn test_settle_unknown_invoice() {
        let stack = stack();
        let mut request = payment_for(&pending_invoice(&stack.store, dec!(1), sol()));
        request.invoice_id = InvoiceId::new();

        let result = stack.processor.process_payment(request).await;
        assert!(matches!(result, Err(SettlementError::InvoiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_settle_rejects_bad_input() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(10), sol());

        let mut bad_payer = payment_for(&invoice);
        bad_payer.payer_address = "short".to_string();
        assert!(matches!(
            stack.processor.process_payment(bad_payer).await,
            Err(SettlementError::Validation(_))
        ));

        let mut bad_amount = payment_for(&invoice);
        bad_amount.amount = dec!(0);
        assert!(matches!(
            stack.processor.process_payment(bad_amount).await,
            Err(SettlementError::Validation(_))
        ));

        let mut bad_hash = payment_for(&invoice);
        bad_hash.transaction_hash = "   ".to_string();
        assert!(matches!(
            stack.processor.process_payment(bad_hash).await,
            Err(SettlementError::Validation(_))
        ));

        assert_eq!(stack.ledger.count(), 0);
    }

    #[tokio::test]
    async fn test_settle_draft_invoice_not_payable() {
        let stack = stack();
        let invoice = stack
            .store
            .create(CreateInvoice {
                creator_id: "acct-1".to_string(),
                recipient_address: MERCHANT.to_string(),
                amount: dec!(10),
                currency: sol(),
                invoice_number: None,
                status: None,
                fiat_amount: None,
                description: None,
                due_date: None,
            })
            .unwrap();

        let result = stack.processor.process_payment(payment_for(&invoice)).await;
        assert!(matches!(
            result,
            Err(SettlementError::NotPayable {
                status: InvoiceStatus::Draft,
                ..
            })
        ));
        assert_eq!(
            stack.store.stored(invoice.id).unwrap().status,
            InvoiceStatus::Draft
        );
    }

    #[tokio::test]
    async fn test_settle_cross_currency() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(1000), usd());

        // 12.5 SOL at the simulated 80 USD rate covers the invoice exactly.
        let mut request = payment_for(&invoice);
        request.amount = dec!(12.5);
        request.currency = sol();

        let transaction = stack.processor.process_payment(request).await.unwrap();
        assert_eq!(transaction.amount, dec!(12.5));
        assert_eq!(transaction.currency, sol());
        assert_eq!(transaction.fiat_amount, Some(dec!(1000.00)));
        assert_eq!(
            stack.store.stored(invoice.id).unwrap().status,
            InvoiceStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_settle_underpayment_rejected() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(1000), usd());

        // 12 SOL is 960 USD, below the 995 USD tolerance floor.
        let mut request = payment_for(&invoice);
        request.amount = dec!(12);
        request.currency = sol();

        let result = stack.processor.process_payment(request).await;
        assert!(matches!(
            result,
            Err(SettlementError::AmountMismatch {
                expected,
                received,
                ..
            }) if expected == dec!(1000) && received == dec!(960.00)
        ));
        assert_eq!(
            stack.store.stored(invoice.id).unwrap().status,
            InvoiceStatus::Pending
        );
        assert_eq!(stack.ledger.count(), 0);
    }

    #[tokio::test]
    async fn test_settle_accepts_tolerance_floor() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(1000), usd());

        // 12.4375 SOL is exactly 995 USD, the floor at 0.5% tolerance.
        let mut request = payment_for(&invoice);
        request.amount = dec!(12.4375);
        request.currency = sol();

        stack.processor.process_payment(request).await.unwrap();
    }

    #[tokio::test]
    async fn test_settle_same_currency_underpayment_rejected() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(12.5), sol());

        let mut request = payment_for(&invoice);
        request.amount = dec!(11);

        let result = stack.processor.process_payment(request).await;
        assert!(matches!(result, Err(SettlementError::AmountMismatch { .. })));
    }

    #[tokio::test]
    async fn test_settle_feed_failure_leaves_invoice_pending() {
        let stack = stack();
        stack.feed.set_failing(true);
        let invoice = pending_invoice(&stack.store, dec!(1000), usd());

        let mut request = payment_for(&invoice);
        request.amount = dec!(12.5);
        request.currency = sol();

        let result = stack.processor.process_payment(request).await;
        assert!(matches!(result, Err(SettlementError::Upstream(_))));
        assert_eq!(
            stack.store.stored(invoice.id).unwrap().status,
            InvoiceStatus::Pending
        );
        assert_eq!(stack.ledger.count(), 0);
    }

    #[tokio::test]
    async fn test_settle_same_currency_skips_feed() {
        let stack = stack();
        stack.feed.set_failing(true);
        let invoice = pending_invoice(&stack.store, dec!(250), sol());

        stack
            .processor
            .process_payment(payment_for(&invoice))
            .await
            .unwrap();
        assert_eq!(stack.feed.fetch_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_settlements_single_winner() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());
        let processor = Arc::new(stack.processor);

        let mut handles = Vec::new();
        for attempt in 0..8 {
            let processor = processor.clone();
            let mut request = payment_for(&invoice);
            request.transaction_hash = format!("{HASH}{attempt}");
            handles.push(tokio::spawn(async move {
                processor.process_payment(request).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(SettlementError::AlreadySettled(_)) => {}
                Err(other) => panic!("unexpected settlement error: {other}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(stack.ledger.count(), 1);
        assert_eq!(
            stack.store.stored(invoice.id).unwrap().status,
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn test_record_direct_payment() {
        let stack = stack();
        let transaction = stack
            .processor
            .record_direct(DirectPayment {
                sender_address: PAYER.to_string(),
                recipient_address: MERCHANT.to_string(),
                amount: dec!(3.5),
                currency: sol(),
                fiat_amount: Some(dec!(280)),
                transaction_hash: HASH.to_string(),
                memo: Some("coffee".to_string()),
            })
            .unwrap();

        assert!(transaction.invoice_id.is_none());
        assert_eq!(transaction.fiat_amount, Some(dec!(280)));

        let bad = stack.processor.record_direct(DirectPayment {
            sender_address: "x".to_string(),
            recipient_address: MERCHANT.to_string(),
            amount: dec!(1),
            currency: sol(),
            fiat_amount: None,
            transaction_hash: HASH.to_string(),
            memo: None,
        });
        assert!(matches!(bad, Err(SettlementError::Validation(_))));
    }

    #[tokio::test]
    async fn test_refund_settled_invoice() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());
        stack
            .processor
            .process_payment(payment_for(&invoice))
            .await
            .unwrap();

        let refund = stack
            .processor
            .record_refund(RefundRequest {
                invoice_id: invoice.id,
                transaction_hash: format!("{HASH}refund"),
                memo: None,
            })
            .unwrap();

        assert_eq!(refund.transaction_type, TransactionType::Refund);
        assert_eq!(refund.sender_address, MERCHANT);
        assert_eq!(refund.recipient_address, PAYER);
        assert_eq!(refund.amount, dec!(250));
        assert_eq!(stack.ledger.count(), 2);

        let refunded = stack.store.stored(invoice.id).unwrap();
        assert_eq!(refunded.status, InvoiceStatus::Refunded);
        assert!(refunded.paid_at.is_none());
    }

    #[tokio::test]
    async fn test_refund_requires_paid_invoice() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());

        let result = stack.processor.record_refund(RefundRequest {
            invoice_id: invoice.id,
            transaction_hash: HASH.to_string(),
            memo: None,
        });
        assert!(matches!(result, Err(SettlementError::InvalidState(_))));

        stack
            .processor
            .process_payment(payment_for(&invoice))
            .await
            .unwrap();
        stack
            .processor
            .record_refund(RefundRequest {
                invoice_id: invoice.id,
                transaction_hash: HASH.to_string(),
                memo: None,
            })
            .unwrap();

        let again = stack.processor.record_refund(RefundRequest {
            invoice_id: invoice.id,
            transaction_hash: HASH.to_string(),
            memo: None,
        });
        assert!(matches!(again, Err(SettlementError::InvalidState(_))));
    }

    #[test]
    fn test_refund_without_recorded_payment() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());
        stack
            .store
            .transition(invoice.id, InvoiceStatus::Pending, InvoiceStatus::Paid)
            .unwrap();

        let result = stack.processor.record_refund(RefundRequest {
            invoice_id: invoice.id,
            transaction_hash: HASH.to_string(),
            memo: None,
        });
        assert!(matches!(result, Err(SettlementError::InvalidState(_))));
        assert_eq!(
            stack.store.stored(invoice.id).unwrap().status,
            InvoiceStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_release_settled_invoice() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());
        stack
            .processor
            .process_payment(payment_for(&invoice))
            .await
            .unwrap();

        let released = stack.processor.release(invoice.id).unwrap();
        assert_eq!(released.status, InvoiceStatus::Released);
        assert!(released.paid_at.is_some());
    }

    #[test]
    fn test_release_requires_paid_invoice() {
        let stack = stack();
        let invoice = pending_invoice(&stack.store, dec!(250), sol());

        let result = stack.processor.release(invoice.id);
        assert!(matches!(result, Err(SettlementError::InvalidState(_))));

        let missing = stack.processor.release(InvoiceId::new());
        assert!(matches!(missing, Err(SettlementError::InvoiceNotFound(_))));
    }
}
