//! HTTP API for the finvo node.
//!
//! REST endpoints for invoice lifecycle, payment settlement, currency
//! conversion, crypto prices, and the Solana demo flows.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use finvo_core::{address, CryptoCurrency, Currency, InvoiceId, InvoiceStatus};
use finvo_ledger::{
    CreateInvoice, Invoice, InvoiceFilter, InvoicePatch, LedgerError, Transaction,
    TransactionFilter,
};
use finvo_rates::{CryptoPrice, RateError};
use finvo_settlement::{DirectPayment, PaymentRequest, SettlementError};
use finvo_wallet::{SimulatedWalletAdapter, WalletAdapter, WalletBalanceView};

use crate::state::AppState;

// --- Request and response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    #[serde(default)]
    pub creator_id: Option<String>,
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    #[serde(flatten)]
    pub patch: InvoicePatch,
    /// Target status for a lifecycle transition.
    #[serde(default)]
    pub status: Option<InvoiceStatus>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTransactionRequest {
    /// Present: the payment settles this invoice. Absent: direct transfer.
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    pub sender_address: String,
    #[serde(default)]
    pub recipient_address: Option<String>,
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(default)]
    pub fiat_amount: Option<Decimal>,
    pub transaction_hash: String,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub amount: Decimal,
    pub from_currency: Currency,
    pub to_currency: Currency,
}

#[derive(Serialize)]
pub struct ConversionLeg {
    pub currency: Currency,
    pub amount: Decimal,
}

#[derive(Serialize)]
pub struct ConversionResponse {
    pub from: ConversionLeg,
    pub to: ConversionLeg,
}

#[derive(Deserialize)]
pub struct PricesQuery {
    #[serde(default)]
    pub update: Option<bool>,
}

#[derive(Deserialize)]
pub struct SolanaInvoiceRequest {
    /// Creator account. A plausible wallet address doubles as the payout
    /// address, anything else gets a deterministic simulated one.
    pub creator: String,
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct SolanaListQuery {
    #[serde(default)]
    pub creator: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolanaPaymentRequest {
    pub invoice_id: InvoiceId,
    #[serde(default)]
    pub payer_address: Option<String>,
    #[serde(default)]
    pub payer_secret: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Serialize)]
pub struct SolanaPaymentResponse {
    pub success: bool,
    pub invoice: Invoice,
}

// --- Error mapping ---

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn validation(message: impl Into<String>) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, message)
}

fn ledger_error(err: LedgerError) -> ApiError {
    let status = match &err {
        LedgerError::InvoiceNotFound(_) | LedgerError::TransactionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        LedgerError::DuplicateInvoiceNumber { .. }
        | LedgerError::InvalidTransition { .. }
        | LedgerError::Conflict { .. }
        | LedgerError::NotEditable { .. } => StatusCode::CONFLICT,
        LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
        LedgerError::InvariantViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn settlement_error(err: SettlementError) -> ApiError {
    let status = match &err {
        SettlementError::Validation(_) | SettlementError::AmountMismatch { .. } => {
            StatusCode::BAD_REQUEST
        }
        SettlementError::InvoiceNotFound(_) => StatusCode::NOT_FOUND,
        SettlementError::AlreadySettled(_)
        | SettlementError::NotPayable { .. }
        | SettlementError::InvalidState(_) => StatusCode::CONFLICT,
        SettlementError::Upstream(_) => StatusCode::BAD_GATEWAY,
        SettlementError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

fn rate_error(err: RateError) -> ApiError {
    let status = match &err {
        RateError::UnsupportedCurrency(_) => StatusCode::BAD_REQUEST,
        RateError::Upstream(_) => StatusCode::BAD_GATEWAY,
        RateError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

// --- Handlers ---

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

async fn handle_create_invoice(
    State(state): State<Arc<AppState>>,
    Json(mut payload): Json<CreateInvoice>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    if payload.fiat_amount.is_none() {
        payload.fiat_amount = state.usd_value(payload.amount, payload.currency).await;
    }
    let invoice = state.invoices.create(payload).map_err(ledger_error)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn handle_list_invoices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListInvoicesQuery>,
) -> Json<Vec<Invoice>> {
    Json(state.invoices.list(&InvoiceFilter {
        creator_id: query.creator_id,
        status: query.status,
    }))
}

async fn handle_get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<InvoiceId>,
) -> Result<Json<Invoice>, ApiError> {
    state.invoices.get(id).map(Json).map_err(ledger_error)
}

async fn handle_update_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<InvoiceId>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<Json<Invoice>, ApiError> {
    let UpdateInvoiceRequest { patch, status } = request;
    if patch.is_empty() && status.is_none() {
        return Err(validation("no fields to update"));
    }

    if !patch.is_empty() {
        state
            .invoices
            .update_fields(id, patch)
            .map_err(ledger_error)?;
    }

    if let Some(target) = status {
        let current = state.invoices.stored(id).map_err(ledger_error)?;
        if current.status != target {
            state
                .invoices
                .transition(id, current.status, target)
                .map_err(ledger_error)?;
        }
    }

    state.invoices.get(id).map(Json).map_err(ledger_error)
}

async fn handle_record_transaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecordTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let transaction = match request.invoice_id {
        Some(invoice_id) => state
            .processor
            .process_payment(PaymentRequest {
                invoice_id,
                payer_address: request.sender_address,
                amount: request.amount,
                currency: request.currency,
                transaction_hash: request.transaction_hash,
                memo: request.memo,
            })
            .await
            .map_err(settlement_error)?,
        None => {
            let recipient_address = request.recipient_address.ok_or_else(|| {
                validation("recipientAddress is required for direct payments")
            })?;
            state
                .processor
                .record_direct(DirectPayment {
                    sender_address: request.sender_address,
                    recipient_address,
                    amount: request.amount,
                    currency: request.currency,
                    fiat_amount: request.fiat_amount,
                    transaction_hash: request.transaction_hash,
                    memo: request.memo,
                })
                .map_err(settlement_error)?
        }
    };
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn handle_list_transactions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTransactionsQuery>,
) -> Json<Vec<Transaction>> {
    Json(state.ledger.list(&TransactionFilter {
        invoice_id: query.invoice_id,
        address: query.address,
    }))
}

async fn handle_convert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConversionResponse>, ApiError> {
    if request.amount.is_sign_negative() {
        return Err(validation(format!(
            "amount must not be negative, got {}",
            request.amount
        )));
    }

    let converted = state
        .converter
        .convert(request.amount, request.from_currency, request.to_currency)
        .await
        .map_err(rate_error)?;

    Ok(Json(ConversionResponse {
        from: ConversionLeg {
            currency: request.from_currency,
            amount: request.amount,
        },
        to: ConversionLeg {
            currency: request.to_currency,
            amount: converted,
        },
    }))
}

async fn handle_prices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PricesQuery>,
) -> Result<Json<Vec<CryptoPrice>>, ApiError> {
    state
        .prices
        .get_all(query.update.unwrap_or(false))
        .await
        .map(Json)
        .map_err(rate_error)
}

async fn handle_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<CryptoPrice>, ApiError> {
    let Some(parsed) = CryptoCurrency::from_code(&symbol.to_uppercase()) else {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            format!("unknown crypto symbol: {symbol}"),
        ));
    };
    state
        .prices
        .get(parsed, false)
        .await
        .map(Json)
        .map_err(rate_error)
}

async fn handle_wallet_balance(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> Json<WalletBalanceView> {
    Json(state.resolver.balance(&address).await)
}

async fn handle_solana_create_invoice(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SolanaInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    let sol = Currency::Crypto(CryptoCurrency::SOL);
    let recipient_address = if address::is_plausible(&request.creator) {
        request.creator.clone()
    } else {
        SimulatedWalletAdapter::derive_address(&request.creator)
    };
    let fiat_amount = state.usd_value(request.amount, sol).await;

    let invoice = state
        .invoices
        .create(CreateInvoice {
            creator_id: request.creator,
            recipient_address,
            amount: request.amount,
            currency: sol,
            invoice_number: None,
            status: Some(InvoiceStatus::Pending),
            fiat_amount,
            description: request.description,
            due_date: None,
        })
        .map_err(ledger_error)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn handle_solana_list_invoices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SolanaListQuery>,
) -> Json<Vec<Invoice>> {
    let mut invoices = state.invoices.list(&InvoiceFilter {
        creator_id: query.creator,
        status: None,
    });
    invoices.retain(|invoice| invoice.currency == Currency::Crypto(CryptoCurrency::SOL));
    Json(invoices)
}

async fn handle_solana_payment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SolanaPaymentRequest>,
) -> Result<Json<SolanaPaymentResponse>, ApiError> {
    let connected = match request.payer_secret.as_deref() {
        Some(secret) => Some(
            state
                .simulated_wallet
                .connect(secret)
                .await
                .map_err(|err| validation(err.to_string()))?,
        ),
        None => None,
    };
    let payer_address = match request.payer_address {
        Some(address) => address,
        None => connected
            .clone()
            .ok_or_else(|| validation("payerAddress or payerSecret is required"))?,
    };

    let invoice = state
        .invoices
        .stored(request.invoice_id)
        .map_err(ledger_error)?;

    // Without an explicit hash the connected wallet signs one over the
    // invoice id.
    let transaction_hash = match request.transaction_hash {
        Some(hash) => hash,
        None => {
            let signer = connected.as_deref().ok_or_else(|| {
                validation("transactionHash is required when paying by address")
            })?;
            let signature = state
                .simulated_wallet
                .sign_message(signer, invoice.id.as_uuid().as_bytes())
                .await
                .map_err(|err| validation(err.to_string()))?;
            bs58::encode(signature).into_string()
        }
    };

    state
        .processor
        .process_payment(PaymentRequest {
            invoice_id: invoice.id,
            payer_address,
            amount: invoice.amount,
            currency: invoice.currency,
            transaction_hash,
            memo: None,
        })
        .await
        .map_err(settlement_error)?;

    let invoice = state.invoices.get(invoice.id).map_err(ledger_error)?;
    Ok(Json(SolanaPaymentResponse {
        success: true,
        invoice,
    }))
}

// --- Server ---

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handle_health))
        .route(
            "/api/invoices",
            post(handle_create_invoice).get(handle_list_invoices),
        )
        .route(
            "/api/invoices/{id}",
            get(handle_get_invoice).patch(handle_update_invoice),
        )
        .route(
            "/api/transactions",
            post(handle_record_transaction).get(handle_list_transactions),
        )
        .route("/api/convert", post(handle_convert))
        .route("/api/crypto-prices", get(handle_prices))
        .route("/api/crypto-prices/{symbol}", get(handle_price))
        .route(
            "/api/solana/wallets/{address}/balance",
            get(handle_wallet_balance),
        )
        .route(
            "/api/solana/invoices",
            post(handle_solana_create_invoice).get(handle_solana_list_invoices),
        )
        .route("/api/solana/payment", post(handle_solana_payment))
        .with_state(state)
}

pub async fn start_api_server(
    listen_addr: SocketAddr,
    state: Arc<AppState>,
) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "HTTP API server started");
    axum::serve(listener, app).await?;
    Ok(())
}
