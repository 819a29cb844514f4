use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// The lifecycle status of an invoice.
///
/// Stored statuses move strictly forward:
/// - Draft → Pending
/// - Pending → Paid
/// - Paid → Released
/// - Paid → Refunded
///
/// `Overdue` is a read-time view of a pending invoice past its due date.
/// It is never persisted and is never a legal transition source or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Invoice is being edited and is not yet payable.
    Draft,
    /// Invoice has been issued and awaits payment.
    Pending,
    /// Payment has been recorded.
    Paid,
    /// Funds have been released to the creator. Final state.
    Released,
    /// Payment has been refunded to the payer. Final state.
    Refunded,
    /// Derived only: pending and past the due date.
    Overdue,
}

impl InvoiceStatus {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    /// Whether a payment has been recorded against the invoice.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::Released)
    }

    /// Whether `target` is a legal next stored status.
    pub fn can_transition_to(&self, target: InvoiceStatus) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Pending)
                | (Self::Pending, Self::Paid)
                | (Self::Paid, Self::Released)
                | (Self::Paid, Self::Refunded)
        )
    }

    /// Parse from the lowercase wire form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "released" => Ok(Self::Released),
            "refunded" => Ok(Self::Refunded),
            "overdue" => Ok(Self::Overdue),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Released => write!(f, "released"),
            Self::Refunded => write!(f, "refunded"),
            Self::Overdue => write!(f, "overdue"),
        }
    }
}

/// Read-time status derivation. A stored `Pending` invoice whose due date
/// has passed reads as `Overdue`; the stored record is never rewritten.
pub fn derived_status(
    stored: InvoiceStatus,
    due_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> InvoiceStatus {
    match (stored, due_date) {
        (InvoiceStatus::Pending, Some(due)) if due < now => InvoiceStatus::Overdue,
        _ => stored,
    }
}

/// The kind of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Value moving from a payer toward an invoice creator or recipient.
    Payment,
    /// Value returned to the payer of a settled invoice.
    Refund,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payment => write!(f, "payment"),
            Self::Refund => write!(f, "refund"),
        }
    }
}

/// The outcome recorded for a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Submitted but not yet confirmed.
    Pending,
    /// Confirmed.
    Success,
    /// Failed on the underlying rail.
    Failed,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
