use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use finvo_core::{derived_status, InvoiceId, InvoiceStatus};

use crate::error::LedgerError;
use crate::invoice::{CreateInvoice, Invoice, InvoiceFilter, InvoicePatch};

/// In-memory invoice repository.
///
/// Each invoice lives under its own map entry, so status transitions on
/// different invoices never contend with each other. A transition holds the
/// entry lock for the whole compare-and-set, which is what makes concurrent
/// settlement of the same invoice resolve to exactly one winner.
pub struct InvoiceStore {
    invoices: DashMap<InvoiceId, Invoice>,
    /// Uniqueness index: (creator_id, invoice_number) -> invoice.
    numbers: DashMap<(String, String), InvoiceId>,
    /// Per-creator sequence feeding generated invoice numbers.
    sequences: DashMap<String, u64>,
}

impl InvoiceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            invoices: DashMap::new(),
            numbers: DashMap::new(),
            sequences: DashMap::new(),
        }
    }

    /// Create a new invoice.
    ///
    /// The initial status must be draft or pending; invoices can never be
    /// born settled. An explicit invoice number is checked against the
    /// per-creator uniqueness index, otherwise the next `INV-<n>` number is
    /// generated.
    pub fn create(&self, payload: CreateInvoice) -> Result<Invoice, LedgerError> {
        if payload.creator_id.trim().is_empty() {
            return Err(LedgerError::Validation("creator id is required".into()));
        }
        if payload.recipient_address.trim().is_empty() {
            return Err(LedgerError::Validation(
                "recipient address is required".into(),
            ));
        }
        if payload.amount.is_sign_negative() {
            return Err(LedgerError::Validation(format!(
                "amount must not be negative, got {}",
                payload.amount
            )));
        }

        let status = match payload.status {
            None => InvoiceStatus::Draft,
            Some(s @ (InvoiceStatus::Draft | InvoiceStatus::Pending)) => s,
            Some(other) => {
                return Err(LedgerError::Validation(format!(
                    "invoice cannot be created in status {}",
                    other
                )));
            }
        };

        let invoice_number = match payload.invoice_number {
            Some(number) if !number.trim().is_empty() => number,
            _ => self.next_number(&payload.creator_id),
        };

        let id = InvoiceId::new();
        match self
            .numbers
            .entry((payload.creator_id.clone(), invoice_number.clone()))
        {
            Entry::Occupied(_) => {
                return Err(LedgerError::DuplicateInvoiceNumber {
                    creator_id: payload.creator_id,
                    number: invoice_number,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let invoice = Invoice {
            id,
            invoice_number,
            creator_id: payload.creator_id,
            recipient_address: payload.recipient_address,
            amount: payload.amount,
            currency: payload.currency,
            fiat_amount: payload.fiat_amount,
            status,
            description: payload.description,
            due_date: payload.due_date,
            created_at: Utc::now(),
            paid_at: None,
        };
        self.invoices.insert(id, invoice.clone());

        tracing::info!(
            invoice_id = %id,
            invoice_number = %invoice.invoice_number,
            creator_id = %invoice.creator_id,
            status = %status,
            "invoice created"
        );
        Ok(invoice)
    }

    /// Get an invoice as seen at read time, with a pending invoice past its
    /// due date reported as overdue.
    pub fn get(&self, id: InvoiceId) -> Result<Invoice, LedgerError> {
        let mut invoice = self.stored(id)?;
        invoice.status = derived_status(invoice.status, invoice.due_date, Utc::now());
        Ok(invoice)
    }

    /// Get the stored record without read-time derivation.
    pub fn stored(&self, id: InvoiceId) -> Result<Invoice, LedgerError> {
        self.invoices
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or(LedgerError::InvoiceNotFound(id))
    }

    /// List invoices matching the filter, ordered by creation time.
    ///
    /// The status filter matches the derived read-time status, so
    /// `status = overdue` finds pending invoices past their due date.
    pub fn list(&self, filter: &InvoiceFilter) -> Vec<Invoice> {
        let now = Utc::now();
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .map(|entry| {
                let mut invoice = entry.clone();
                invoice.status = derived_status(invoice.status, invoice.due_date, now);
                invoice
            })
            .filter(|invoice| {
                filter
                    .creator_id
                    .as_ref()
                    .map_or(true, |creator| &invoice.creator_id == creator)
                    && filter
                        .status
                        .map_or(true, |status| invoice.status == status)
            })
            .collect();
        invoices.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.0.cmp(&b.id.0)));
        invoices
    }

    /// Compare-and-set status transition.
    ///
    /// An illegal edge fails with `InvalidTransition` before the record is
    /// even looked at. A legal edge whose expected `from` no longer matches
    /// the stored status fails with `Conflict`. Entering paid stamps
    /// `paid_at`; entering refunded clears it, inside the same entry lock.
    pub fn transition(
        &self,
        id: InvoiceId,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Invoice, LedgerError> {
        if !from.can_transition_to(to) {
            return Err(LedgerError::InvalidTransition { from, to });
        }

        let mut entry = self
            .invoices
            .get_mut(&id)
            .ok_or(LedgerError::InvoiceNotFound(id))?;
        let invoice = entry.value_mut();

        if invoice.status != from {
            return Err(LedgerError::Conflict {
                expected: from,
                actual: invoice.status,
            });
        }

        invoice.status = to;
        match to {
            InvoiceStatus::Paid => invoice.paid_at = Some(Utc::now()),
            InvoiceStatus::Refunded => invoice.paid_at = None,
            _ => {}
        }

        tracing::info!(
            invoice_id = %id,
            from = %from,
            to = %to,
            "invoice status transition"
        );
        Ok(invoice.clone())
    }

    /// Apply field edits.
    ///
    /// Commercial terms (amount, currency, recipient) are frozen once the
    /// invoice leaves draft; due date and description stay editable until a
    /// final state.
    pub fn update_fields(
        &self,
        id: InvoiceId,
        patch: InvoicePatch,
    ) -> Result<Invoice, LedgerError> {
        if let Some(amount) = patch.amount {
            if amount.is_sign_negative() {
                return Err(LedgerError::Validation(format!(
                    "amount must not be negative, got {}",
                    amount
                )));
            }
        }

        let mut entry = self
            .invoices
            .get_mut(&id)
            .ok_or(LedgerError::InvoiceNotFound(id))?;
        let invoice = entry.value_mut();

        if patch.touches_terms() && invoice.status != InvoiceStatus::Draft {
            return Err(LedgerError::NotEditable {
                status: invoice.status,
            });
        }
        if invoice.status.is_final() && !patch.is_empty() {
            return Err(LedgerError::NotEditable {
                status: invoice.status,
            });
        }

        if let Some(amount) = patch.amount {
            invoice.amount = amount;
        }
        if let Some(currency) = patch.currency {
            invoice.currency = currency;
        }
        if let Some(recipient) = patch.recipient_address {
            invoice.recipient_address = recipient;
        }
        if let Some(description) = patch.description {
            invoice.description = Some(description);
        }
        if let Some(due_date) = patch.due_date {
            invoice.due_date = Some(due_date);
        }

        tracing::debug!(invoice_id = %id, "invoice fields updated");
        Ok(invoice.clone())
    }

    /// Number of stored invoices.
    pub fn count(&self) -> usize {
        self.invoices.len()
    }

    fn next_number(&self, creator_id: &str) -> String {
        loop {
            let seq = {
                let mut entry = self.sequences.entry(creator_id.to_string()).or_insert(0);
                *entry += 1;
                *entry
            };
            let number = format!("INV-{:04}", seq);
            // Skip over numbers already claimed explicitly by the client.
            if !self
                .numbers
                .contains_key(&(creator_id.to_string(), number.clone()))
            {
                return number;
            }
        }
    }
}

impl Default for InvoiceStore {
    fn default() -> Self {
        Self::new()
    }
}
