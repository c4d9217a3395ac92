use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::types::{DebtId, PaymentId, PaymentMethod, PaymentStatus, UserId};

/// input for recording a payment against a debt
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub debt_id: DebtId,
    pub amount: Money,
    pub payment_date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub description: Option<String>,
    pub receipt_ref: Option<String>,
    /// falls back to the debt's currency when absent
    pub currency: Option<String>,
    pub verification_notes: Option<String>,
}

impl PaymentRequest {
    pub fn new(debt_id: DebtId, amount: Money, payment_date: DateTime<Utc>, method: PaymentMethod) -> Self {
        Self {
            debt_id,
            amount,
            payment_date,
            method,
            description: None,
            receipt_ref: None,
            currency: None,
            verification_notes: None,
        }
    }
}

/// fields of a payment that may be edited while it is pending
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentPatch {
    pub amount: Option<Money>,
    pub payment_date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub receipt_ref: Option<String>,
}

/// one ledger entry against a debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub debt_id: DebtId,
    pub recorded_by: UserId,
    pub amount: Money,
    pub currency: String,
    pub payment_date: DateTime<Utc>,
    pub method: PaymentMethod,
    pub description: Option<String>,
    pub status: PaymentStatus,
    /// opaque reference into the external object store, never the bytes
    pub receipt_ref: Option<String>,
    pub verified_by: Option<UserId>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// record a new payment; the initial status comes from the perspective
    /// resolver, not from the caller's input
    pub fn record(
        recorded_by: UserId,
        request: PaymentRequest,
        fallback_currency: &str,
        initial_status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !request.amount.is_positive() {
            return Err(DebtError::InvalidAmount {
                amount: request.amount,
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            debt_id: request.debt_id,
            recorded_by,
            amount: request.amount,
            currency: request
                .currency
                .unwrap_or_else(|| fallback_currency.to_string()),
            payment_date: request.payment_date,
            method: request.method,
            description: request.description,
            status: initial_status,
            receipt_ref: request.receipt_ref,
            verified_by: None,
            verified_at: None,
            verification_notes: request.verification_notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// creditor confirms receipt: Pending -> Completed, terminal
    pub fn confirm(
        &mut self,
        verifier: UserId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Completed;
        self.verified_by = Some(verifier);
        self.verified_at = Some(now);
        if notes.is_some() {
            self.verification_notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }

    /// creditor disputes the payment: Pending -> Rejected, terminal
    pub fn reject(&mut self, verifier: UserId, reason: String, now: DateTime<Utc>) -> Result<()> {
        if reason.trim().is_empty() {
            return Err(DebtError::MissingRejectionReason);
        }
        self.ensure_pending()?;
        self.status = PaymentStatus::Rejected;
        self.verified_by = Some(verifier);
        self.verified_at = Some(now);
        self.verification_notes = Some(reason);
        self.updated_at = now;
        Ok(())
    }

    /// edit a pending payment in place
    ///
    /// completed and rejected entries are immutable; correcting one means
    /// deleting it and recording a replacement, so a verified ledger entry can
    /// never silently drift from what was confirmed. returns the receipt
    /// reference that was replaced, if any, so the caller can release it.
    pub fn apply_edit(&mut self, patch: PaymentPatch, now: DateTime<Utc>) -> Result<Option<String>> {
        self.ensure_pending()?;

        if let Some(amount) = patch.amount {
            if !amount.is_positive() {
                return Err(DebtError::InvalidAmount { amount });
            }
            self.amount = amount;
        }
        if let Some(date) = patch.payment_date {
            self.payment_date = date;
        }
        if let Some(method) = patch.method {
            self.method = method;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }

        let mut released = None;
        if let Some(receipt) = patch.receipt_ref {
            released = self.receipt_ref.take();
            self.receipt_ref = Some(receipt);
        }

        self.updated_at = now;
        Ok(released)
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(DebtError::PaymentAlreadyFinal {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }
}
