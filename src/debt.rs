use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::Frequency;
use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::payment::Payment;
use crate::schedule::{self, Plan};
use crate::types::{ContactId, DebtId, DebtStatus, Orientation, PaymentStatus, ScheduleBasis, UserId};

/// input for creating a debt
#[derive(Debug, Clone, PartialEq)]
pub struct DebtRequest {
    pub contact_id: ContactId,
    pub orientation: Orientation,
    pub total_amount: Money,
    pub frequency: Frequency,
    /// exactly one of due_date / number_of_payments is authoritative
    pub due_date: Option<DateTime<Utc>>,
    pub number_of_payments: Option<u32>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
}

impl DebtRequest {
    pub fn new(
        contact_id: ContactId,
        orientation: Orientation,
        total_amount: Money,
        frequency: Frequency,
    ) -> Self {
        Self {
            contact_id,
            orientation,
            total_amount,
            frequency,
            due_date: None,
            number_of_payments: None,
            currency: None,
            description: None,
            notes: None,
        }
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_payment_count(mut self, count: u32) -> Self {
        self.number_of_payments = Some(count);
        self
    }
}

/// fields of a debt the owner may edit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebtPatch {
    pub total_amount: Option<Money>,
    pub currency: Option<String>,
    pub frequency: Option<Frequency>,
    pub due_date: Option<DateTime<Utc>>,
    pub number_of_payments: Option<u32>,
    pub description: Option<String>,
    pub notes: Option<String>,
    /// archive or un-archive without settling
    pub archived: Option<bool>,
}

/// one obligation between an owner and a counterparty contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    pub id: DebtId,
    pub owner_id: UserId,
    pub contact_id: ContactId,
    /// stored once from the creator's point of view
    pub orientation: Orientation,
    pub total_amount: Money,
    pub installment_amount: Money,
    pub amount_paid: Money,
    pub amount_remaining: Money,
    pub currency: String,
    pub status: DebtStatus,
    pub frequency: Frequency,
    pub number_of_payments: u32,
    pub schedule_basis: ScheduleBasis,
    pub due_date: DateTime<Utc>,
    pub next_due_date: DateTime<Utc>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// optimistic concurrency stamp, bumped on every accepted write
    pub version: u64,
}

impl Debt {
    /// validate and create a new debt, deriving the schedule fields from
    /// whichever of due date / payment count was supplied
    pub fn create(
        owner_id: UserId,
        request: DebtRequest,
        default_currency: &str,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !request.total_amount.is_positive() {
            return Err(DebtError::InvalidAmount {
                amount: request.total_amount,
            });
        }

        let (basis, count, due_date) = derive_schedule(
            request.frequency,
            request.due_date,
            request.number_of_payments,
            now,
        )?;

        if due_date <= now {
            return Err(DebtError::InvalidDueDate { due_date, now });
        }

        let installment_amount = schedule::split_installments(request.total_amount, count)[0];

        let mut debt = Self {
            id: Uuid::new_v4(),
            owner_id,
            contact_id: request.contact_id,
            orientation: request.orientation,
            total_amount: request.total_amount,
            installment_amount,
            amount_paid: Money::ZERO,
            amount_remaining: request.total_amount,
            currency: request
                .currency
                .unwrap_or_else(|| default_currency.to_string()),
            status: DebtStatus::Active,
            frequency: request.frequency,
            number_of_payments: count,
            schedule_basis: basis,
            due_date,
            next_due_date: due_date,
            description: request.description,
            notes: request.notes,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        debt.next_due_date = schedule::next_due_date(&debt.plan(), None);
        Ok(debt)
    }

    /// the schedule-relevant slice of this debt
    pub fn plan(&self) -> Plan {
        Plan {
            total_amount: self.total_amount,
            frequency: self.frequency,
            count: self.number_of_payments,
            created_at: self.created_at,
            due_date: self.due_date,
        }
    }

    /// recompute the aggregate from the payment set
    ///
    /// the single source of truth for paid/remaining/status/next due date,
    /// run after every mutation that touches this debt or its payments.
    /// archived debts keep their status but still track totals.
    pub fn recompute(&mut self, payments: &[Payment], now: DateTime<Utc>) {
        let amount_paid = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.amount)
            .fold(Money::ZERO, |acc, x| acc + x);
        let amount_remaining = (self.total_amount - amount_paid).max(Money::ZERO);

        let last_completed = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.payment_date)
            .max();
        let next_due_date = schedule::next_due_date(&self.plan(), last_completed);

        let status = if self.status == DebtStatus::Archived {
            DebtStatus::Archived
        } else if amount_remaining.is_zero() {
            DebtStatus::Settled
        } else if now > next_due_date {
            DebtStatus::Overdue
        } else {
            DebtStatus::Active
        };

        let changed = amount_paid != self.amount_paid
            || amount_remaining != self.amount_remaining
            || status != self.status
            || next_due_date != self.next_due_date;

        self.amount_paid = amount_paid;
        self.amount_remaining = amount_remaining;
        self.next_due_date = next_due_date;
        self.status = status;

        if changed {
            self.updated_at = now;
            self.version += 1;
        }
    }

    /// apply an owner edit, re-deriving the dependent schedule fields
    ///
    /// setting the payment count makes it authoritative and re-derives the
    /// due date; setting the due date does the converse. supplying both in
    /// one patch is ambiguous and refused. the edit is staged on a copy and
    /// committed only once every check has passed, so a rejected patch leaves
    /// the debt untouched. the caller recomputes afterwards.
    pub fn apply_edit(&mut self, patch: DebtPatch, now: DateTime<Utc>) -> Result<()> {
        if patch.due_date.is_some() && patch.number_of_payments.is_some() {
            return Err(DebtError::InvalidConfiguration {
                message: "due_date and number_of_payments cannot both be set in one edit"
                    .to_string(),
            });
        }

        let mut next = self.clone();

        if let Some(amount) = patch.total_amount {
            if !amount.is_positive() {
                return Err(DebtError::InvalidAmount { amount });
            }
            next.total_amount = amount;
        }
        if let Some(currency) = patch.currency {
            next.currency = currency;
        }
        if let Some(description) = patch.description {
            next.description = Some(description);
        }
        if let Some(notes) = patch.notes {
            next.notes = Some(notes);
        }
        if let Some(frequency) = patch.frequency {
            next.frequency = frequency;
        }

        if let Some(count) = patch.number_of_payments {
            if count == 0 {
                return Err(DebtError::InvalidPaymentCount { count });
            }
            if next.frequency.is_one_time() && count != 1 {
                return Err(DebtError::OneTimeCountMismatch { count });
            }
            next.number_of_payments = count;
            next.schedule_basis = ScheduleBasis::PaymentCount;
        }
        if let Some(due_date) = patch.due_date {
            if due_date <= now {
                return Err(DebtError::InvalidDueDate { due_date, now });
            }
            next.due_date = due_date;
            next.schedule_basis = ScheduleBasis::DueDate;
        }

        // re-derive the dependent schedule fields from the surviving basis
        if next.frequency.is_one_time() {
            next.number_of_payments = 1;
            next.installment_amount = next.total_amount;
        } else {
            match next.schedule_basis {
                ScheduleBasis::PaymentCount => {
                    next.due_date = schedule::due_date_from_count(
                        next.created_at,
                        next.frequency,
                        next.number_of_payments,
                    );
                }
                ScheduleBasis::DueDate => {
                    next.number_of_payments = schedule::count_from_due_date(
                        next.created_at,
                        next.due_date,
                        next.frequency,
                    )?;
                }
            }
            next.installment_amount =
                schedule::split_installments(next.total_amount, next.number_of_payments)[0];
        }

        if let Some(archived) = patch.archived {
            next.status = if archived {
                DebtStatus::Archived
            } else {
                DebtStatus::Active
            };
        }

        next.updated_at = now;
        next.version += 1;
        *self = next;
        Ok(())
    }
}

/// resolve which schedule input is authoritative and derive the other
fn derive_schedule(
    frequency: Frequency,
    due_date: Option<DateTime<Utc>>,
    count: Option<u32>,
    now: DateTime<Utc>,
) -> Result<(ScheduleBasis, u32, DateTime<Utc>)> {
    if frequency.is_one_time() {
        // a lump sum needs an explicit due date and exactly one payment
        if let Some(count) = count {
            if count != 1 {
                return Err(DebtError::OneTimeCountMismatch { count });
            }
        }
        let due_date = due_date.ok_or(DebtError::MissingSchedule)?;
        return Ok((ScheduleBasis::DueDate, 1, due_date));
    }

    match (count, due_date) {
        (Some(count), _) => {
            if count == 0 {
                return Err(DebtError::InvalidPaymentCount { count });
            }
            let due_date = schedule::due_date_from_count(now, frequency, count);
            Ok((ScheduleBasis::PaymentCount, count, due_date))
        }
        (None, Some(due_date)) => {
            let count = schedule::count_from_due_date(now, due_date, frequency)?;
            Ok((ScheduleBasis::DueDate, count, due_date))
        }
        (None, None) => Err(DebtError::MissingSchedule),
    }
}
