use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ContactId, DebtId, PaymentId, PaymentStatus, UserId};

#[derive(Error, Debug)]
pub enum DebtError {
    // validation, rejected before any mutation
    #[error("invalid amount: {amount}, must be positive")]
    InvalidAmount { amount: Money },

    #[error("invalid due date: {due_date} is not after {now}")]
    InvalidDueDate {
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("invalid payment count: {count}, must be positive")]
    InvalidPaymentCount { count: u32 },

    #[error("either a due date or a payment count must be provided")]
    MissingSchedule,

    #[error("schedule too long: {count} installments exceeds maximum {max}")]
    ScheduleTooLong { count: u32, max: u32 },

    #[error("a rejection requires a reason")]
    MissingRejectionReason,

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // unknown identifiers
    #[error("debt not found: {id}")]
    DebtNotFound { id: DebtId },

    #[error("payment not found: {id}")]
    PaymentNotFound { id: PaymentId },

    #[error("contact not found: {id}")]
    ContactNotFound { id: ContactId },

    // authorization
    #[error("user {actor} is neither the owner nor the contact of debt {debt_id}")]
    NotAParty { actor: UserId, debt_id: DebtId },

    #[error("user {actor} is not the creditor of debt {debt_id} and may not verify its payments")]
    NotCreditor { actor: UserId, debt_id: DebtId },

    #[error("user {actor} is not the owner of debt {debt_id}")]
    NotOwner { actor: UserId, debt_id: DebtId },

    // invalid state
    #[error("payment {id} is already {status:?} and cannot change")]
    PaymentAlreadyFinal { id: PaymentId, status: PaymentStatus },

    #[error("one-time debts have exactly one payment, got {count}")]
    OneTimeCountMismatch { count: u32 },

    #[error("debt {id} is archived")]
    DebtArchived { id: DebtId },

    // concurrency
    #[error("version conflict on debt {id}: expected {expected}, found {actual}")]
    VersionConflict {
        id: DebtId,
        expected: u64,
        actual: u64,
    },
}

pub type Result<T> = std::result::Result<T, DebtError>;
