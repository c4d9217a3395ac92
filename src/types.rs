use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a debt
pub type DebtId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// unique identifier for a user account
pub type UserId = Uuid;

/// unique identifier for a shared contact identity
pub type ContactId = Uuid;

/// which party is the debtor, from the debt creator's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// the owner owes the contact
    OwnerOwes,
    /// the contact owes the owner
    OwnerIsOwed,
}

impl Orientation {
    /// the same obligation as seen from the other side
    pub fn invert(self) -> Self {
        match self {
            Orientation::OwnerOwes => Orientation::OwnerIsOwed,
            Orientation::OwnerIsOwed => Orientation::OwnerOwes,
        }
    }
}

/// role of a party within a resolved perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Debtor,
    Creditor,
}

/// debt lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    /// obligation open and not yet past due
    Active,
    /// unsettled and past the next due date
    Overdue,
    /// remaining balance reached zero
    Settled,
    /// closed by the owner without settling
    Archived,
}

/// payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// recorded by the debtor, awaiting the creditor's confirmation
    Pending,
    /// confirmed by the creditor, counts toward the paid total
    Completed,
    /// disputed by the creditor, retained for audit only
    Rejected,
}

impl PaymentStatus {
    /// completed and rejected are terminal, no transition leaves them
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Rejected)
    }
}

/// how a payment was made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Check,
    DigitalWallet,
    Other,
}

/// computed status of one schedule line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    /// not yet due, or due and still within its payment window
    Pending,
    /// fully covered by completed payments
    Paid,
    /// past due, uncovered, the following due date has not yet passed
    Overdue,
    /// past due and the following due date has also passed
    Missed,
}

/// one projected due-date/amount slot within a debt's plan
///
/// derived from the plan and the completed payments, never persisted as a
/// mutable entity of its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based position in the plan
    pub number: u32,
    pub due_date: DateTime<Utc>,
    /// scheduled amount of this slot
    pub amount: Money,
    /// still owed on this slot after overlaying completed payments
    pub amount_remaining: Money,
    pub status: InstallmentStatus,
}

/// which creation input is authoritative for schedule derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleBasis {
    /// payment count supplied, due date derived
    PaymentCount,
    /// due date supplied, payment count derived
    DueDate,
}

/// paid/remaining rollup for one debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub debt_id: DebtId,
    pub total_amount: Money,
    pub total_paid: Money,
    pub remaining: Money,
    pub percentage_paid: crate::decimal::Rate,
    pub completed_payment_count: usize,
}

/// one entry in the upcoming-payments view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub debt_id: DebtId,
    pub contact_name: String,
    pub orientation: Orientation,
    pub due_date: DateTime<Utc>,
    pub amount: Money,
    pub currency: String,
    pub description: Option<String>,
}
