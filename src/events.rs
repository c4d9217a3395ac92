use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{DebtId, DebtStatus, PaymentId, PaymentStatus, UserId};

/// all events emitted by ledger operations
///
/// the notification dispatcher drains these after an operation returns and
/// decides independently what, if anything, to send; the engine never awaits
/// delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // debt lifecycle
    DebtCreated {
        debt_id: DebtId,
        owner_id: UserId,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },
    DebtEdited {
        debt_id: DebtId,
        edited_by: UserId,
        timestamp: DateTime<Utc>,
    },
    DebtStatusChanged {
        debt_id: DebtId,
        old_status: DebtStatus,
        new_status: DebtStatus,
        timestamp: DateTime<Utc>,
    },
    DebtSettled {
        debt_id: DebtId,
        total_paid: Money,
        timestamp: DateTime<Utc>,
    },
    DebtDeleted {
        debt_id: DebtId,
        deleted_by: UserId,
        payments_removed: usize,
        timestamp: DateTime<Utc>,
    },

    // payment lifecycle
    PaymentRecorded {
        debt_id: DebtId,
        payment_id: PaymentId,
        recorded_by: UserId,
        amount: Money,
        initial_status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
    PaymentVerified {
        debt_id: DebtId,
        payment_id: PaymentId,
        verified_by: UserId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        debt_id: DebtId,
        payment_id: PaymentId,
        rejected_by: UserId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    PaymentDeleted {
        debt_id: DebtId,
        payment_id: PaymentId,
        deleted_by: UserId,
        timestamp: DateTime<Utc>,
    },

    // object store bookkeeping
    ReceiptReleased {
        payment_id: PaymentId,
        reference: String,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
