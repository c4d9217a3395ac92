pub mod calendar;
pub mod config;
pub mod contacts;
pub mod debt;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod payment;
pub mod perspective;
pub mod schedule;
pub mod types;

// re-export key types
pub use calendar::Frequency;
pub use config::LedgerConfig;
pub use contacts::{ContactDirectory, ContactRelation, InMemoryDirectory};
pub use debt::{Debt, DebtPatch, DebtRequest};
pub use decimal::{Money, Rate};
pub use errors::{DebtError, Result};
pub use events::{Event, EventStore};
pub use ledger::{DebtLedger, NullReceiptStore, ReceiptStore};
pub use payment::{Payment, PaymentPatch, PaymentRequest};
pub use perspective::EffectiveView;
pub use schedule::Plan;
pub use types::{
    ContactId, DebtId, DebtStatus, Installment, InstallmentStatus, Orientation, PartyRole,
    PaymentId, PaymentMethod, PaymentStatus, PaymentSummary, ScheduleBasis, UpcomingPayment,
    UserId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
