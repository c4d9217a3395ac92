use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use tracing::warn;

use crate::config::LedgerConfig;
use crate::contacts::ContactDirectory;
use crate::debt::{Debt, DebtPatch, DebtRequest};
use crate::decimal::Rate;
use crate::errors::{DebtError, Result};
use crate::events::{Event, EventStore};
use crate::payment::{Payment, PaymentPatch, PaymentRequest};
use crate::perspective::{self, EffectiveView};
use crate::schedule;
use crate::types::{
    DebtId, DebtStatus, Installment, PartyRole, PaymentId, PaymentStatus, PaymentSummary,
    UpcomingPayment, UserId,
};

/// object store boundary for receipt images
///
/// the engine only stores and forwards opaque references, never the bytes.
/// deletion is best-effort: failures are logged and never fail the primary
/// mutation.
pub trait ReceiptStore {
    fn delete_receipt(
        &mut self,
        reference: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// receipt store that discards everything
#[derive(Debug, Default)]
pub struct NullReceiptStore;

impl ReceiptStore for NullReceiptStore {
    fn delete_receipt(
        &mut self,
        _reference: &str,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// one debt and its payment ledger, always mutated together
#[derive(Debug)]
struct DebtRecord {
    debt: Debt,
    payments: Vec<Payment>,
}

/// the debt ledger engine
///
/// request-scoped and synchronous: every operation reads the current debt and
/// payment state, computes, and writes back before returning. operations on
/// the same debt are serialized by `&mut self`; the `version` stamp carries
/// the optimistic check for callers that reload between read and write.
pub struct DebtLedger<D: ContactDirectory, R: ReceiptStore> {
    config: LedgerConfig,
    directory: D,
    receipts: R,
    records: HashMap<DebtId, DebtRecord>,
    events: EventStore,
}

impl<D: ContactDirectory, R: ReceiptStore> DebtLedger<D, R> {
    pub fn new(config: LedgerConfig, directory: D, receipts: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            directory,
            receipts,
            records: HashMap::new(),
            events: EventStore::new(),
        })
    }

    /// create a debt owned by `owner` against one of their contacts
    pub fn create_debt(
        &mut self,
        owner: UserId,
        request: DebtRequest,
        time: &SafeTimeProvider,
    ) -> Result<&Debt> {
        let now = time.now();
        if self.directory.relation(owner, request.contact_id).is_none() {
            return Err(DebtError::ContactNotFound {
                id: request.contact_id,
            });
        }

        let debt = Debt::create(owner, request, &self.config.default_currency, now)?;
        self.check_installment_bound(&debt)?;

        let id = debt.id;
        self.events.emit(Event::DebtCreated {
            debt_id: id,
            owner_id: owner,
            total_amount: debt.total_amount,
            timestamp: now,
        });
        self.records.insert(
            id,
            DebtRecord {
                debt,
                payments: Vec::new(),
            },
        );
        Ok(&self.records[&id].debt)
    }

    /// record a payment against a debt
    ///
    /// the initial status comes from the actor's resolved perspective: a
    /// debtor's payment starts pending, a creditor's starts completed
    pub fn record_payment(
        &mut self,
        actor: UserId,
        request: PaymentRequest,
        time: &SafeTimeProvider,
    ) -> Result<&Payment> {
        let now = time.now();
        let debt_id = request.debt_id;
        let record = self
            .records
            .get_mut(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        let view = resolve_actor(&self.directory, &record.debt, actor)?;

        if record.debt.status == DebtStatus::Archived {
            return Err(DebtError::DebtArchived { id: debt_id });
        }

        let initial_status = perspective::initial_payment_status(view.actor_role);
        let payment = Payment::record(actor, request, &record.debt.currency, initial_status, now)?;

        self.events.emit(Event::PaymentRecorded {
            debt_id,
            payment_id: payment.id,
            recorded_by: actor,
            amount: payment.amount,
            initial_status,
            timestamp: now,
        });

        record.payments.push(payment);
        let idx = record.payments.len() - 1;
        run_recompute(&mut record.debt, &record.payments, now, &mut self.events);
        Ok(&record.payments[idx])
    }

    /// creditor confirms a pending payment
    pub fn verify_payment(
        &mut self,
        actor: UserId,
        payment_id: PaymentId,
        notes: Option<String>,
        time: &SafeTimeProvider,
    ) -> Result<&Payment> {
        let now = time.now();
        let debt_id = self.debt_id_of_payment(payment_id)?;
        let record = self
            .records
            .get_mut(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;

        let view = resolve_actor(&self.directory, &record.debt, actor)?;
        if view.actor_role != PartyRole::Creditor {
            return Err(DebtError::NotCreditor { actor, debt_id });
        }

        let idx = payment_index(&record.payments, payment_id)?;
        record.payments[idx].confirm(actor, notes, now)?;

        self.events.emit(Event::PaymentVerified {
            debt_id,
            payment_id,
            verified_by: actor,
            amount: record.payments[idx].amount,
            timestamp: now,
        });
        run_recompute(&mut record.debt, &record.payments, now, &mut self.events);
        Ok(&record.payments[idx])
    }

    /// creditor disputes a pending payment; the entry stays for audit
    pub fn reject_payment(
        &mut self,
        actor: UserId,
        payment_id: PaymentId,
        reason: String,
        time: &SafeTimeProvider,
    ) -> Result<&Payment> {
        let now = time.now();
        let debt_id = self.debt_id_of_payment(payment_id)?;
        let record = self
            .records
            .get_mut(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;

        let view = resolve_actor(&self.directory, &record.debt, actor)?;
        if view.actor_role != PartyRole::Creditor {
            return Err(DebtError::NotCreditor { actor, debt_id });
        }

        let idx = payment_index(&record.payments, payment_id)?;
        record.payments[idx].reject(actor, reason.clone(), now)?;

        self.events.emit(Event::PaymentRejected {
            debt_id,
            payment_id,
            rejected_by: actor,
            reason,
            timestamp: now,
        });
        run_recompute(&mut record.debt, &record.payments, now, &mut self.events);
        Ok(&record.payments[idx])
    }

    /// owner edit of debt fields, re-deriving the schedule
    ///
    /// `expected_version` carries the optimistic concurrency check for
    /// callers that read the debt earlier in their own transaction
    pub fn edit_debt(
        &mut self,
        actor: UserId,
        debt_id: DebtId,
        patch: DebtPatch,
        expected_version: Option<u64>,
        time: &SafeTimeProvider,
    ) -> Result<&Debt> {
        let now = time.now();
        let record = self
            .records
            .get_mut(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;

        if record.debt.owner_id != actor {
            resolve_actor(&self.directory, &record.debt, actor)?;
            return Err(DebtError::NotOwner { actor, debt_id });
        }
        if let Some(expected) = expected_version {
            if expected != record.debt.version {
                return Err(DebtError::VersionConflict {
                    id: debt_id,
                    expected,
                    actual: record.debt.version,
                });
            }
        }

        // stage the edit and commit only after every check passes, so a
        // refused patch leaves the stored debt untouched
        let mut edited = record.debt.clone();
        edited.apply_edit(patch, now)?;
        let bound = self.config.max_installments;
        if edited.number_of_payments > bound {
            return Err(DebtError::ScheduleTooLong {
                count: edited.number_of_payments,
                max: bound,
            });
        }
        record.debt = edited;

        self.events.emit(Event::DebtEdited {
            debt_id,
            edited_by: actor,
            timestamp: now,
        });
        run_recompute(&mut record.debt, &record.payments, now, &mut self.events);
        Ok(&record.debt)
    }

    /// edit a pending payment; a replaced receipt is released best-effort
    ///
    /// like deletion, allowed for the debt owner and the party that recorded
    /// the entry
    pub fn edit_payment(
        &mut self,
        actor: UserId,
        payment_id: PaymentId,
        patch: PaymentPatch,
        time: &SafeTimeProvider,
    ) -> Result<&Payment> {
        let now = time.now();
        let debt_id = self.debt_id_of_payment(payment_id)?;
        let record = self
            .records
            .get_mut(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        resolve_actor(&self.directory, &record.debt, actor)?;

        let idx = payment_index(&record.payments, payment_id)?;
        if actor != record.debt.owner_id && actor != record.payments[idx].recorded_by {
            return Err(DebtError::NotOwner { actor, debt_id });
        }
        let released = record.payments[idx].apply_edit(patch, now)?;
        if let Some(reference) = released {
            release_receipt(
                &mut self.receipts,
                payment_id,
                &reference,
                now,
                &mut self.events,
            );
        }

        run_recompute(&mut record.debt, &record.payments, now, &mut self.events);
        Ok(&record.payments[idx])
    }

    /// remove a payment and recompute the owning debt
    ///
    /// allowed for the debt owner and for the party that recorded the entry
    pub fn delete_payment(
        &mut self,
        actor: UserId,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let now = time.now();
        let debt_id = self.debt_id_of_payment(payment_id)?;
        let record = self
            .records
            .get_mut(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        resolve_actor(&self.directory, &record.debt, actor)?;

        let idx = payment_index(&record.payments, payment_id)?;
        if actor != record.debt.owner_id && actor != record.payments[idx].recorded_by {
            return Err(DebtError::NotOwner { actor, debt_id });
        }

        let payment = record.payments.remove(idx);
        if let Some(ref reference) = payment.receipt_ref {
            release_receipt(
                &mut self.receipts,
                payment.id,
                reference,
                now,
                &mut self.events,
            );
        }

        self.events.emit(Event::PaymentDeleted {
            debt_id,
            payment_id,
            deleted_by: actor,
            timestamp: now,
        });
        run_recompute(&mut record.debt, &record.payments, now, &mut self.events);
        Ok(())
    }

    /// owner-exclusive delete of a debt and all its payments
    pub fn delete_debt(
        &mut self,
        actor: UserId,
        debt_id: DebtId,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let now = time.now();
        {
            let record = self
                .records
                .get(&debt_id)
                .ok_or(DebtError::DebtNotFound { id: debt_id })?;
            if record.debt.owner_id != actor {
                resolve_actor(&self.directory, &record.debt, actor)?;
                return Err(DebtError::NotOwner { actor, debt_id });
            }
        }

        let record = self
            .records
            .remove(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        for payment in &record.payments {
            if let Some(ref reference) = payment.receipt_ref {
                release_receipt(
                    &mut self.receipts,
                    payment.id,
                    reference,
                    now,
                    &mut self.events,
                );
            }
        }

        self.events.emit(Event::DebtDeleted {
            debt_id,
            deleted_by: actor,
            payments_removed: record.payments.len(),
            timestamp: now,
        });
        Ok(())
    }

    /// the projected schedule with actual payments overlaid
    pub fn schedule(
        &self,
        actor: UserId,
        debt_id: DebtId,
        time: &SafeTimeProvider,
    ) -> Result<Vec<Installment>> {
        let record = self
            .records
            .get(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        resolve_actor(&self.directory, &record.debt, actor)?;
        Ok(schedule::overlay(
            &record.debt.plan(),
            &record.payments,
            time.now(),
        ))
    }

    /// one debt, projected into the actor's perspective
    pub fn debt(&self, actor: UserId, debt_id: DebtId) -> Result<(&Debt, EffectiveView)> {
        let record = self
            .records
            .get(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        let view = resolve_actor(&self.directory, &record.debt, actor)?;
        Ok((&record.debt, view))
    }

    /// every debt the actor is a party to, owned or as counterparty
    pub fn debts_for(&self, actor: UserId) -> Vec<(&Debt, EffectiveView)> {
        self.records
            .values()
            .filter_map(|record| {
                resolve_actor(&self.directory, &record.debt, actor)
                    .ok()
                    .map(|view| (&record.debt, view))
            })
            .collect()
    }

    /// payments recorded against one debt
    pub fn payments(&self, actor: UserId, debt_id: DebtId) -> Result<&[Payment]> {
        let record = self
            .records
            .get(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        resolve_actor(&self.directory, &record.debt, actor)?;
        Ok(&record.payments)
    }

    /// paid/remaining rollup for one debt
    pub fn payment_summary(&self, actor: UserId, debt_id: DebtId) -> Result<PaymentSummary> {
        let record = self
            .records
            .get(&debt_id)
            .ok_or(DebtError::DebtNotFound { id: debt_id })?;
        resolve_actor(&self.directory, &record.debt, actor)?;

        let completed = record
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .count();
        Ok(PaymentSummary {
            debt_id,
            total_amount: record.debt.total_amount,
            total_paid: record.debt.amount_paid,
            remaining: record.debt.amount_remaining,
            percentage_paid: Rate::from_ratio(record.debt.amount_paid, record.debt.total_amount),
            completed_payment_count: completed,
        })
    }

    /// pending payments awaiting this actor's confirmation
    pub fn pending_verifications(&self, actor: UserId) -> Vec<&Payment> {
        self.records
            .values()
            .filter(|record| {
                resolve_actor(&self.directory, &record.debt, actor)
                    .map(|view| view.actor_role == PartyRole::Creditor)
                    .unwrap_or(false)
            })
            .flat_map(|record| {
                record
                    .payments
                    .iter()
                    .filter(|p| p.status == PaymentStatus::Pending)
            })
            .collect()
    }

    /// debts of this actor currently past due
    pub fn overdue_debts(&self, actor: UserId) -> Vec<(&Debt, EffectiveView)> {
        self.debts_for(actor)
            .into_iter()
            .filter(|(debt, _)| debt.status == DebtStatus::Overdue)
            .collect()
    }

    /// installments falling due on the actor's owned debts within the window
    pub fn upcoming_payments(
        &self,
        actor: UserId,
        days: Option<u32>,
        time: &SafeTimeProvider,
    ) -> Vec<UpcomingPayment> {
        let now = time.now();
        let window = days.unwrap_or(self.config.due_soon_window_days);
        let cutoff = now + Duration::days(window as i64);

        self.records
            .values()
            .filter(|record| record.debt.owner_id == actor)
            .filter(|record| {
                matches!(record.debt.status, DebtStatus::Active | DebtStatus::Overdue)
            })
            .filter(|record| {
                record.debt.next_due_date > now && record.debt.next_due_date < cutoff
            })
            .map(|record| UpcomingPayment {
                debt_id: record.debt.id,
                contact_name: self
                    .directory
                    .relation(actor, record.debt.contact_id)
                    .map(|c| c.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                orientation: record.debt.orientation,
                due_date: record.debt.next_due_date,
                amount: record.debt.installment_amount,
                currency: record.debt.currency.clone(),
                description: record.debt.description.clone(),
            })
            .collect()
    }

    /// the daily pass: recompute every debt against the current time
    pub fn refresh_statuses(&mut self, time: &SafeTimeProvider) {
        let now = time.now();
        for record in self.records.values_mut() {
            run_recompute(&mut record.debt, &record.payments, now, &mut self.events);
        }
    }

    /// drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// events emitted and not yet drained
    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn receipt_store(&self) -> &R {
        &self.receipts
    }

    fn check_installment_bound(&self, debt: &Debt) -> Result<()> {
        if debt.number_of_payments > self.config.max_installments {
            return Err(DebtError::ScheduleTooLong {
                count: debt.number_of_payments,
                max: self.config.max_installments,
            });
        }
        Ok(())
    }

    fn debt_id_of_payment(&self, payment_id: PaymentId) -> Result<DebtId> {
        self.records
            .values()
            .find(|record| record.payments.iter().any(|p| p.id == payment_id))
            .map(|record| record.debt.id)
            .ok_or(DebtError::PaymentNotFound { id: payment_id })
    }
}

/// resolve which side of the debt the actor stands on
fn resolve_actor<D: ContactDirectory>(
    directory: &D,
    debt: &Debt,
    actor: UserId,
) -> Result<EffectiveView> {
    if actor == debt.owner_id {
        Ok(perspective::resolve(debt, true))
    } else if directory.user_for_contact(debt.contact_id) == Some(actor) {
        Ok(perspective::resolve(debt, false))
    } else {
        Err(DebtError::NotAParty {
            actor,
            debt_id: debt.id,
        })
    }
}

fn payment_index(payments: &[Payment], payment_id: PaymentId) -> Result<usize> {
    payments
        .iter()
        .position(|p| p.id == payment_id)
        .ok_or(DebtError::PaymentNotFound { id: payment_id })
}

/// the single recompute entry point for every mutating operation
fn run_recompute(debt: &mut Debt, payments: &[Payment], now: DateTime<Utc>, events: &mut EventStore) {
    let old_status = debt.status;
    debt.recompute(payments, now);

    if debt.status != old_status {
        events.emit(Event::DebtStatusChanged {
            debt_id: debt.id,
            old_status,
            new_status: debt.status,
            timestamp: now,
        });
        if debt.status == DebtStatus::Settled {
            events.emit(Event::DebtSettled {
                debt_id: debt.id,
                total_paid: debt.amount_paid,
                timestamp: now,
            });
        }
    }
}

/// best-effort receipt cleanup, logged on failure, never fails the mutation
fn release_receipt<R: ReceiptStore>(
    receipts: &mut R,
    payment_id: PaymentId,
    reference: &str,
    now: DateTime<Utc>,
    events: &mut EventStore,
) {
    match receipts.delete_receipt(reference) {
        Ok(()) => events.emit(Event::ReceiptReleased {
            payment_id,
            reference: reference.to_string(),
            timestamp: now,
        }),
        Err(error) => warn!(%payment_id, reference, %error, "failed to release receipt object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Frequency;
    use crate::contacts::{ContactRelation, InMemoryDirectory};
    use crate::decimal::Money;
    use crate::types::{ContactId, InstallmentStatus, Orientation};
    use chrono::TimeZone;
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    /// receipt store that remembers every deletion, optionally failing
    #[derive(Debug, Default)]
    struct RecordingStore {
        deleted: Vec<String>,
        fail: bool,
    }

    impl ReceiptStore for RecordingStore {
        fn delete_receipt(
            &mut self,
            reference: &str,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if self.fail {
                return Err("object store unavailable".into());
            }
            self.deleted.push(reference.to_string());
            Ok(())
        }
    }

    struct World {
        alice: UserId,
        bob: UserId,
        bob_contact: ContactId,
        ledger: DebtLedger<InMemoryDirectory, RecordingStore>,
    }

    fn relation(user: UserId, contact: ContactId, name: &str) -> ContactRelation {
        ContactRelation {
            user_id: user,
            contact_id: contact,
            name: name.to_string(),
            email: None,
            phone: None,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn world() -> World {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let bob_contact = Uuid::new_v4();
        let alice_contact = Uuid::new_v4();

        let mut directory = InMemoryDirectory::new();
        directory.link_users(
            alice,
            relation(alice, bob_contact, "Bob"),
            bob,
            relation(bob, alice_contact, "Alice"),
        );

        let ledger =
            DebtLedger::new(LedgerConfig::default(), directory, RecordingStore::default()).unwrap();
        World {
            alice,
            bob,
            bob_contact,
            ledger,
        }
    }

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    /// alice owes bob, ten monthly installments of 100
    fn alice_owes_bob(world: &mut World, time: &SafeTimeProvider) -> DebtId {
        let request = DebtRequest::new(
            world.bob_contact,
            Orientation::OwnerOwes,
            Money::from_major(1_000),
            Frequency::Monthly,
        )
        .with_payment_count(10);
        world
            .ledger
            .create_debt(world.alice, request, time)
            .unwrap()
            .id
    }

    #[test]
    fn test_create_debt_requires_known_contact() {
        let mut world = world();
        let time = test_time();
        let request = DebtRequest::new(
            Uuid::new_v4(),
            Orientation::OwnerOwes,
            Money::from_major(100),
            Frequency::Monthly,
        )
        .with_payment_count(2);

        let result = world.ledger.create_debt(world.alice, request, &time);
        assert!(matches!(result, Err(DebtError::ContactNotFound { .. })));
    }

    #[test]
    fn test_debtor_payment_starts_pending_and_verification_completes_it() {
        // scenario: debtor records 500, creditor verifies
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(500),
            time.now(),
            crate::types::PaymentMethod::BankTransfer,
        );
        let payment_id = world
            .ledger
            .record_payment(world.alice, request, &time)
            .unwrap()
            .id;

        let (debt, _) = world.ledger.debt(world.alice, debt_id).unwrap();
        assert_eq!(debt.amount_paid, Money::ZERO); // pending does not count

        let payment = world
            .ledger
            .verify_payment(world.bob, payment_id, None, &time)
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.verified_by, Some(world.bob));

        let (debt, _) = world.ledger.debt(world.alice, debt_id).unwrap();
        assert_eq!(debt.amount_paid, Money::from_major(500));
        assert_eq!(debt.amount_remaining, Money::from_major(500));
    }

    #[test]
    fn test_rejected_payment_kept_for_audit_without_counting() {
        // scenario: creditor rejects with a reason
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(500),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        let payment_id = world
            .ledger
            .record_payment(world.alice, request, &time)
            .unwrap()
            .id;

        let payment = world
            .ledger
            .reject_payment(world.bob, payment_id, "unclear proof".to_string(), &time)
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Rejected);
        assert_eq!(payment.verification_notes.as_deref(), Some("unclear proof"));

        let (debt, _) = world.ledger.debt(world.alice, debt_id).unwrap();
        assert_eq!(debt.amount_paid, Money::ZERO);
        assert_eq!(world.ledger.payments(world.alice, debt_id).unwrap().len(), 1);
    }

    #[test]
    fn test_creditor_recorded_payment_completes_directly() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        // bob is the creditor on this debt, no verification round-trip
        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(100),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        let payment = world
            .ledger
            .record_payment(world.bob, request, &time)
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);

        let (debt, _) = world.ledger.debt(world.bob, debt_id).unwrap();
        assert_eq!(debt.amount_paid, Money::from_major(100));
    }

    #[test]
    fn test_debtor_cannot_verify_and_strangers_are_no_party() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(500),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        let payment_id = world
            .ledger
            .record_payment(world.alice, request, &time)
            .unwrap()
            .id;

        // alice is the debtor
        let result = world.ledger.verify_payment(world.alice, payment_id, None, &time);
        assert!(matches!(result, Err(DebtError::NotCreditor { .. })));

        let stranger = Uuid::new_v4();
        let result = world.ledger.verify_payment(stranger, payment_id, None, &time);
        assert!(matches!(result, Err(DebtError::NotAParty { .. })));
        let result = world.ledger.debt(stranger, debt_id);
        assert!(matches!(result, Err(DebtError::NotAParty { .. })));
    }

    #[test]
    fn test_counterparty_sees_inverted_orientation() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let (_, alice_view) = world.ledger.debt(world.alice, debt_id).unwrap();
        assert_eq!(alice_view.orientation, Orientation::OwnerOwes);
        assert_eq!(alice_view.actor_role, PartyRole::Debtor);

        let (_, bob_view) = world.ledger.debt(world.bob, debt_id).unwrap();
        assert_eq!(bob_view.orientation, Orientation::OwnerIsOwed);
        assert_eq!(bob_view.actor_role, PartyRole::Creditor);

        let bob_debts = world.ledger.debts_for(world.bob);
        assert_eq!(bob_debts.len(), 1);
    }

    #[test]
    fn test_settlement_emits_events_and_survives_time() {
        let mut world = world();
        let time = test_time();
        let controller = time.test_control().unwrap();
        let debt_id = alice_owes_bob(&mut world, &time);
        world.ledger.take_events();

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(1_000),
            time.now(),
            crate::types::PaymentMethod::BankTransfer,
        );
        let payment_id = world
            .ledger
            .record_payment(world.alice, request, &time)
            .unwrap()
            .id;
        world
            .ledger
            .verify_payment(world.bob, payment_id, None, &time)
            .unwrap();

        let events = world.ledger.take_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::DebtSettled { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::PaymentVerified { .. })));

        // a later overdue pass must not reopen a settled debt
        controller.advance(Duration::days(400));
        world.ledger.refresh_statuses(&time);
        let (debt, _) = world.ledger.debt(world.alice, debt_id).unwrap();
        assert_eq!(debt.status, DebtStatus::Settled);
    }

    #[test]
    fn test_missed_due_date_flips_to_overdue() {
        let mut world = world();
        let time = test_time();
        let controller = time.test_control().unwrap();
        let debt_id = alice_owes_bob(&mut world, &time);

        // first installment due 2024-02-01
        controller.advance(Duration::days(45));
        world.ledger.refresh_statuses(&time);

        let (debt, _) = world.ledger.debt(world.alice, debt_id).unwrap();
        assert_eq!(debt.status, DebtStatus::Overdue);
        assert_eq!(world.ledger.overdue_debts(world.alice).len(), 1);

        let events = world.ledger.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::DebtStatusChanged {
                new_status: DebtStatus::Overdue,
                ..
            }
        )));
    }

    #[test]
    fn test_schedule_overlay_through_ledger() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(150),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        let payment_id = world
            .ledger
            .record_payment(world.alice, request, &time)
            .unwrap()
            .id;
        world
            .ledger
            .verify_payment(world.bob, payment_id, None, &time)
            .unwrap();

        let schedule = world.ledger.schedule(world.bob, debt_id, &time).unwrap();
        assert_eq!(schedule.len(), 10);
        assert_eq!(schedule[0].status, InstallmentStatus::Paid);
        assert_eq!(schedule[1].amount_remaining, Money::from_major(50));
    }

    #[test]
    fn test_delete_payment_recomputes_and_releases_receipt() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let mut request = PaymentRequest::new(
            debt_id,
            Money::from_major(200),
            time.now(),
            crate::types::PaymentMethod::DigitalWallet,
        );
        request.receipt_ref = Some("receipts/gcash-123.jpg".to_string());
        let payment_id = world
            .ledger
            .record_payment(world.bob, request, &time)
            .unwrap()
            .id;

        let (debt, _) = world.ledger.debt(world.bob, debt_id).unwrap();
        assert_eq!(debt.amount_paid, Money::from_major(200));

        world
            .ledger
            .delete_payment(world.bob, payment_id, &time)
            .unwrap();

        let (debt, _) = world.ledger.debt(world.bob, debt_id).unwrap();
        assert_eq!(debt.amount_paid, Money::ZERO);
        assert_eq!(
            world.ledger.receipt_store().deleted,
            vec!["receipts/gcash-123.jpg".to_string()]
        );
    }

    #[test]
    fn test_receipt_store_failure_never_blocks_deletion() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let mut request = PaymentRequest::new(
            debt_id,
            Money::from_major(200),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        request.receipt_ref = Some("receipts/lost.jpg".to_string());
        let payment_id = world
            .ledger
            .record_payment(world.bob, request, &time)
            .unwrap()
            .id;

        world.ledger.receipts.fail = true;
        world
            .ledger
            .delete_payment(world.bob, payment_id, &time)
            .unwrap();
        assert!(world.ledger.payments(world.bob, debt_id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_debt_is_owner_exclusive_and_cascades() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let mut request = PaymentRequest::new(
            debt_id,
            Money::from_major(100),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        request.receipt_ref = Some("receipts/a.jpg".to_string());
        world.ledger.record_payment(world.alice, request, &time).unwrap();

        // bob is a party but not the owner
        let result = world.ledger.delete_debt(world.bob, debt_id, &time);
        assert!(matches!(result, Err(DebtError::NotOwner { .. })));

        world.ledger.delete_debt(world.alice, debt_id, &time).unwrap();
        assert!(matches!(
            world.ledger.debt(world.alice, debt_id),
            Err(DebtError::DebtNotFound { .. })
        ));
        assert_eq!(
            world.ledger.receipt_store().deleted,
            vec!["receipts/a.jpg".to_string()]
        );
    }

    #[test]
    fn test_edit_debt_owner_only_with_version_check() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let patch = DebtPatch {
            number_of_payments: Some(4),
            ..Default::default()
        };
        let result = world
            .ledger
            .edit_debt(world.bob, debt_id, patch.clone(), None, &time);
        assert!(matches!(result, Err(DebtError::NotOwner { .. })));

        let result = world
            .ledger
            .edit_debt(world.alice, debt_id, patch.clone(), Some(99), &time);
        assert!(matches!(result, Err(DebtError::VersionConflict { .. })));

        let version = world.ledger.debt(world.alice, debt_id).unwrap().0.version;
        let debt = world
            .ledger
            .edit_debt(world.alice, debt_id, patch, Some(version), &time)
            .unwrap();
        assert_eq!(debt.number_of_payments, 4);
        assert_eq!(debt.installment_amount, Money::from_major(250));
    }

    #[test]
    fn test_failed_edit_keeps_stored_debt_intact() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);
        let before = world.ledger.debt(world.alice, debt_id).unwrap().0.clone();

        // the amount change is valid on its own; the past due date sinks the
        // whole patch and nothing may stick
        let patch = DebtPatch {
            total_amount: Some(Money::from_major(9_999)),
            due_date: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        let result = world.ledger.edit_debt(world.alice, debt_id, patch, None, &time);
        assert!(matches!(result, Err(DebtError::InvalidDueDate { .. })));

        let (debt, _) = world.ledger.debt(world.alice, debt_id).unwrap();
        assert_eq!(*debt, before);
        assert_eq!(debt.amount_paid + debt.amount_remaining, debt.total_amount);
    }

    #[test]
    fn test_edit_beyond_installment_bound_rolls_back() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);
        let before = world.ledger.debt(world.alice, debt_id).unwrap().0.clone();

        let patch = DebtPatch {
            number_of_payments: Some(600),
            ..Default::default()
        };
        let result = world.ledger.edit_debt(world.alice, debt_id, patch, None, &time);
        assert!(matches!(result, Err(DebtError::ScheduleTooLong { .. })));
        assert_eq!(*world.ledger.debt(world.alice, debt_id).unwrap().0, before);
    }

    #[test]
    fn test_edit_payment_restricted_to_owner_or_recorder() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(100),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        let payment_id = world
            .ledger
            .record_payment(world.alice, request, &time)
            .unwrap()
            .id;

        // bob is a party but neither the owner nor the recorder
        let patch = PaymentPatch {
            amount: Some(Money::from_major(50)),
            ..Default::default()
        };
        let result = world
            .ledger
            .edit_payment(world.bob, payment_id, patch.clone(), &time);
        assert!(matches!(result, Err(DebtError::NotOwner { .. })));

        let payment = world
            .ledger
            .edit_payment(world.alice, payment_id, patch, &time)
            .unwrap();
        assert_eq!(payment.amount, Money::from_major(50));
    }

    #[test]
    fn test_archived_debt_refuses_payments() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let patch = DebtPatch {
            archived: Some(true),
            ..Default::default()
        };
        world
            .ledger
            .edit_debt(world.alice, debt_id, patch, None, &time)
            .unwrap();

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(100),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        let result = world.ledger.record_payment(world.alice, request, &time);
        assert!(matches!(result, Err(DebtError::DebtArchived { .. })));
    }

    #[test]
    fn test_pending_verifications_listed_for_creditor_only() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(100),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        world.ledger.record_payment(world.alice, request, &time).unwrap();

        assert_eq!(world.ledger.pending_verifications(world.bob).len(), 1);
        assert!(world.ledger.pending_verifications(world.alice).is_empty());
    }

    #[test]
    fn test_upcoming_payments_window() {
        let mut world = world();
        let time = test_time();
        let controller = time.test_control().unwrap();
        let debt_id = alice_owes_bob(&mut world, &time);

        // first due date is 2024-02-01, a month out
        assert!(world
            .ledger
            .upcoming_payments(world.alice, Some(7), &time)
            .is_empty());

        controller.advance(Duration::days(28));
        let upcoming = world.ledger.upcoming_payments(world.alice, Some(7), &time);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].debt_id, debt_id);
        assert_eq!(upcoming[0].contact_name, "Bob");
        assert_eq!(upcoming[0].amount, Money::from_major(100));
    }

    #[test]
    fn test_payment_summary() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(250),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        world.ledger.record_payment(world.bob, request, &time).unwrap();

        let summary = world.ledger.payment_summary(world.alice, debt_id).unwrap();
        assert_eq!(summary.total_paid, Money::from_major(250));
        assert_eq!(summary.remaining, Money::from_major(750));
        assert_eq!(summary.percentage_paid.as_percentage(), rust_decimal_macros::dec!(25));
        assert_eq!(summary.completed_payment_count, 1);
    }

    #[test]
    fn test_edit_payment_replacing_receipt_releases_old() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let mut request = PaymentRequest::new(
            debt_id,
            Money::from_major(100),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        request.receipt_ref = Some("receipts/old.jpg".to_string());
        let payment_id = world
            .ledger
            .record_payment(world.alice, request, &time)
            .unwrap()
            .id;

        let patch = PaymentPatch {
            receipt_ref: Some("receipts/new.jpg".to_string()),
            ..Default::default()
        };
        let payment = world
            .ledger
            .edit_payment(world.alice, payment_id, patch, &time)
            .unwrap();
        assert_eq!(payment.receipt_ref.as_deref(), Some("receipts/new.jpg"));
        assert_eq!(
            world.ledger.receipt_store().deleted,
            vec!["receipts/old.jpg".to_string()]
        );
    }

    #[test]
    fn test_edit_completed_payment_refused_through_ledger() {
        let mut world = world();
        let time = test_time();
        let debt_id = alice_owes_bob(&mut world, &time);

        let request = PaymentRequest::new(
            debt_id,
            Money::from_major(100),
            time.now(),
            crate::types::PaymentMethod::Cash,
        );
        let payment_id = world
            .ledger
            .record_payment(world.bob, request, &time)
            .unwrap()
            .id;

        let patch = PaymentPatch {
            amount: Some(Money::from_major(900)),
            ..Default::default()
        };
        let result = world.ledger.edit_payment(world.bob, payment_id, patch, &time);
        assert!(matches!(result, Err(DebtError::PaymentAlreadyFinal { .. })));
    }
}
