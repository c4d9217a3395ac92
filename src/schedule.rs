use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::calendar::{add_interval, periods_until, Frequency, MAX_INSTALLMENTS};
use crate::decimal::Money;
use crate::errors::{DebtError, Result};
use crate::payment::Payment;
use crate::types::{Installment, InstallmentStatus, PaymentStatus};

/// the schedule-relevant slice of a debt
///
/// pure inputs for every calculation here, so the calculator never reads
/// mutable aggregate state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub total_amount: Money,
    pub frequency: Frequency,
    pub count: u32,
    pub created_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// equal division of a total into `count` cent-rounded installments
///
/// every installment is total/count rounded down to cents; the last absorbs
/// the rounding remainder so the sum is exactly the total and no slot is ever
/// negative. a total with fewer cents than slots (0.02 over 3) rounds the
/// early slots down to zero; a zero slot owes nothing and the overlay reports
/// it as covered.
pub fn split_installments(total: Money, count: u32) -> Vec<Money> {
    let count = count.max(1);
    let base = Money::from_decimal(
        (total.as_decimal() / Decimal::from(count))
            .round_dp_with_strategy(2, RoundingStrategy::ToZero),
    );

    let mut amounts = vec![base; count as usize];
    let all_but_last = base.as_decimal() * Decimal::from(count - 1);
    amounts[count as usize - 1] = total - Money::from_decimal(all_but_last);
    amounts
}

/// due date of the final installment when the payment count was supplied
pub fn due_date_from_count(
    created_at: DateTime<Utc>,
    frequency: Frequency,
    count: u32,
) -> DateTime<Utc> {
    add_interval(created_at, frequency, count)
}

/// installment count when the due date was supplied
pub fn count_from_due_date(
    created_at: DateTime<Utc>,
    due_date: DateTime<Utc>,
    frequency: Frequency,
) -> Result<u32> {
    if frequency.is_one_time() {
        return Ok(1);
    }
    periods_until(created_at, due_date, frequency).ok_or(DebtError::ScheduleTooLong {
        count: MAX_INSTALLMENTS,
        max: MAX_INSTALLMENTS,
    })
}

/// project the full installment schedule, all slots pending
///
/// installment `i` falls due at `add_interval(created_at, frequency, i)`;
/// a one-time plan is a single slot at the stored due date
pub fn generate(plan: &Plan) -> Vec<Installment> {
    if plan.frequency.is_one_time() {
        return vec![Installment {
            number: 1,
            due_date: plan.due_date,
            amount: plan.total_amount,
            amount_remaining: plan.total_amount,
            status: InstallmentStatus::Pending,
        }];
    }

    let amounts = split_installments(plan.total_amount, plan.count);
    amounts
        .into_iter()
        .enumerate()
        .map(|(idx, amount)| Installment {
            number: idx as u32 + 1,
            due_date: add_interval(plan.created_at, plan.frequency, idx as u32 + 1),
            amount,
            amount_remaining: amount,
            status: InstallmentStatus::Pending,
        })
        .collect()
}

/// overlay actual payments onto the projected plan
///
/// FIFO allocation: the pool of completed payment amounts is consumed by
/// installments in ascending due-date order. a fully covered slot is `Paid`;
/// an uncovered slot past its due date is `Overdue` until the following due
/// date has also passed, after which it is `Missed`.
pub fn overlay(plan: &Plan, payments: &[Payment], now: DateTime<Utc>) -> Vec<Installment> {
    let mut schedule = generate(plan);

    let mut pool = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .map(|p| p.amount)
        .fold(Money::ZERO, |acc, x| acc + x);

    let due_dates: Vec<DateTime<Utc>> = schedule.iter().map(|i| i.due_date).collect();

    for (idx, installment) in schedule.iter_mut().enumerate() {
        let consumed = pool.min(installment.amount);
        pool -= consumed;
        installment.amount_remaining = installment.amount - consumed;

        installment.status = if installment.amount_remaining.is_zero() {
            InstallmentStatus::Paid
        } else if now > installment.due_date {
            let window_closed = due_dates.get(idx + 1).is_some_and(|next| now > *next);
            if window_closed {
                InstallmentStatus::Missed
            } else {
                InstallmentStatus::Overdue
            }
        } else {
            InstallmentStatus::Pending
        };
    }

    schedule
}

/// when the next payment falls due
///
/// no payments yet: the first schedule date. otherwise the schedule date
/// immediately after the most recent completed payment, clamped to the final
/// due date. one-time plans always point at their single due date.
pub fn next_due_date(plan: &Plan, last_payment: Option<DateTime<Utc>>) -> DateTime<Utc> {
    if plan.frequency.is_one_time() {
        return plan.due_date;
    }

    let last = match last_payment {
        Some(date) => date,
        None => return add_interval(plan.created_at, plan.frequency, 1),
    };

    for n in 1..=plan.count {
        let due = add_interval(plan.created_at, plan.frequency, n);
        if due > last {
            return due;
        }
    }
    plan.due_date
}
