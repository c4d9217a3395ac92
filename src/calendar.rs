use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// hard bound on schedule length, ten years of weekly installments
pub const MAX_INSTALLMENTS: u32 = 520;

/// installment frequency of a debt's payment plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[serde(rename = "onetime")]
    OneTime,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// whether the plan is a single lump-sum payment
    pub fn is_one_time(&self) -> bool {
        matches!(self, Frequency::OneTime)
    }
}

/// add `n` whole intervals of the given frequency to a date
///
/// weekly and biweekly intervals are fixed-length; monthly, quarterly and
/// yearly intervals are calendar months with the day of month clamped to the
/// target month's length (Jan 31 + 1 month = Feb 28, or Feb 29 in leap years).
/// `OneTime` has no interval and returns the date unchanged.
pub fn add_interval(date: DateTime<Utc>, frequency: Frequency, n: u32) -> DateTime<Utc> {
    match frequency {
        Frequency::OneTime => date,
        Frequency::Weekly => date + Duration::days(7 * n as i64),
        Frequency::Biweekly => date + Duration::days(14 * n as i64),
        Frequency::Monthly => add_months(date, n),
        Frequency::Quarterly => add_months(date, 3 * n),
        Frequency::Yearly => add_months(date, 12 * n),
    }
}

/// smallest n >= 1 such that `add_interval(start, frequency, n) >= end`
///
/// the calendar-exact equivalent of `ceil((end - start) / interval)`. returns
/// `None` when the span exceeds `MAX_INSTALLMENTS` periods or the frequency
/// has no interval.
pub fn periods_until(start: DateTime<Utc>, end: DateTime<Utc>, frequency: Frequency) -> Option<u32> {
    if frequency.is_one_time() {
        return None;
    }
    for n in 1..=MAX_INSTALLMENTS {
        if add_interval(start, frequency, n) >= end {
            return Some(n);
        }
    }
    None
}

/// add calendar months, clamping the day of month
fn add_months(date: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let zero_based = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = zero_based.div_euclid(12);
    let month = zero_based.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));

    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .expect("day clamped to month length")
        .and_hms_opt(date.hour(), date.minute(), date.second())
        .expect("time of day carried from a valid timestamp");
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
