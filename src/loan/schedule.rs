//! Flat-interest repayment schedules.

use rust_decimal::{Decimal, RoundingStrategy};
use time::{Date, Month};

use crate::{Error, money::Money};

const BASIS_POINTS: i64 = 10_000;
const MONTHS_PER_YEAR: i64 = 12;

/// One row of a repayment schedule before it is written to the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledInstallment {
    /// The 1-based position in the schedule.
    pub installment: i64,
    pub due_date: Date,
    pub amount: Money,
}

/// The amount repayable on a flat-interest loan, rounded to cents.
///
/// `total = principal * (1 + rate * term / 12)`, where the rate is yearly.
///
/// # Errors
/// Returns [Error::InvalidRequest] if the total is too large to represent.
pub fn flat_interest_total(
    principal: Money,
    interest_rate_bps: i64,
    term_months: i64,
) -> Result<Money, Error> {
    let rate = Decimal::from(interest_rate_bps) / Decimal::from(BASIS_POINTS);
    let years = Decimal::from(term_months) / Decimal::from(MONTHS_PER_YEAR);

    rate.checked_mul(years)
        .and_then(|interest| interest.checked_add(Decimal::ONE))
        .and_then(|factor| principal.amount().checked_mul(factor))
        .map(|total| Money::new(total).round_to_cents())
        .ok_or_else(|| {
            Error::InvalidRequest(format!(
                "the amount repayable on {principal} at {interest_rate_bps} bps over {term_months} months is too large"
            ))
        })
}

/// Split `total` into `term_months` installments.
///
/// Every installment is `total / term` rounded down to the cent, except the
/// last, which takes whatever is left so that the installments add up to `total`.
pub fn installment_amounts(total: Money, term_months: i64) -> Vec<Money> {
    if term_months <= 0 {
        return Vec::new();
    }

    let base = Money::new(
        (total.amount() / Decimal::from(term_months))
            .round_dp_with_strategy(2, RoundingStrategy::ToZero),
    );
    // `base * (term - 1)` never exceeds `total`, so this cannot overflow.
    let last = Money::new(total.amount() - base.amount() * Decimal::from(term_months - 1));

    let mut amounts = vec![base; (term_months - 1) as usize];
    amounts.push(last);
    amounts
}

/// The same day `months` months later, clamped to the end of shorter months.
///
/// # Errors
/// Returns [Error::InvalidRequest] if the result is outside the supported range of dates.
pub fn add_months(date: Date, months: i64) -> Result<Date, Error> {
    let out_of_range = || Error::InvalidRequest(format!("{date} plus {months} months is out of range"));

    let zero_based_month =
        i64::from(date.year()) * MONTHS_PER_YEAR + i64::from(u8::from(date.month())) - 1 + months;
    let year = i32::try_from(zero_based_month.div_euclid(MONTHS_PER_YEAR))
        .map_err(|_| out_of_range())?;
    let month = u8::try_from(zero_based_month.rem_euclid(MONTHS_PER_YEAR) + 1)
        .ok()
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(out_of_range)?;

    (1..=date.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
        .ok_or_else(out_of_range)
}

/// Build the repayment schedule of a loan approved on `start_date`.
///
/// Installments fall due monthly, starting one month after `start_date`.
pub fn build_schedule(
    total: Money,
    term_months: i64,
    start_date: Date,
) -> Result<Vec<ScheduledInstallment>, Error> {
    installment_amounts(total, term_months)
        .into_iter()
        .zip(1..)
        .map(|(amount, installment)| {
            Ok(ScheduledInstallment {
                installment,
                due_date: add_months(start_date, installment)?,
                amount,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{Error, money::Money};

    use super::{add_months, build_schedule, flat_interest_total, installment_amounts};

    #[test]
    fn flat_interest_for_one_year() {
        let total = flat_interest_total(Money::new(dec!(1000)), 1200, 12).unwrap();

        assert_eq!(total, Money::new(dec!(1120)));
    }

    #[test]
    fn flat_interest_scales_with_term() {
        let total = flat_interest_total(Money::new(dec!(1000)), 500, 6).unwrap();

        assert_eq!(total, Money::new(dec!(1025)));
    }

    #[test]
    fn zero_interest_repays_principal() {
        let total = flat_interest_total(Money::new(dec!(99.99)), 0, 7).unwrap();

        assert_eq!(total, Money::new(dec!(99.99)));
    }

    #[test]
    fn flat_interest_reports_overflow() {
        let result = flat_interest_total(Money::new(Decimal::MAX), 10_000, 360);

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn last_installment_absorbs_remainder() {
        let amounts = installment_amounts(Money::new(dec!(100)), 3);

        assert_eq!(
            amounts,
            vec![
                Money::new(dec!(33.33)),
                Money::new(dec!(33.33)),
                Money::new(dec!(33.34))
            ]
        );
    }

    #[test]
    fn installments_sum_to_total() {
        let total = Money::new(dec!(1234.57));

        let sum = installment_amounts(total, 11)
            .into_iter()
            .try_fold(Money::zero(), Money::checked_add)
            .unwrap();

        assert_eq!(sum, total);
    }

    #[test]
    fn add_months_clamps_to_end_of_month() {
        assert_eq!(add_months(date!(2024 - 01 - 31), 1), Ok(date!(2024 - 02 - 29)));
        assert_eq!(add_months(date!(2023 - 01 - 31), 1), Ok(date!(2023 - 02 - 28)));
        assert_eq!(add_months(date!(2024 - 03 - 15), 12), Ok(date!(2025 - 03 - 15)));
    }

    #[test]
    fn add_months_rolls_over_year() {
        assert_eq!(add_months(date!(2024 - 11 - 05), 3), Ok(date!(2025 - 02 - 05)));
    }

    #[test]
    fn schedule_starts_one_month_after_start_date() {
        let schedule = build_schedule(Money::new(dec!(300)), 3, date!(2025 - 01 - 31)).unwrap();

        let due_dates: Vec<_> = schedule.iter().map(|row| row.due_date).collect();
        assert_eq!(
            due_dates,
            vec![
                date!(2025 - 02 - 28),
                date!(2025 - 03 - 31),
                date!(2025 - 04 - 30)
            ]
        );
        assert_eq!(schedule[2].installment, 3);
    }
}
