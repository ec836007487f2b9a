//! Rental fee and overdue fine arithmetic.
//!
//! Day counts are calendar-day differences, so a rental spanning New Year is
//! charged for the days it actually covers.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use carshare_core::{CoreError, CoreResult, PaymentType};

/// Surcharge applied to every overdue day
pub const FINE_MULTIPLIER: Decimal = dec!(1.3);

/// Provider amounts are expressed in cents
pub const MINOR_UNITS_PER_UNIT: Decimal = dec!(100);

/// Whole days from `from` to `to`; zero when `to` is not after `from`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().max(0)
}

/// Amount due for a rental, truncated to whole currency units.
///
/// `PAYMENT` charges the planned period. `FINE` charges the planned period
/// plus every day between the planned and the actual return date at
/// `FINE_MULTIPLIER` times the daily fee, and requires the car to be back.
pub fn calculate_amount(
    rental_date: NaiveDate,
    return_date: NaiveDate,
    actual_return_date: Option<NaiveDate>,
    daily_fee: Decimal,
    payment_type: PaymentType,
) -> CoreResult<Decimal> {
    let base_days = Decimal::from(days_between(rental_date, return_date));
    let ordinary_fee = base_days * daily_fee;

    let total = match payment_type {
        PaymentType::Payment => ordinary_fee,
        PaymentType::Fine => {
            let actual = actual_return_date.ok_or_else(|| {
                CoreError::Payment("Fine can't be calculated before the car is returned".to_string())
            })?;
            let overdue_days = Decimal::from(days_between(return_date, actual));
            ordinary_fee + overdue_days * daily_fee * FINE_MULTIPLIER
        }
    };

    Ok(total.trunc())
}

/// Converts a whole-unit amount to the provider's minor units
pub fn to_minor_units(amount: Decimal) -> CoreResult<i64> {
    (amount * MINOR_UNITS_PER_UNIT)
        .to_i64()
        .ok_or_else(|| CoreError::Validation(format!("Amount {} is out of range", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ordinary_fee() {
        let amount = calculate_amount(
            date(2024, 4, 5),
            date(2024, 4, 8),
            None,
            dec!(20),
            PaymentType::Payment,
        )
        .unwrap();
        assert_eq!(amount, dec!(60));
    }

    #[test]
    fn test_fine_adds_surcharged_overdue_days() {
        let amount = calculate_amount(
            date(2024, 4, 5),
            date(2024, 4, 8),
            Some(date(2024, 4, 10)),
            dec!(20),
            PaymentType::Fine,
        )
        .unwrap();
        // 3 x 20 + 2 x 20 x 1.3
        assert_eq!(amount, dec!(112));
    }

    #[test]
    fn test_payment_ignores_late_return() {
        let amount = calculate_amount(
            date(2024, 4, 5),
            date(2024, 4, 8),
            Some(date(2024, 4, 10)),
            dec!(20),
            PaymentType::Payment,
        )
        .unwrap();
        assert_eq!(amount, dec!(60));
    }

    #[test]
    fn test_year_boundary_counts_calendar_days() {
        let amount = calculate_amount(
            date(2023, 12, 30),
            date(2024, 1, 2),
            Some(date(2024, 1, 3)),
            dec!(10),
            PaymentType::Fine,
        )
        .unwrap();
        // 3 x 10 + 1 x 10 x 1.3 = 43
        assert_eq!(amount, dec!(43));
    }

    #[test]
    fn test_early_return_has_no_fine() {
        let amount = calculate_amount(
            date(2024, 4, 5),
            date(2024, 4, 8),
            Some(date(2024, 4, 7)),
            dec!(20),
            PaymentType::Fine,
        )
        .unwrap();
        assert_eq!(amount, dec!(60));
    }

    #[test]
    fn test_fine_requires_return() {
        let result = calculate_amount(
            date(2024, 4, 5),
            date(2024, 4, 8),
            None,
            dec!(20),
            PaymentType::Fine,
        );
        assert!(matches!(result, Err(CoreError::Payment(_))));
    }

    #[test]
    fn test_amount_is_truncated() {
        let amount = calculate_amount(
            date(2024, 4, 5),
            date(2024, 4, 8),
            Some(date(2024, 4, 9)),
            dec!(10.55),
            PaymentType::Fine,
        )
        .unwrap();
        // 31.65 + 13.715 = 45.365
        assert_eq!(amount, dec!(45));
        assert_eq!(to_minor_units(amount).unwrap(), 4500);
    }

    #[test]
    fn test_same_inputs_same_amount() {
        let run = || {
            calculate_amount(
                date(2024, 2, 27),
                date(2024, 3, 2),
                Some(date(2024, 3, 5)),
                dec!(33.3),
                PaymentType::Fine,
            )
            .unwrap()
        };
        assert_eq!(run(), run());
    }
}
