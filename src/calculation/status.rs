use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::decimal::Money;
use crate::types::PaymentStatus;

/// tolerance absorbing drift between amounts paid and due
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.001);

/// classify how much of the amount due has been paid
pub fn classify_status(amount_paid: Money, amount_due: Money, tolerance: Decimal) -> PaymentStatus {
    let paid = amount_paid.as_decimal();
    let due = amount_due.as_decimal();

    // a zero-obligation period with no payment stays pending
    if due <= Decimal::ZERO {
        return if paid > Decimal::ZERO {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        };
    }

    if paid >= due - tolerance {
        PaymentStatus::Paid
    } else if paid > tolerance {
        PaymentStatus::PartiallyPaid
    } else {
        PaymentStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(paid: &str, due: &str) -> PaymentStatus {
        classify_status(
            Money::from_str_exact(paid).unwrap(),
            Money::from_str_exact(due).unwrap(),
            DEFAULT_TOLERANCE,
        )
    }

    #[test]
    fn test_three_states() {
        assert_eq!(classify("1450.00", "1450.00"), PaymentStatus::Paid);
        assert_eq!(classify("700", "1450.00"), PaymentStatus::PartiallyPaid);
        assert_eq!(classify("0", "1450.00"), PaymentStatus::Pending);
    }

    #[test]
    fn test_overpayment_is_paid() {
        assert_eq!(classify("1500", "1450"), PaymentStatus::Paid);
    }

    #[test]
    fn test_one_cent_short_is_partial() {
        assert_eq!(classify("1449.99", "1450.00"), PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_zero_obligation() {
        assert_eq!(classify("0", "0"), PaymentStatus::Pending);
        assert_eq!(classify("10", "0"), PaymentStatus::Paid);
    }

    #[test]
    fn test_grid_is_consistent() {
        let amounts = ["0", "0.01", "1", "499.99", "500", "500.01", "1000"];
        for paid in amounts {
            for due in amounts {
                let paid_m = Money::from_str_exact(paid).unwrap();
                let due_m = Money::from_str_exact(due).unwrap();
                let expected = if paid_m >= due_m && paid_m.is_positive() {
                    PaymentStatus::Paid
                } else if paid_m.is_positive() {
                    PaymentStatus::PartiallyPaid
                } else {
                    PaymentStatus::Pending
                };
                assert_eq!(classify(paid, due), expected, "paid {} due {}", paid, due);
            }
        }
    }
}
