use crate::decimal::{round_half_up, Money, MONEY_DP};

/// total owed for a period: base rent plus penalty, rounded to cents
pub fn calculate_amount_due(base_rent: Money, penalty: Money) -> Money {
    Money::from_decimal(round_half_up(
        base_rent.as_decimal() + penalty.as_decimal(),
        MONEY_DP,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_rent_and_penalty() {
        assert_eq!(
            calculate_amount_due(Money::from_major(1_000), Money::from_major(450)),
            Money::from_major(1_450)
        );
    }

    #[test]
    fn test_missing_inputs_are_zero() {
        assert_eq!(calculate_amount_due(Money::ZERO, Money::ZERO), Money::ZERO);
        assert_eq!(
            calculate_amount_due(Money::from_major(800), Money::ZERO),
            Money::from_major(800)
        );
    }

    #[test]
    fn test_rounding_holds_for_cent_inputs() {
        let rent = Money::from_str_exact("1234.56").unwrap();
        let penalty = Money::from_str_exact("185.18").unwrap();
        assert_eq!(
            calculate_amount_due(rent, penalty),
            Money::from_str_exact("1419.74").unwrap()
        );
    }
}
