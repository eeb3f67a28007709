pub mod amount_due;
pub mod penalty;
pub mod rent;
pub mod status;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::events::EventStore;
use crate::facility::{Facility, ManagerContract};
use crate::types::{PaymentStatus, ReferencePeriod};

pub use amount_due::calculate_amount_due;
pub use penalty::{
    due_date_for, OverflowBlock, PenaltyCalculation, PenaltyEngine, PenaltySchedule, PenaltyTier,
    TierCalculation,
};
pub use rent::{RentHistoryResolver, RentResolution, RentSource};
pub use status::{classify_status, DEFAULT_TOLERANCE};

/// every figure the pipeline derives for one payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentBreakdown {
    pub period: ReferencePeriod,
    pub payment_date: Option<NaiveDate>,
    pub base_rent: Money,
    pub rent_source: RentSource,
    pub penalty: PenaltyCalculation,
    pub amount_due: Money,
    pub amount_paid: Money,
    pub status: PaymentStatus,
}

/// rent -> penalty -> amount due -> status, in that order
pub struct CalculationPipeline {
    penalty_engine: PenaltyEngine,
    tolerance: Decimal,
}

impl CalculationPipeline {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            penalty_engine: PenaltyEngine::new(config.penalty.clone()),
            tolerance: config.status_tolerance,
        }
    }

    /// full run, resolving the historical rent first
    pub fn run(
        &self,
        facility: &Facility,
        contracts: &[ManagerContract],
        period: ReferencePeriod,
        payment_date: Option<NaiveDate>,
        amount_paid: Money,
        events: &mut EventStore,
    ) -> PaymentBreakdown {
        let rent = RentHistoryResolver::resolve(facility, contracts, period, events);
        self.run_with_rent(rent, period, payment_date, amount_paid, events)
    }

    /// run from an already known base rent
    pub fn run_with_rent(
        &self,
        rent: RentResolution,
        period: ReferencePeriod,
        payment_date: Option<NaiveDate>,
        amount_paid: Money,
        events: &mut EventStore,
    ) -> PaymentBreakdown {
        let penalty = self
            .penalty_engine
            .calculate(period, payment_date, rent.amount, events);
        let amount_due = calculate_amount_due(rent.amount, penalty.penalty_amount);
        let status = self.reclassify(amount_paid, amount_due);

        PaymentBreakdown {
            period,
            payment_date,
            base_rent: rent.amount,
            rent_source: rent.source,
            penalty,
            amount_due,
            amount_paid,
            status,
        }
    }

    /// status only, against an amount due computed earlier
    pub fn reclassify(&self, amount_paid: Money, amount_due: Money) -> PaymentStatus {
        classify_status(amount_paid, amount_due, self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::tests::facility;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn run(payment_date: NaiveDate, paid: Money) -> PaymentBreakdown {
        let pipeline = CalculationPipeline::new(&EngineConfig::default());
        let pac = facility(7, Money::from_major(1_000));
        let mut events = EventStore::new();
        pipeline.run(
            &pac,
            &[],
            ReferencePeriod::new(11, 2024).unwrap(),
            Some(payment_date),
            paid,
            &mut events,
        )
    }

    #[test]
    fn test_scenarios() {
        let cases = [
            (date(2024, 12, 5), "0.00", "1000.00"),
            (date(2024, 12, 20), "50.00", "1050.00"),
            (date(2025, 1, 10), "150.00", "1150.00"),
            (date(2025, 3, 10), "450.00", "1450.00"),
        ];

        for (payment_date, penalty, due) in cases {
            let result = run(payment_date, Money::ZERO);
            assert_eq!(result.penalty.penalty_amount.to_string(), penalty);
            assert_eq!(result.amount_due.to_string(), due);
            assert_eq!(result.status, PaymentStatus::Pending);
        }
    }

    #[test]
    fn test_status_follows_amount_due() {
        let late = date(2025, 3, 10);
        assert_eq!(run(late, Money::from_major(1_450)).status, PaymentStatus::Paid);
        assert_eq!(run(late, Money::from_major(700)).status, PaymentStatus::PartiallyPaid);
        assert_eq!(run(late, Money::from_major(1_000)).status, PaymentStatus::PartiallyPaid);
    }

    #[test]
    fn test_identical_inputs_give_identical_results() {
        let first = run(date(2025, 1, 10), Money::from_major(500));
        let second = run(date(2025, 1, 10), Money::from_major(500));
        assert_eq!(first, second);
    }

    #[test]
    fn test_reclassify_uses_configured_tolerance() {
        let mut config = EngineConfig::default();
        config.status_tolerance = Decimal::ONE;
        let pipeline = CalculationPipeline::new(&config);

        assert_eq!(
            pipeline.reclassify(Money::from_str_exact("999.50").unwrap(), Money::from_major(1_000)),
            PaymentStatus::Paid
        );
    }
}
