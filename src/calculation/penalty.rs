use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{PacError, Result};
use crate::events::{DataQualityWarning, EventStore};
use crate::types::ReferencePeriod;

/// penalty tier; rates of every tier reached are added together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyTier {
    pub name: String,
    /// last day late covered by this tier, inclusive
    pub up_to_days: u32,
    pub rate: Rate,
}

/// repeated block applied once lateness passes the last tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverflowBlock {
    pub block_days: u32,
    pub rate_per_block: Rate,
}

/// late-payment schedule anchored to a due day of the following month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltySchedule {
    pub due_day: u32,
    pub tiers: Vec<PenaltyTier>,
    pub overflow: Option<OverflowBlock>,
}

impl Default for PenaltySchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl PenaltySchedule {
    /// 5% up to 30 days, +10% to 60, +15% to 90, then +15% per 30 days
    pub fn standard() -> Self {
        Self {
            due_day: 5,
            tiers: vec![
                PenaltyTier {
                    name: "1-30 days".to_string(),
                    up_to_days: 30,
                    rate: Rate::from_percentage(5),
                },
                PenaltyTier {
                    name: "31-60 days".to_string(),
                    up_to_days: 60,
                    rate: Rate::from_percentage(10),
                },
                PenaltyTier {
                    name: "61-90 days".to_string(),
                    up_to_days: 90,
                    rate: Rate::from_percentage(15),
                },
            ],
            overflow: Some(OverflowBlock {
                block_days: 30,
                rate_per_block: Rate::from_percentage(15),
            }),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=28).contains(&self.due_day) {
            return Err(PacError::InvalidConfiguration {
                message: format!("due day must be between 1 and 28, got {}", self.due_day),
            });
        }

        let mut previous = 0;
        for tier in &self.tiers {
            if tier.up_to_days <= previous {
                return Err(PacError::InvalidConfiguration {
                    message: format!("tier '{}' does not extend past day {}", tier.name, previous),
                });
            }
            if tier.rate.is_negative() {
                return Err(PacError::InvalidConfiguration {
                    message: format!("tier '{}' has a negative rate", tier.name),
                });
            }
            previous = tier.up_to_days;
        }

        if let Some(overflow) = &self.overflow {
            if overflow.block_days == 0 {
                return Err(PacError::InvalidConfiguration {
                    message: "overflow block must cover at least one day".to_string(),
                });
            }
            if overflow.rate_per_block.is_negative() {
                return Err(PacError::InvalidConfiguration {
                    message: "overflow block has a negative rate".to_string(),
                });
            }
        }

        Ok(())
    }

    /// last day covered by the explicit tiers
    fn tier_ceiling(&self) -> u32 {
        self.tiers.last().map(|tier| tier.up_to_days).unwrap_or(0)
    }

    /// tiers reached for the given lateness
    pub fn breakdown(&self, days_late: i64) -> Vec<TierCalculation> {
        let mut applied = Vec::new();
        if days_late <= 0 {
            return applied;
        }

        let mut tier_start = 1_i64;
        for tier in &self.tiers {
            if days_late < tier_start {
                break;
            }
            applied.push(TierCalculation {
                tier_name: tier.name.clone(),
                blocks: 1,
                rate: tier.rate,
            });
            tier_start = i64::from(tier.up_to_days) + 1;
        }

        if let Some(overflow) = &self.overflow {
            let ceiling = i64::from(self.tier_ceiling());
            if days_late > ceiling {
                let block_days = i64::from(overflow.block_days);
                let blocks = (days_late - ceiling - 1) / block_days + 1;
                applied.push(TierCalculation {
                    tier_name: format!("past {} days", ceiling),
                    blocks: blocks as u32,
                    rate: Rate::from_decimal(
                        overflow.rate_per_block.as_decimal() * Decimal::from(blocks),
                    ),
                });
            }
        }

        applied
    }

    /// cumulative rate for the given lateness
    pub fn rate_for(&self, days_late: i64) -> Rate {
        self.breakdown(days_late)
            .iter()
            .fold(Rate::ZERO, |total, tier| total + tier.rate)
    }
}

/// due date of a period: `due_day` of the following month, inclusive.
/// `None` when that day does not exist in the month
pub fn due_date_for(period: ReferencePeriod, due_day: u32) -> Option<NaiveDate> {
    period.next_month_start()?.with_day(due_day)
}

/// engine for late-payment penalties
pub struct PenaltyEngine {
    pub schedule: PenaltySchedule,
}

impl PenaltyEngine {
    pub fn new(schedule: PenaltySchedule) -> Self {
        Self { schedule }
    }

    pub fn due_date(&self, period: ReferencePeriod) -> Option<NaiveDate> {
        due_date_for(period, self.schedule.due_day)
    }

    /// calculate the penalty owed for paying a period's rent on `payment_date`
    pub fn calculate(
        &self,
        period: ReferencePeriod,
        payment_date: Option<NaiveDate>,
        base_rent: Money,
        events: &mut EventStore,
    ) -> PenaltyCalculation {
        let due_date = match self.due_date(period) {
            Some(date) => date,
            None => {
                events.warn(DataQualityWarning::UnresolvableDueDate {
                    period,
                    due_day: self.schedule.due_day,
                });
                return PenaltyCalculation::none(None, 0);
            }
        };

        let payment_date = match payment_date {
            Some(date) => date,
            None => {
                events.warn(DataQualityWarning::MissingPaymentDate { period });
                return PenaltyCalculation::none(Some(due_date), 0);
            }
        };

        let days_late = (payment_date - due_date).num_days();
        if days_late <= 0 {
            return PenaltyCalculation::none(Some(due_date), days_late);
        }

        // no rent, no obligation
        if !base_rent.is_positive() {
            return PenaltyCalculation::none(Some(due_date), days_late);
        }

        let tiers_applied = self.schedule.breakdown(days_late);
        let rate = tiers_applied
            .iter()
            .fold(Rate::ZERO, |total, tier| total + tier.rate);
        let penalty_amount = base_rent.apply_rate(rate);

        tracing::debug!(
            %period,
            %due_date,
            %payment_date,
            days_late,
            %rate,
            %penalty_amount,
            "penalty calculated"
        );

        PenaltyCalculation {
            due_date: Some(due_date),
            days_late,
            rate,
            penalty_amount,
            tiers_applied,
        }
    }
}

/// penalty calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyCalculation {
    /// `None` when the schedule's due day does not exist in the month
    pub due_date: Option<NaiveDate>,
    /// negative when paid ahead of the due date
    pub days_late: i64,
    pub rate: Rate,
    pub penalty_amount: Money,
    pub tiers_applied: Vec<TierCalculation>,
}

impl PenaltyCalculation {
    fn none(due_date: Option<NaiveDate>, days_late: i64) -> Self {
        Self {
            due_date,
            days_late,
            rate: Rate::ZERO,
            penalty_amount: Money::ZERO,
            tiers_applied: Vec::new(),
        }
    }

    /// whole days past the due date, zero when on time
    pub fn days_overdue(&self) -> u32 {
        self.days_late.max(0) as u32
    }
}

/// individual tier contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCalculation {
    pub tier_name: String,
    pub blocks: u32,
    pub rate: Rate,
}
