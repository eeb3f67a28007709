use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::payments::{validate_amount_paid, Payment};
use crate::types::{FacilityId, ReferencePeriod};

/// how much of the pipeline an amendment has to re-run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Recalculation {
    None,
    /// reclassify against the stored amount due
    StatusOnly,
    /// keep the stored base rent, recompute penalty onwards
    Penalty,
    /// re-resolve the historical rent and everything after it
    Full,
}

/// amendable inputs of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmendedField {
    Facility,
    Period,
    PaymentDate,
    AmountPaid,
}

/// which recalculation a changed field triggers
pub const fn recalculation_for(field: AmendedField) -> Recalculation {
    match field {
        AmendedField::Facility => Recalculation::Full,
        AmendedField::Period => Recalculation::Full,
        AmendedField::PaymentDate => Recalculation::Penalty,
        AmendedField::AmountPaid => Recalculation::StatusOnly,
    }
}

/// fields the caller intends to change; `None` leaves the stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentAmendment {
    pub facility_id: Option<FacilityId>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub payment_date: Option<NaiveDate>,
    pub amount_paid: Option<Money>,
}

/// the payment inputs after applying an amendment
#[derive(Debug, Clone, PartialEq)]
pub struct AmendmentTarget {
    pub facility_id: FacilityId,
    pub period: ReferencePeriod,
    pub payment_date: NaiveDate,
    pub amount_paid: Money,
    pub changed: Vec<AmendedField>,
}

impl AmendmentTarget {
    pub fn recalculation(&self) -> Recalculation {
        self.changed
            .iter()
            .map(|field| recalculation_for(*field))
            .max()
            .unwrap_or(Recalculation::None)
    }

    pub fn relocates(&self) -> bool {
        self.changed
            .iter()
            .any(|field| matches!(field, AmendedField::Facility | AmendedField::Period))
    }
}

impl PaymentAmendment {
    /// validate against the stored record and work out what actually changed
    pub fn resolve(&self, stored: &Payment) -> Result<AmendmentTarget> {
        let period = ReferencePeriod::new(
            self.month.unwrap_or(stored.period.month()),
            self.year.unwrap_or(stored.period.year()),
        )?;
        let amount_paid = self.amount_paid.unwrap_or(stored.amount_paid);
        validate_amount_paid(amount_paid)?;
        let facility_id = self.facility_id.unwrap_or(stored.facility_id);
        let payment_date = self.payment_date.unwrap_or(stored.payment_date);

        let mut changed = Vec::new();
        if facility_id != stored.facility_id {
            changed.push(AmendedField::Facility);
        }
        if period != stored.period {
            changed.push(AmendedField::Period);
        }
        if payment_date != stored.payment_date {
            changed.push(AmendedField::PaymentDate);
        }
        if amount_paid != stored.amount_paid {
            changed.push(AmendedField::AmountPaid);
        }

        Ok(AmendmentTarget {
            facility_id,
            period,
            payment_date,
            amount_paid,
            changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::RentSource;
    use crate::types::{ConfirmationStatus, PaymentId, PaymentStatus, UserId};
    use chrono::{TimeZone, Utc};

    fn stored() -> Payment {
        let at = Utc.with_ymd_and_hms(2024, 12, 20, 8, 0, 0).unwrap();
        Payment {
            id: PaymentId(1),
            facility_id: FacilityId(7),
            period: ReferencePeriod::new(11, 2024).unwrap(),
            payment_date: NaiveDate::from_ymd_opt(2024, 12, 20).unwrap(),
            amount_paid: Money::from_major(500),
            base_rent: Money::from_major(1_000),
            rent_source: RentSource::CurrentRent,
            days_late: 15,
            penalty: Money::from_major(50),
            amount_due: Money::from_major(1_050),
            status: PaymentStatus::PartiallyPaid,
            confirmation: ConfirmationStatus::Pending,
            registered_by: UserId(107),
            confirmed_by: None,
            confirmed_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_trigger_table() {
        assert_eq!(recalculation_for(AmendedField::Facility), Recalculation::Full);
        assert_eq!(recalculation_for(AmendedField::Period), Recalculation::Full);
        assert_eq!(recalculation_for(AmendedField::PaymentDate), Recalculation::Penalty);
        assert_eq!(recalculation_for(AmendedField::AmountPaid), Recalculation::StatusOnly);
    }

    #[test]
    fn test_unchanged_values_do_not_count() {
        let amendment = PaymentAmendment {
            month: Some(11),
            amount_paid: Some(Money::from_major(500)),
            ..Default::default()
        };
        let target = amendment.resolve(&stored()).unwrap();
        assert!(target.changed.is_empty());
        assert_eq!(target.recalculation(), Recalculation::None);
    }

    #[test]
    fn test_amount_only_is_status_only() {
        let amendment = PaymentAmendment {
            amount_paid: Some(Money::from_major(1_050)),
            ..Default::default()
        };
        let target = amendment.resolve(&stored()).unwrap();
        assert_eq!(target.changed, vec![AmendedField::AmountPaid]);
        assert_eq!(target.recalculation(), Recalculation::StatusOnly);
        assert!(!target.relocates());
    }

    #[test]
    fn test_strongest_trigger_wins() {
        let amendment = PaymentAmendment {
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            amount_paid: Some(Money::from_major(1_150)),
            ..Default::default()
        };
        assert_eq!(amendment.resolve(&stored()).unwrap().recalculation(), Recalculation::Penalty);

        let amendment = PaymentAmendment {
            year: Some(2023),
            payment_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            ..Default::default()
        };
        let target = amendment.resolve(&stored()).unwrap();
        assert_eq!(target.recalculation(), Recalculation::Full);
        assert!(target.relocates());
    }

    #[test]
    fn test_invalid_amendment_is_rejected() {
        let bad_month = PaymentAmendment { month: Some(13), ..Default::default() };
        assert!(bad_month.resolve(&stored()).is_err());

        let negative = PaymentAmendment {
            amount_paid: Some(Money::from_major(-1)),
            ..Default::default()
        };
        assert!(negative.resolve(&stored()).is_err());
    }
}
