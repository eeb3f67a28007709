pub mod amendment;
pub mod confirmation;
pub mod service;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calculation::{PaymentBreakdown, RentSource};
use crate::decimal::Money;
use crate::errors::{PacError, Result};
use crate::types::{
    ConfirmationStatus, FacilityId, PaymentId, PaymentStatus, ReferencePeriod, UserId,
};

pub use amendment::{recalculation_for, AmendedField, AmendmentTarget, PaymentAmendment, Recalculation};
pub use confirmation::Decision;
pub use service::PaymentService;

/// one rent payment per (facility, month, year)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub facility_id: FacilityId,
    pub period: ReferencePeriod,
    pub payment_date: NaiveDate,
    pub amount_paid: Money,
    /// historical rent applied to the period
    pub base_rent: Money,
    pub rent_source: RentSource,
    pub days_late: u32,
    pub penalty: Money,
    pub amount_due: Money,
    pub status: PaymentStatus,
    pub confirmation: ConfirmationStatus,
    pub registered_by: UserId,
    pub confirmed_by: Option<UserId>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// copy every computed figure from a pipeline run
    pub fn apply_breakdown(&mut self, breakdown: &PaymentBreakdown) {
        self.period = breakdown.period;
        self.amount_paid = breakdown.amount_paid;
        self.base_rent = breakdown.base_rent;
        self.rent_source = breakdown.rent_source;
        self.days_late = breakdown.penalty.days_overdue();
        self.penalty = breakdown.penalty.penalty_amount;
        self.amount_due = breakdown.amount_due;
        self.status = breakdown.status;
        if let Some(date) = breakdown.payment_date {
            self.payment_date = date;
        }
    }

    pub fn outstanding(&self) -> Money {
        (self.amount_due - self.amount_paid).max(Money::ZERO)
    }
}

/// payment registration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub facility_id: FacilityId,
    pub month: u32,
    pub year: i32,
    /// defaults to today
    pub payment_date: Option<NaiveDate>,
    pub amount_paid: Money,
}

pub(crate) fn validate_amount_paid(amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(PacError::InvalidAmount { amount });
    }
    Ok(())
}

/// parse an ISO-8601 date, dropping any time of day
pub fn parse_payment_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return Err(PacError::MissingField { field: "payment_date" });
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(input) {
        return Ok(datetime.date_naive());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(datetime.date());
    }

    Err(PacError::InvalidDate {
        message: format!("'{}' is not an ISO-8601 date", input),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(parse_payment_date("2024-12-05").unwrap(), date(2024, 12, 5));
        assert_eq!(parse_payment_date(" 2024-12-05 ").unwrap(), date(2024, 12, 5));
    }

    #[test]
    fn test_parse_drops_time_of_day() {
        assert_eq!(parse_payment_date("2024-12-05T23:59:59+02:00").unwrap(), date(2024, 12, 5));
        assert_eq!(parse_payment_date("2024-12-05T10:00:00Z").unwrap(), date(2024, 12, 5));
        assert_eq!(parse_payment_date("2024-12-05T10:00:00.000").unwrap(), date(2024, 12, 5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_payment_date("05/12/2024").unwrap_err().kind(), ErrorKind::Validation);
        assert_eq!(parse_payment_date("2024-02-30").unwrap_err().kind(), ErrorKind::Validation);
        assert!(matches!(
            parse_payment_date(""),
            Err(PacError::MissingField { field: "payment_date" })
        ));
    }

    #[test]
    fn test_negative_amount_is_invalid() {
        assert!(validate_amount_paid(Money::ZERO).is_ok());
        assert!(validate_amount_paid(Money::from_major(-5)).is_err());
    }
}
