use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;
use crate::payments::Payment;
use crate::types::{ConfirmationStatus, FacilityId, PaymentId, ReferencePeriod, Role};

/// coarse error category the HTTP layer maps to a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    InvalidState,
    Storage,
    Configuration,
}

#[derive(Error, Debug)]
pub enum PacError {
    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid reference period: {message}")]
    InvalidReferencePeriod {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("missing required field: {field}")]
    MissingField {
        field: &'static str,
    },

    #[error("reference period {period} is before facility activity start {activity_start}")]
    PeriodBeforeActivity {
        period: ReferencePeriod,
        activity_start: NaiveDate,
    },

    #[error("payment already registered for facility {} in {}", existing.facility_id, existing.period)]
    DuplicatePeriod {
        existing: Box<Payment>,
    },

    #[error("facility not found: {id}")]
    FacilityNotFound {
        id: FacilityId,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: PaymentId,
    },

    #[error("no open contract for facility {id}")]
    ContractNotFound {
        id: FacilityId,
    },

    #[error("role {role:?} may not {action}")]
    Forbidden {
        role: Role,
        action: &'static str,
    },

    #[error("confirmation already decided: current status is {status:?}")]
    ConfirmationAlreadyDecided {
        status: ConfirmationStatus,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: String,
        expected: String,
    },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation {
        constraint: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl PacError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PacError::InvalidAmount { .. }
            | PacError::InvalidReferencePeriod { .. }
            | PacError::InvalidDate { .. }
            | PacError::MissingField { .. }
            | PacError::PeriodBeforeActivity { .. } => ErrorKind::Validation,
            PacError::DuplicatePeriod { .. } => ErrorKind::Conflict,
            PacError::FacilityNotFound { .. }
            | PacError::PaymentNotFound { .. }
            | PacError::ContractNotFound { .. } => ErrorKind::NotFound,
            PacError::Forbidden { .. } => ErrorKind::Forbidden,
            PacError::ConfirmationAlreadyDecided { .. } | PacError::InvalidState { .. } => {
                ErrorKind::InvalidState
            }
            PacError::UniqueViolation { .. } | PacError::Storage { .. } => ErrorKind::Storage,
            PacError::InvalidConfiguration { .. } => ErrorKind::Configuration,
        }
    }

    /// the record a conflict refers to
    pub fn existing_payment(&self) -> Option<&Payment> {
        match self {
            PacError::DuplicatePeriod { existing } => Some(existing),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PacError {
    fn from(e: serde_json::Error) -> Self {
        PacError::InvalidConfiguration {
            message: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PacError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct() {
        let validation = PacError::InvalidAmount { amount: Money::from_major(-1) };
        let not_found = PacError::FacilityNotFound { id: FacilityId(9) };
        let forbidden = PacError::Forbidden { role: Role::Manager, action: "confirm payments" };

        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(forbidden.kind(), ErrorKind::Forbidden);
        assert!(not_found.existing_payment().is_none());
    }

    #[test]
    fn test_messages_name_the_precondition() {
        let err = PacError::PeriodBeforeActivity {
            period: ReferencePeriod::new(1, 2024).unwrap(),
            activity_start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "reference period 01/2024 is before facility activity start 2024-03-01"
        );
    }
}
