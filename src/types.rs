use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{PacError, Result};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// unique identifier for a facility (PAC)
    FacilityId
);
id_type!(
    /// unique identifier for a payment record
    PaymentId
);
id_type!(
    /// unique identifier for a manager contract
    ContractId
);
id_type!(
    /// opaque reference to a user account
    UserId
);

/// the (month, year) a payment is meant to satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodParts", into = "PeriodParts")]
pub struct ReferencePeriod {
    /// first day of the month; ordering is chronological
    first_day: NaiveDate,
}

/// wire shape of a reference period
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeriodParts {
    pub year: i32,
    pub month: u32,
}

impl ReferencePeriod {
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PacError::InvalidReferencePeriod {
                message: format!("month must be between 1 and 12, got {}", month),
            });
        }
        if !(1000..=9999).contains(&year) {
            return Err(PacError::InvalidReferencePeriod {
                message: format!("year must have 4 digits, got {}", year),
            });
        }
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            PacError::InvalidReferencePeriod {
                message: format!("{:02}/{} is not a calendar month", month, year),
            }
        })?;
        Ok(Self { first_day })
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    /// first calendar day of the period
    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// first day of the following month
    pub fn next_month_start(&self) -> Option<NaiveDate> {
        self.first_day.checked_add_months(Months::new(1))
    }
}

impl TryFrom<PeriodParts> for ReferencePeriod {
    type Error = PacError;

    fn try_from(parts: PeriodParts) -> Result<Self> {
        ReferencePeriod::new(parts.month, parts.year)
    }
}

impl From<ReferencePeriod> for PeriodParts {
    fn from(period: ReferencePeriod) -> Self {
        PeriodParts {
            year: period.year(),
            month: period.month(),
        }
    }
}

impl fmt::Display for ReferencePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month(), self.year())
    }
}

/// sufficiency of the amount paid against the amount due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    PartiallyPaid,
    Pending,
}

/// approval workflow, independent of payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl ConfirmationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationStatus::Pending)
    }
}

/// user roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Supervisor,
    /// manages one or more facilities
    Manager,
}

impl Role {
    /// may confirm payments and change contract terms
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Administrator | Role::Supervisor)
    }
}

/// the user performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn administrator(user_id: i64) -> Self {
        Self::new(UserId(user_id), Role::Administrator)
    }

    pub fn supervisor(user_id: i64) -> Self {
        Self::new(UserId(user_id), Role::Supervisor)
    }

    pub fn manager(user_id: i64) -> Self {
        Self::new(UserId(user_id), Role::Manager)
    }
}
