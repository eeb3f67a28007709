use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::payments::Recalculation;
use crate::types::{ContractId, FacilityId, PaymentId, PaymentStatus, ReferencePeriod, UserId};

/// all events emitted by the engine and the services around it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // facility events
    FacilityRegistered {
        facility_id: FacilityId,
        monthly_rent: Money,
        timestamp: DateTime<Utc>,
    },
    ContractClosed {
        facility_id: FacilityId,
        contract_id: ContractId,
        end: NaiveDate,
    },
    ContractOpened {
        facility_id: FacilityId,
        contract_id: ContractId,
        manager_id: Option<UserId>,
        monthly_rent: Money,
        start: NaiveDate,
    },

    // payment events
    PaymentRegistered {
        payment_id: PaymentId,
        facility_id: FacilityId,
        period: ReferencePeriod,
        amount_due: Money,
        status: PaymentStatus,
        registered_by: UserId,
    },
    PaymentAmended {
        payment_id: PaymentId,
        recalculation: Recalculation,
        amount_due: Money,
        status: PaymentStatus,
    },
    PaymentConfirmed {
        payment_id: PaymentId,
        confirmed_by: UserId,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        payment_id: PaymentId,
        rejected_by: UserId,
        timestamp: DateTime<Utc>,
    },

    DataQualityWarning(DataQualityWarning),
}

/// fallbacks taken on partial data; the calculation still proceeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataQualityWarning {
    /// no contract covers the period, current facility rent used instead
    CurrentRentFallback {
        facility_id: FacilityId,
        period: ReferencePeriod,
        current_rent: Money,
    },
    /// the schedule's due day does not exist in the month after the period
    UnresolvableDueDate {
        period: ReferencePeriod,
        due_day: u32,
    },
    /// penalty could not be computed without a payment date
    MissingPaymentDate {
        period: ReferencePeriod,
    },
    /// facility has no recorded start of activity
    MissingActivityStart {
        facility_id: FacilityId,
    },
    /// no payment date supplied, today used
    PaymentDateDefaulted {
        period: ReferencePeriod,
        defaulted_to: NaiveDate,
    },
    ZeroRentWithPayment {
        facility_id: FacilityId,
        period: ReferencePeriod,
        amount_paid: Money,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn warn(&mut self, warning: DataQualityWarning) {
        tracing::warn!(?warning, "data quality fallback");
        self.events.push(Event::DataQualityWarning(warning));
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DataQualityWarning> {
        self.events.iter().filter_map(|event| match event {
            Event::DataQualityWarning(warning) => Some(warning),
            _ => None,
        })
    }
}

/// result of a service call with the events it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub events: Vec<Event>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, mut events: EventStore) -> Self {
        Self {
            value,
            events: events.take_events(),
        }
    }

    pub fn warnings(&self) -> Vec<&DataQualityWarning> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::DataQualityWarning(warning) => Some(warning),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_are_filtered_from_events() {
        let mut events = EventStore::new();
        let period = ReferencePeriod::new(5, 2025).unwrap();

        events.emit(Event::ContractClosed {
            facility_id: FacilityId(1),
            contract_id: ContractId(3),
            end: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        });
        events.warn(DataQualityWarning::MissingPaymentDate { period });

        assert_eq!(events.events().len(), 2);
        let warnings: Vec<_> = events.warnings().collect();
        assert_eq!(warnings, vec![&DataQualityWarning::MissingPaymentDate { period }]);

        let taken = events.take_events();
        assert_eq!(taken.len(), 2);
        assert!(events.events().is_empty());
    }
}
