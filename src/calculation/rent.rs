use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::events::{DataQualityWarning, EventStore};
use crate::facility::{Facility, ManagerContract};
use crate::types::{ContractId, ReferencePeriod};

/// where a resolved rent came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RentSource {
    Contract(ContractId),
    /// no contract covers the period
    CurrentRent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentResolution {
    pub amount: Money,
    pub source: RentSource,
}

/// finds the rent contractually in effect for a reference period
pub struct RentHistoryResolver;

impl RentHistoryResolver {
    /// resolve the rent for `period`, falling back to the facility's current rent
    pub fn resolve(
        facility: &Facility,
        contracts: &[ManagerContract],
        period: ReferencePeriod,
        events: &mut EventStore,
    ) -> RentResolution {
        let reference_date = period.first_day();

        let covering = contracts
            .iter()
            .filter(|contract| contract.facility_id == facility.id)
            .filter(|contract| contract.covers(reference_date))
            .max_by_key(|contract| (contract.start, contract.id));

        match covering {
            Some(contract) => {
                tracing::debug!(
                    facility_id = %facility.id,
                    %period,
                    contract_id = %contract.id,
                    rent = %contract.monthly_rent,
                    "historical rent resolved"
                );
                RentResolution {
                    amount: contract.monthly_rent.max(Money::ZERO),
                    source: RentSource::Contract(contract.id),
                }
            }
            None => {
                events.warn(DataQualityWarning::CurrentRentFallback {
                    facility_id: facility.id,
                    period,
                    current_rent: facility.monthly_rent,
                });
                RentResolution {
                    amount: facility.monthly_rent.max(Money::ZERO),
                    source: RentSource::CurrentRent,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::tests::{contract, facility};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(month: u32, year: i32) -> ReferencePeriod {
        ReferencePeriod::new(month, year).unwrap()
    }

    #[test]
    fn test_contract_in_effect_wins_over_current_rent() {
        let pac = facility(1, Money::from_major(2_000));
        let history = vec![
            contract(10, 1, Money::from_major(1_000), date(2023, 1, 1), Some(date(2024, 6, 15))),
            contract(11, 1, Money::from_major(2_000), date(2024, 6, 15), None),
        ];
        let mut events = EventStore::new();

        let march = RentHistoryResolver::resolve(&pac, &history, period(3, 2024), &mut events);
        assert_eq!(march.amount, Money::from_major(1_000));
        assert_eq!(march.source, RentSource::Contract(ContractId(10)));

        let june = RentHistoryResolver::resolve(&pac, &history, period(6, 2024), &mut events);
        assert_eq!(june.amount, Money::from_major(1_000));

        let july = RentHistoryResolver::resolve(&pac, &history, period(7, 2024), &mut events);
        assert_eq!(july.amount, Money::from_major(2_000));
        assert_eq!(july.source, RentSource::Contract(ContractId(11)));

        assert_eq!(events.warnings().count(), 0);
    }

    #[test]
    fn test_change_on_first_of_month_prefers_latest_start() {
        let pac = facility(1, Money::from_major(1_500));
        let history = vec![
            contract(10, 1, Money::from_major(1_000), date(2023, 1, 1), Some(date(2024, 5, 1))),
            contract(11, 1, Money::from_major(1_500), date(2024, 5, 1), None),
        ];
        let mut events = EventStore::new();

        let may = RentHistoryResolver::resolve(&pac, &history, period(5, 2024), &mut events);
        assert_eq!(may.source, RentSource::Contract(ContractId(11)));
    }

    #[test]
    fn test_falls_back_to_current_rent_with_warning() {
        let pac = facility(1, Money::from_major(1_200));
        let other_facility = vec![contract(10, 2, Money::from_major(900), date(2020, 1, 1), None)];
        let mut events = EventStore::new();

        let result = RentHistoryResolver::resolve(&pac, &other_facility, period(1, 2025), &mut events);

        assert_eq!(result.amount, Money::from_major(1_200));
        assert_eq!(result.source, RentSource::CurrentRent);
        assert!(matches!(
            events.warnings().next(),
            Some(DataQualityWarning::CurrentRentFallback { .. })
        ));
    }

    #[test]
    fn test_period_before_first_contract_falls_back() {
        let pac = facility(1, Money::from_major(1_200));
        let history = vec![contract(10, 1, Money::from_major(1_000), date(2024, 2, 10), None)];
        let mut events = EventStore::new();

        let result = RentHistoryResolver::resolve(&pac, &history, period(2, 2024), &mut events);
        assert_eq!(result.source, RentSource::CurrentRent);
    }
}
