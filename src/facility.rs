use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{PacError, Result};
use crate::events::{Event, EventStore, Outcome};
use crate::storage::{Store, UnitOfWork};
use crate::types::{Actor, ContractId, FacilityId, Role, UserId};

/// a PAC: a managed site with a monthly rent obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub name: String,
    pub province: String,
    /// rent in force today; past periods resolve through the contract history
    pub monthly_rent: Money,
    pub manager_id: Option<UserId>,
    /// periods before this date cannot be paid
    pub activity_start: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Facility {
    pub fn is_managed_by(&self, user_id: UserId) -> bool {
        self.manager_id == Some(user_id)
    }
}

/// time-bounded record of the manager and rent that applied to a facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerContract {
    pub id: ContractId,
    pub facility_id: FacilityId,
    pub manager_id: Option<UserId>,
    pub monthly_rent: Money,
    pub start: NaiveDate,
    /// `None` for the current contract
    pub end: Option<NaiveDate>,
}

impl ManagerContract {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// both bounds inclusive
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && self.end.map_or(true, |end| end >= date)
    }
}

/// facility registration request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFacility {
    pub name: String,
    pub province: String,
    pub monthly_rent: Money,
    pub manager_id: Option<UserId>,
    pub activity_start: Option<NaiveDate>,
}

/// what a terms change does to the facility's manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerChange {
    #[default]
    Keep,
    Assign(UserId),
    Unassign,
}

impl ManagerChange {
    pub fn apply(self, current: Option<UserId>) -> Option<UserId> {
        match self {
            ManagerChange::Keep => current,
            ManagerChange::Assign(user_id) => Some(user_id),
            ManagerChange::Unassign => None,
        }
    }
}

/// new manager and/or rent for a facility
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermsChange {
    #[serde(default)]
    pub manager: ManagerChange,
    pub monthly_rent: Option<Money>,
    /// defaults to today
    pub effective: Option<NaiveDate>,
}

/// facility lifecycle: registration and contract history
pub struct FacilityService<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
}

impl<S: Store> FacilityService<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// register a new facility
    pub fn register(
        &self,
        request: NewFacility,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<Outcome<Facility>> {
        if actor.role != Role::Administrator {
            return Err(PacError::Forbidden {
                role: actor.role,
                action: "register facilities",
            });
        }
        if request.name.trim().is_empty() {
            return Err(PacError::MissingField { field: "name" });
        }
        if request.monthly_rent.is_negative() {
            return Err(PacError::InvalidAmount {
                amount: request.monthly_rent,
            });
        }

        let now = time_provider.now();
        let facility = self.store.transaction(|uow| {
            let facility = Facility {
                id: uow.next_facility_id(),
                name: request.name.trim().to_string(),
                province: request.province.trim().to_string(),
                monthly_rent: request.monthly_rent,
                manager_id: request.manager_id,
                activity_start: request.activity_start,
                created_at: now,
            };
            uow.insert_facility(facility.clone())?;
            Ok(facility)
        })?;

        tracing::info!(
            facility_id = %facility.id,
            province = %facility.province,
            rent = %facility.monthly_rent,
            "facility registered"
        );

        let mut events = EventStore::new();
        events.emit(Event::FacilityRegistered {
            facility_id: facility.id,
            monthly_rent: facility.monthly_rent,
            timestamp: now,
        });

        Ok(Outcome::new(facility, events))
    }

    /// change manager and/or rent, closing the current contract and opening a new one
    pub fn change_terms(
        &self,
        facility_id: FacilityId,
        change: TermsChange,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<Outcome<Facility>> {
        if !actor.role.is_privileged() {
            return Err(PacError::Forbidden {
                role: actor.role,
                action: "change facility terms",
            });
        }
        if let Some(rent) = change.monthly_rent {
            if rent.is_negative() {
                return Err(PacError::InvalidAmount { amount: rent });
            }
        }

        let effective = change
            .effective
            .unwrap_or_else(|| self.config.local_date(time_provider.now()));
        let mut events = EventStore::new();

        let facility = self.store.transaction(|uow| {
            let mut facility = uow
                .facility(facility_id)?
                .ok_or(PacError::FacilityNotFound { id: facility_id })?;

            let manager_id = change.manager.apply(facility.manager_id);
            let monthly_rent = change.monthly_rent.unwrap_or(facility.monthly_rent);
            if manager_id == facility.manager_id && monthly_rent == facility.monthly_rent {
                return Ok(facility);
            }

            close_current_terms(uow, &facility, effective, &mut events)?;

            let opened = ManagerContract {
                id: uow.next_contract_id(),
                facility_id,
                manager_id,
                monthly_rent,
                start: effective,
                end: None,
            };
            uow.insert_contract(opened.clone())?;
            events.emit(Event::ContractOpened {
                facility_id,
                contract_id: opened.id,
                manager_id,
                monthly_rent,
                start: effective,
            });

            facility.manager_id = manager_id;
            facility.monthly_rent = monthly_rent;
            uow.update_facility(&facility)?;
            Ok(facility)
        })?;

        if !events.events().is_empty() {
            tracing::info!(
                facility_id = %facility_id,
                %effective,
                rent = %facility.monthly_rent,
                "facility terms changed"
            );
        }

        Ok(Outcome::new(facility, events))
    }

    pub fn facility(&self, facility_id: FacilityId) -> Result<Facility> {
        self.store.read(|uow| {
            uow.facility(facility_id)?
                .ok_or(PacError::FacilityNotFound { id: facility_id })
        })
    }

    /// contract history ordered by start date
    pub fn contracts(&self, facility_id: FacilityId) -> Result<Vec<ManagerContract>> {
        self.store.read(|uow| {
            if uow.facility(facility_id)?.is_none() {
                return Err(PacError::FacilityNotFound { id: facility_id });
            }
            uow.contracts(facility_id)
        })
    }
}

/// end the terms in force at `effective`
fn close_current_terms(
    uow: &mut dyn UnitOfWork,
    facility: &Facility,
    effective: NaiveDate,
    events: &mut EventStore,
) -> Result<()> {
    let contracts = uow.contracts(facility.id)?;

    if let Some(open) = contracts.iter().find(|contract| contract.is_open()) {
        if effective < open.start {
            return Err(PacError::InvalidDate {
                message: format!(
                    "change date {} is before the current contract start {}",
                    effective, open.start
                ),
            });
        }
        let mut closed = open.clone();
        closed.end = Some(effective);
        uow.update_contract(&closed)?;
        events.emit(Event::ContractClosed {
            facility_id: facility.id,
            contract_id: closed.id,
            end: effective,
        });
        return Ok(());
    }

    // without history, record the prior terms so earlier periods keep the old rent
    let start = match contracts.last() {
        Some(last) => last.end.unwrap_or(last.start),
        None => facility.activity_start.unwrap_or(NaiveDate::MIN),
    };
    if effective < start {
        return Err(PacError::InvalidDate {
            message: format!("change date {} is before {}", effective, start),
        });
    }

    let prior = ManagerContract {
        id: uow.next_contract_id(),
        facility_id: facility.id,
        manager_id: facility.manager_id,
        monthly_rent: facility.monthly_rent,
        start,
        end: Some(effective),
    };
    uow.insert_contract(prior.clone())?;
    events.emit(Event::ContractClosed {
        facility_id: facility.id,
        contract_id: prior.id,
        end: effective,
    });
    Ok(())
}
