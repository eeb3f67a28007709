use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::errors::{PacError, Result};
use crate::facility::{Facility, ManagerContract};
use crate::payments::Payment;
use crate::storage::{Store, UnitOfWork};
use crate::types::{ContractId, FacilityId, PaymentId, ReferencePeriod};

#[derive(Debug, Clone, Default)]
struct Tables {
    facilities: BTreeMap<FacilityId, Facility>,
    contracts: BTreeMap<ContractId, ManagerContract>,
    payments: BTreeMap<PaymentId, Payment>,
    last_facility_id: i64,
    last_contract_id: i64,
    last_payment_id: i64,
}

impl UnitOfWork for Tables {
    fn facility(&self, id: FacilityId) -> Result<Option<Facility>> {
        Ok(self.facilities.get(&id).cloned())
    }

    fn next_facility_id(&mut self) -> FacilityId {
        self.last_facility_id += 1;
        FacilityId(self.last_facility_id)
    }

    fn insert_facility(&mut self, facility: Facility) -> Result<()> {
        if self.facilities.contains_key(&facility.id) {
            return Err(PacError::UniqueViolation {
                constraint: format!("facilities.id = {}", facility.id),
            });
        }
        self.facilities.insert(facility.id, facility);
        Ok(())
    }

    fn update_facility(&mut self, facility: &Facility) -> Result<()> {
        match self.facilities.get_mut(&facility.id) {
            Some(row) => {
                *row = facility.clone();
                Ok(())
            }
            None => Err(PacError::FacilityNotFound { id: facility.id }),
        }
    }

    fn contracts(&self, facility_id: FacilityId) -> Result<Vec<ManagerContract>> {
        let mut contracts: Vec<_> = self
            .contracts
            .values()
            .filter(|contract| contract.facility_id == facility_id)
            .cloned()
            .collect();
        contracts.sort_by_key(|contract| (contract.start, contract.id));
        Ok(contracts)
    }

    fn next_contract_id(&mut self) -> ContractId {
        self.last_contract_id += 1;
        ContractId(self.last_contract_id)
    }

    fn insert_contract(&mut self, contract: ManagerContract) -> Result<()> {
        if contract.is_open()
            && self
                .contracts
                .values()
                .any(|other| other.facility_id == contract.facility_id && other.is_open())
        {
            return Err(PacError::UniqueViolation {
                constraint: format!("one open contract per facility ({})", contract.facility_id),
            });
        }
        self.contracts.insert(contract.id, contract);
        Ok(())
    }

    fn update_contract(&mut self, contract: &ManagerContract) -> Result<()> {
        match self.contracts.get_mut(&contract.id) {
            Some(row) => {
                *row = contract.clone();
                Ok(())
            }
            None => Err(PacError::ContractNotFound { id: contract.facility_id }),
        }
    }

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.payments.get(&id).cloned())
    }

    fn payment_for_period(
        &self,
        facility_id: FacilityId,
        period: ReferencePeriod,
    ) -> Result<Option<Payment>> {
        Ok(self
            .payments
            .values()
            .find(|payment| payment.facility_id == facility_id && payment.period == period)
            .cloned())
    }

    fn payments_for_facility(&self, facility_id: FacilityId) -> Result<Vec<Payment>> {
        let mut payments: Vec<_> = self
            .payments
            .values()
            .filter(|payment| payment.facility_id == facility_id)
            .cloned()
            .collect();
        payments.sort_by_key(|payment| payment.period);
        Ok(payments)
    }

    fn next_payment_id(&mut self) -> PaymentId {
        self.last_payment_id += 1;
        PaymentId(self.last_payment_id)
    }

    fn insert_payment(&mut self, payment: Payment) -> Result<()> {
        self.check_period_slot(&payment)?;
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    fn update_payment(&mut self, payment: &Payment) -> Result<()> {
        if !self.payments.contains_key(&payment.id) {
            return Err(PacError::PaymentNotFound { id: payment.id });
        }
        self.check_period_slot(payment)?;
        self.payments.insert(payment.id, payment.clone());
        Ok(())
    }
}

impl Tables {
    /// unique (facility, month, year)
    fn check_period_slot(&self, payment: &Payment) -> Result<()> {
        let taken = self.payments.values().any(|other| {
            other.id != payment.id
                && other.facility_id == payment.facility_id
                && other.period == payment.period
        });
        if taken {
            return Err(PacError::UniqueViolation {
                constraint: format!(
                    "payments (facility_id, month, year) = ({}, {}, {})",
                    payment.facility_id,
                    payment.period.month(),
                    payment.period.year()
                ),
            });
        }
        Ok(())
    }
}

/// in-memory store; transactions are serialised and work on a copy of the tables.
/// the copy makes every write transaction O(size of the store), reads go through `read`
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// make the next commit fail, for exercising rollback paths
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl Store for MemoryStore {
    fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T>,
    {
        let mut committed = self.tables.lock().map_err(|_| PacError::Storage {
            message: "store lock poisoned".to_string(),
        })?;

        let mut working = committed.clone();
        let output = work(&mut working)?;

        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            tracing::error!("commit failed, transaction rolled back");
            return Err(PacError::Storage {
                message: "commit failed".to_string(),
            });
        }

        *committed = working;
        Ok(output)
    }

    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn UnitOfWork) -> Result<T>,
    {
        let committed = self.tables.lock().map_err(|_| PacError::Storage {
            message: "store lock poisoned".to_string(),
        })?;
        work(&*committed)
    }
}
