pub mod memory;

use crate::errors::Result;
use crate::facility::{Facility, ManagerContract};
use crate::payments::Payment;
use crate::types::{ContractId, FacilityId, PaymentId, ReferencePeriod};

pub use memory::MemoryStore;

/// reads and writes available inside one transaction
pub trait UnitOfWork {
    fn facility(&self, id: FacilityId) -> Result<Option<Facility>>;
    fn next_facility_id(&mut self) -> FacilityId;
    fn insert_facility(&mut self, facility: Facility) -> Result<()>;
    fn update_facility(&mut self, facility: &Facility) -> Result<()>;

    /// contracts of a facility ordered by start date
    fn contracts(&self, facility_id: FacilityId) -> Result<Vec<ManagerContract>>;
    fn next_contract_id(&mut self) -> ContractId;
    fn insert_contract(&mut self, contract: ManagerContract) -> Result<()>;
    fn update_contract(&mut self, contract: &ManagerContract) -> Result<()>;

    fn payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    fn payment_for_period(
        &self,
        facility_id: FacilityId,
        period: ReferencePeriod,
    ) -> Result<Option<Payment>>;
    /// payments of a facility ordered by reference period
    fn payments_for_facility(&self, facility_id: FacilityId) -> Result<Vec<Payment>>;
    fn next_payment_id(&mut self) -> PaymentId;
    /// fails with a unique violation if the (facility, period) slot is taken
    fn insert_payment(&mut self, payment: Payment) -> Result<()>;
    fn update_payment(&mut self, payment: &Payment) -> Result<()>;
}

/// transactional storage backend
pub trait Store: Send + Sync {
    /// run `work` atomically; `Ok` commits, `Err` rolls every write back
    fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&mut dyn UnitOfWork) -> Result<T>;

    /// run read-only `work` against the committed state
    fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&dyn UnitOfWork) -> Result<T>;
}
