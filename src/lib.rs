pub mod calculation;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod facility;
pub mod payments;
pub mod storage;
pub mod types;

// re-export key types
pub use calculation::{
    CalculationPipeline, PaymentBreakdown, PenaltyCalculation, PenaltyEngine, PenaltySchedule,
    RentHistoryResolver, RentResolution, RentSource,
};
pub use config::EngineConfig;
pub use decimal::{Money, Rate};
pub use errors::{ErrorKind, PacError, Result};
pub use events::{DataQualityWarning, Event, EventStore, Outcome};
pub use facility::{
    Facility, FacilityService, ManagerChange, ManagerContract, NewFacility, TermsChange,
};
pub use payments::{
    Decision, NewPayment, Payment, PaymentAmendment, PaymentService, Recalculation,
};
pub use storage::{MemoryStore, Store, UnitOfWork};
pub use types::{
    Actor, ConfirmationStatus, ContractId, FacilityId, PaymentId, PaymentStatus,
    ReferencePeriod, Role, UserId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
