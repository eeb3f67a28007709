use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::calculation::{CalculationPipeline, PaymentBreakdown, RentResolution};
use crate::config::EngineConfig;
use crate::decimal::Money;
use crate::errors::{PacError, Result};
use crate::events::{DataQualityWarning, Event, EventStore, Outcome};
use crate::facility::Facility;
use crate::payments::confirmation::{self, Decision};
use crate::payments::{
    validate_amount_paid, AmendmentTarget, NewPayment, Payment, PaymentAmendment, Recalculation,
};
use crate::storage::{Store, UnitOfWork};
use crate::types::{
    Actor, ConfirmationStatus, FacilityId, PaymentId, ReferencePeriod,
};

/// registers, amends and confirms payments
pub struct PaymentService<S: Store> {
    store: Arc<S>,
    config: EngineConfig,
    pipeline: CalculationPipeline,
}

impl<S: Store> PaymentService<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = CalculationPipeline::new(&config);
        Ok(Self {
            store,
            config,
            pipeline,
        })
    }

    /// register the payment for a facility's reference period
    pub fn create(
        &self,
        request: NewPayment,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<Outcome<Payment>> {
        let period = ReferencePeriod::new(request.month, request.year)?;
        validate_amount_paid(request.amount_paid)?;

        let now = time_provider.now();
        let mut events = EventStore::new();

        let payment = self.store.transaction(|uow| {
            let facility = load_facility(uow, request.facility_id)?;
            authorize_registration(actor, &facility)?;
            ensure_period_free(uow, facility.id, period, None)?;
            check_activity_start(&facility, period, &mut events)?;

            let payment_date = self.payment_date_or_today(request.payment_date, period, now, &mut events);
            let contracts = uow.contracts(facility.id)?;
            let breakdown = self.pipeline.run(
                &facility,
                &contracts,
                period,
                Some(payment_date),
                request.amount_paid,
                &mut events,
            );
            flag_zero_rent(&facility, &breakdown, &mut events);

            let mut payment = Payment {
                id: uow.next_payment_id(),
                facility_id: facility.id,
                period,
                payment_date,
                amount_paid: request.amount_paid,
                base_rent: Money::ZERO,
                rent_source: breakdown.rent_source,
                days_late: 0,
                penalty: Money::ZERO,
                amount_due: Money::ZERO,
                status: breakdown.status,
                confirmation: ConfirmationStatus::Pending,
                registered_by: actor.user_id,
                confirmed_by: None,
                confirmed_at: None,
                created_at: now,
                updated_at: now,
            };
            payment.apply_breakdown(&breakdown);

            insert_payment(uow, payment.clone())?;
            Ok(payment)
        })?;

        tracing::info!(
            payment_id = %payment.id,
            facility_id = %payment.facility_id,
            period = %payment.period,
            amount_due = %payment.amount_due,
            status = ?payment.status,
            "payment registered"
        );
        events.emit(Event::PaymentRegistered {
            payment_id: payment.id,
            facility_id: payment.facility_id,
            period: payment.period,
            amount_due: payment.amount_due,
            status: payment.status,
            registered_by: payment.registered_by,
        });

        Ok(Outcome::new(payment, events))
    }

    /// apply an amendment, re-running only the steps its changed fields trigger
    pub fn amend(
        &self,
        payment_id: PaymentId,
        amendment: PaymentAmendment,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<Outcome<Payment>> {
        let now = time_provider.now();
        let mut events = EventStore::new();

        let (payment, recalculation) = self.store.transaction(|uow| {
            let stored = uow
                .payment(payment_id)?
                .ok_or(PacError::PaymentNotFound { id: payment_id })?;
            if stored.confirmation.is_terminal() {
                return Err(PacError::InvalidState {
                    current: format!("{:?}", stored.confirmation),
                    expected: format!("{:?}", ConfirmationStatus::Pending),
                });
            }

            let current_facility = load_facility(uow, stored.facility_id)?;
            authorize_registration(actor, &current_facility)?;

            let target = amendment.resolve(&stored)?;
            let recalculation = target.recalculation();
            if recalculation == Recalculation::None {
                return Ok((stored, recalculation));
            }

            let mut payment = stored.clone();
            match recalculation {
                Recalculation::None => {}
                Recalculation::StatusOnly => {
                    payment.amount_paid = target.amount_paid;
                    payment.status = self.pipeline.reclassify(target.amount_paid, stored.amount_due);
                }
                Recalculation::Penalty => {
                    let rent = RentResolution {
                        amount: stored.base_rent,
                        source: stored.rent_source,
                    };
                    let breakdown = self.pipeline.run_with_rent(
                        rent,
                        target.period,
                        Some(target.payment_date),
                        target.amount_paid,
                        &mut events,
                    );
                    payment.apply_breakdown(&breakdown);
                }
                Recalculation::Full => {
                    let facility = if target.facility_id == current_facility.id {
                        current_facility
                    } else {
                        let facility = load_facility(uow, target.facility_id)?;
                        authorize_registration(actor, &facility)?;
                        facility
                    };
                    let breakdown = self.rerun_relocated(uow, &stored, &target, &facility, &mut events)?;
                    payment.facility_id = facility.id;
                    payment.apply_breakdown(&breakdown);
                }
            }
            payment.updated_at = now;

            update_payment(uow, &payment)?;
            Ok((payment, recalculation))
        })?;

        if recalculation != Recalculation::None {
            tracing::info!(
                payment_id = %payment.id,
                ?recalculation,
                amount_due = %payment.amount_due,
                status = ?payment.status,
                "payment amended"
            );
            events.emit(Event::PaymentAmended {
                payment_id: payment.id,
                recalculation,
                amount_due: payment.amount_due,
                status: payment.status,
            });
        }

        Ok(Outcome::new(payment, events))
    }

    /// confirm or reject a pending payment
    pub fn confirm_or_reject(
        &self,
        payment_id: PaymentId,
        decision: Decision,
        actor: &Actor,
        time_provider: &SafeTimeProvider,
    ) -> Result<Outcome<Payment>> {
        if !actor.role.is_privileged() {
            return Err(PacError::Forbidden {
                role: actor.role,
                action: "confirm or reject payments",
            });
        }

        let now = time_provider.now();
        let payment = self.store.transaction(|uow| {
            let mut payment = uow
                .payment(payment_id)?
                .ok_or(PacError::PaymentNotFound { id: payment_id })?;

            payment.confirmation = confirmation::transition(payment.confirmation, decision)?;
            payment.confirmed_by = Some(actor.user_id);
            payment.confirmed_at = Some(now);
            payment.updated_at = now;

            uow.update_payment(&payment)?;
            Ok(payment)
        })?;

        tracing::info!(
            payment_id = %payment.id,
            confirmation = ?payment.confirmation,
            user_id = %actor.user_id,
            "payment confirmation decided"
        );

        let mut events = EventStore::new();
        events.emit(match decision {
            Decision::Confirm => Event::PaymentConfirmed {
                payment_id,
                confirmed_by: actor.user_id,
                timestamp: now,
            },
            Decision::Reject => Event::PaymentRejected {
                payment_id,
                rejected_by: actor.user_id,
                timestamp: now,
            },
        });

        Ok(Outcome::new(payment, events))
    }

    /// run the pipeline without persisting anything
    pub fn quote(
        &self,
        facility_id: FacilityId,
        month: u32,
        year: i32,
        payment_date: Option<NaiveDate>,
        amount_paid: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<Outcome<PaymentBreakdown>> {
        let period = ReferencePeriod::new(month, year)?;
        validate_amount_paid(amount_paid)?;

        let now = time_provider.now();
        let mut events = EventStore::new();

        let breakdown = self.store.read(|uow| {
            let facility = load_facility(uow, facility_id)?;
            let payment_date = self.payment_date_or_today(payment_date, period, now, &mut events);
            let contracts = uow.contracts(facility.id)?;
            let breakdown = self.pipeline.run(
                &facility,
                &contracts,
                period,
                Some(payment_date),
                amount_paid,
                &mut events,
            );
            flag_zero_rent(&facility, &breakdown, &mut events);
            Ok(breakdown)
        })?;

        Ok(Outcome::new(breakdown, events))
    }

    pub fn payment(&self, payment_id: PaymentId) -> Result<Payment> {
        self.store.read(|uow| {
            uow.payment(payment_id)?
                .ok_or(PacError::PaymentNotFound { id: payment_id })
        })
    }

    /// payments of a facility ordered by reference period
    pub fn payments_for_facility(&self, facility_id: FacilityId) -> Result<Vec<Payment>> {
        self.store.read(|uow| {
            load_facility(uow, facility_id)?;
            uow.payments_for_facility(facility_id)
        })
    }

    fn payment_date_or_today(
        &self,
        payment_date: Option<NaiveDate>,
        period: ReferencePeriod,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> NaiveDate {
        match payment_date {
            Some(date) => date,
            None => {
                let today = self.config.local_date(now);
                events.warn(DataQualityWarning::PaymentDateDefaulted {
                    period,
                    defaulted_to: today,
                });
                today
            }
        }
    }

    /// full re-run for an amendment, re-checking the slot it moves to
    fn rerun_relocated(
        &self,
        uow: &mut dyn UnitOfWork,
        stored: &Payment,
        target: &AmendmentTarget,
        facility: &Facility,
        events: &mut EventStore,
    ) -> Result<PaymentBreakdown> {
        if target.relocates() {
            ensure_period_free(uow, facility.id, target.period, Some(stored.id))?;
            check_activity_start(facility, target.period, events)?;
        }

        let contracts = uow.contracts(facility.id)?;
        let breakdown = self.pipeline.run(
            facility,
            &contracts,
            target.period,
            Some(target.payment_date),
            target.amount_paid,
            events,
        );
        flag_zero_rent(facility, &breakdown, events);
        Ok(breakdown)
    }
}

fn load_facility(uow: &dyn UnitOfWork, facility_id: FacilityId) -> Result<Facility> {
    uow.facility(facility_id)?
        .ok_or(PacError::FacilityNotFound { id: facility_id })
}

/// privileged roles may register for any facility, managers only for their own
fn authorize_registration(actor: &Actor, facility: &Facility) -> Result<()> {
    if actor.role.is_privileged() || facility.is_managed_by(actor.user_id) {
        return Ok(());
    }
    Err(PacError::Forbidden {
        role: actor.role,
        action: "register payments for this facility",
    })
}

fn ensure_period_free(
    uow: &dyn UnitOfWork,
    facility_id: FacilityId,
    period: ReferencePeriod,
    except: Option<PaymentId>,
) -> Result<()> {
    match uow.payment_for_period(facility_id, period)? {
        Some(existing) if Some(existing.id) != except => Err(PacError::DuplicatePeriod {
            existing: Box::new(existing),
        }),
        _ => Ok(()),
    }
}

fn check_activity_start(
    facility: &Facility,
    period: ReferencePeriod,
    events: &mut EventStore,
) -> Result<()> {
    match facility.activity_start {
        Some(activity_start) if period.first_day() < activity_start => {
            Err(PacError::PeriodBeforeActivity {
                period,
                activity_start,
            })
        }
        Some(_) => Ok(()),
        None => {
            events.warn(DataQualityWarning::MissingActivityStart {
                facility_id: facility.id,
            });
            Ok(())
        }
    }
}

fn flag_zero_rent(facility: &Facility, breakdown: &PaymentBreakdown, events: &mut EventStore) {
    if !breakdown.base_rent.is_positive() && breakdown.amount_paid.is_positive() {
        events.warn(DataQualityWarning::ZeroRentWithPayment {
            facility_id: facility.id,
            period: breakdown.period,
            amount_paid: breakdown.amount_paid,
        });
    }
}

/// a unique violation on insert is the duplicate-period conflict
fn insert_payment(uow: &mut dyn UnitOfWork, payment: Payment) -> Result<()> {
    let (facility_id, period) = (payment.facility_id, payment.period);
    match uow.insert_payment(payment) {
        Err(PacError::UniqueViolation { .. }) => {
            ensure_period_free(uow, facility_id, period, None)?;
            Err(PacError::Storage {
                message: format!("payment slot {} {} unavailable", facility_id, period),
            })
        }
        other => other,
    }
}

fn update_payment(uow: &mut dyn UnitOfWork, payment: &Payment) -> Result<()> {
    match uow.update_payment(payment) {
        Err(PacError::UniqueViolation { .. }) => {
            ensure_period_free(uow, payment.facility_id, payment.period, Some(payment.id))?;
            Err(PacError::Storage {
                message: format!("payment slot {} {} unavailable", payment.facility_id, payment.period),
            })
        }
        other => other,
    }
}
