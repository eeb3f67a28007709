/// quick start - register a PAC, record late rent and confirm it
use std::sync::Arc;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use pac_rent_rs::{
    Actor, Decision, EngineConfig, FacilityService, MemoryStore, Money, NewFacility, NewPayment,
    PaymentAmendment, PaymentService, SafeTimeProvider, TermsChange, TimeSource, UserId,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 12, 20, 8, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let store = Arc::new(MemoryStore::new());
    let facilities = FacilityService::new(store.clone(), EngineConfig::default());
    let payments = PaymentService::new(store, EngineConfig::default())?;

    let admin = Actor::administrator(1);
    let supervisor = Actor::supervisor(2);
    let manager = Actor::manager(10);

    let pac = facilities
        .register(
            NewFacility {
                name: "PAC Chamanculo".to_string(),
                province: "Maputo".to_string(),
                monthly_rent: Money::from_major(1_000),
                manager_id: Some(UserId(10)),
                activity_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            },
            &admin,
            &time,
        )?
        .value;
    println!("registered {} ({}), rent {} MZN", pac.name, pac.id, pac.monthly_rent);

    // november rent paid on 2024-12-20, fifteen days after the due date
    let november = payments
        .create(
            NewPayment {
                facility_id: pac.id,
                month: 11,
                year: 2024,
                payment_date: None,
                amount_paid: Money::from_major(1_000),
            },
            &manager,
            &time,
        )?
        .value;
    println!(
        "11/2024: {} days late, penalty {}, due {}, outstanding {}, {:?}",
        november.days_late,
        november.penalty,
        november.amount_due,
        november.outstanding(),
        november.status
    );

    let november = payments
        .amend(
            november.id,
            PaymentAmendment {
                amount_paid: Some(Money::from_major(1_050)),
                ..Default::default()
            },
            &manager,
            &time,
        )?
        .value;
    println!("amended: paid {}, {:?}", november.amount_paid, november.status);

    let november = payments
        .confirm_or_reject(november.id, Decision::Confirm, &supervisor, &time)?
        .value;
    println!("confirmation: {:?}", november.confirmation);

    // rent goes up from january
    facilities.change_terms(
        pac.id,
        TermsChange {
            monthly_rent: Some(Money::from_major(1_200)),
            effective: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        },
        &admin,
        &time,
    )?;

    controller.advance(Duration::days(60));

    // december still resolves to the old rent
    let quote = payments.quote(pac.id, 12, 2024, None, Money::ZERO, &time)?;
    println!(
        "12/2024 quote: rent {}, penalty {} ({}), due {}",
        quote.value.base_rent,
        quote.value.penalty.penalty_amount,
        quote.value.penalty.rate,
        quote.value.amount_due
    );
    for warning in quote.warnings() {
        println!("warning: {:?}", warning);
    }

    for payment in payments.payments_for_facility(pac.id)? {
        println!("{}", serde_json::to_string_pretty(&payment)?);
    }

    Ok(())
}
