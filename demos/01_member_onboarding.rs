/// member onboarding - registration, login, and profile upkeep
use sacco_core_rs::{MemberDirectory, Money, NewMember, ProfileUpdate, SaccoConfig, SaccoStore};
use sacco_core_rs::{SafeTimeProvider, TimeSource};
use sacco_core_rs::types::{EmploymentStatus, Gender};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== member onboarding ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));

    let store = Arc::new(SaccoStore::new());
    let mut directory = MemberDirectory::new(SaccoConfig::default(), store);

    // 1. registration
    println!("1. registration");
    println!("---------------");
    let profile = directory.register(
        NewMember {
            full_name: "Grace Njeri".to_string(),
            email: "grace@example.com".to_string(),
            password: "a-strong-phrase".to_string(),
            phone_number: "+254700000001".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 2, 10).unwrap(),
            gender: Gender::Female,
            national_id: "34567890".to_string(),
            nationality: "Kenyan".to_string(),
            employment: EmploymentStatus::Salaried,
            monthly_income: Money::from_major(20_000),
            role: None,
        },
        &time,
    )?;
    println!("  ✓ registered: {}", profile.full_name);
    println!("  member id: {}", profile.id);
    println!("  role: {:?}", profile.role);

    // duplicate registrations are refused
    let duplicate = directory.register(
        NewMember {
            full_name: "Grace N.".to_string(),
            email: "grace@example.com".to_string(),
            password: "another-phrase".to_string(),
            phone_number: "+254700000002".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 2, 10).unwrap(),
            gender: Gender::Female,
            national_id: "99999999".to_string(),
            nationality: "Kenyan".to_string(),
            employment: EmploymentStatus::Salaried,
            monthly_income: Money::from_major(20_000),
            role: None,
        },
        &time,
    );
    println!("  duplicate email: {}", duplicate.unwrap_err());

    // 2. authentication
    println!("\n2. authentication");
    println!("-----------------");
    let token = directory.authenticate("grace@example.com", "a-strong-phrase", &time)?;
    let ctx = directory.verify_token(&token, &time)?;
    println!("  ✓ session issued for {}", ctx.member_id);

    let bad = directory.authenticate("grace@example.com", "wrong-phrase", &time);
    println!("  wrong password: {}", bad.unwrap_err());

    // 3. profile upkeep
    println!("\n3. profile upkeep");
    println!("-----------------");
    let updated = directory.update_profile(
        profile.id,
        ProfileUpdate {
            phone_number: Some("+254711111111".to_string()),
            monthly_income: Some(Money::from_major(25_000)),
            ..Default::default()
        },
        ctx,
    )?;
    println!("  ✓ phone: {}", updated.phone_number);
    println!("  ✓ income: Ksh {}", updated.monthly_income.as_decimal());

    Ok(())
}
