/// loan workflow - eligibility, pricing, and the officer decision
use sacco_core_rs::{
    AuthContext, LoanDecision, LoanLedger, MemberDirectory, Money, NewMember,
    NotificationDispatcher, PaymentLedger, SaccoConfig, SaccoStore,
};
use sacco_core_rs::gateway::MockGateway;
use sacco_core_rs::types::{EmploymentStatus, Gender, PaymentMethod, Role};
use sacco_core_rs::{SafeTimeProvider, TimeSource, Uuid};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan workflow ===\n");

    let config = SaccoConfig::default();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));

    let store = Arc::new(SaccoStore::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(config.notifications.clone()));
    let gateway = Arc::new(MockGateway::approving());

    let mut directory = MemberDirectory::new(config.clone(), store.clone());
    let member = directory.register(
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

    let mut payments = PaymentLedger::new(store.clone(), gateway, dispatcher.clone());
    let mut loans = LoanLedger::new(config, store, dispatcher);

    // 1. savings first
    println!("1. savings");
    println!("----------");
    payments.record_deposit(member.id, Money::from_major(20_000), PaymentMethod::Mpesa, &time)?;
    println!("  ✓ deposited: Ksh 20000");
    println!("  completed deposits: Ksh {}", payments.completed_deposit_total(member.id).as_decimal());

    // 2. an over-reaching application is refused with every reason
    println!("\n2. eligibility");
    println!("--------------");
    let refused = loans.apply(member.id, Money::from_major(150_000), 12, "expansion", &time);
    println!("  150,000 against 20,000 saved: {}", refused.unwrap_err());

    // 3. a within-limit application is priced by term bracket
    println!("\n3. application");
    println!("--------------");
    let loan = loans.apply(member.id, Money::from_major(90_000), 12, "inventory", &time)?;
    println!("  ✓ applied: Ksh {} over {} months", loan.amount.as_decimal(), loan.term_months);
    println!("  rate: {}%", loan.interest_rate.as_percentage());
    println!("  total repayment: Ksh {}", loan.total_repayment.as_decimal());
    println!("  status: {:?}", loan.status);

    // 4. officer decision
    println!("\n4. decision");
    println!("-----------");
    let officer = AuthContext {
        member_id: Uuid::new_v4(),
        role: Role::LoanOfficer,
    };
    let approved = loans.process(loan.id, officer, LoanDecision::Approve, "savings check out", &time)?;
    println!("  ✓ approved by officer");
    println!("  status: {:?}", approved.status);
    println!("  outstanding: Ksh {}", approved.remaining_balance.as_decimal());
    println!("  pending queue: {}", loans.pending().len());

    Ok(())
}
