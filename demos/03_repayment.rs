/// repayment - installments, completion at zero, and the admin view
use sacco_core_rs::{
    AdminDesk, AuthContext, LoanDecision, LoanLedger, MemberDirectory, Money, NewMember,
    NotificationDispatcher, PaymentLedger, SaccoConfig, SaccoStore,
};
use sacco_core_rs::gateway::MockGateway;
use sacco_core_rs::types::{EmploymentStatus, Gender, PaymentMethod, Role};
use sacco_core_rs::{SafeTimeProvider, TimeSource, Uuid};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== repayment ===\n");

    let config = SaccoConfig::default();
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

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
    let mut loans = LoanLedger::new(config, store.clone(), dispatcher);

    payments.record_deposit(member.id, Money::from_major(20_000), PaymentMethod::Mpesa, &time)?;
    let loan = loans.apply(member.id, Money::from_major(90_000), 12, "inventory", &time)?;
    let officer = AuthContext {
        member_id: Uuid::new_v4(),
        role: Role::LoanOfficer,
    };
    loans.process(loan.id, officer, LoanDecision::Approve, "", &time)?;
    println!("active loan: Ksh {} outstanding\n", loan.total_repayment.as_decimal());

    // 1. monthly installments
    println!("1. servicing");
    println!("------------");
    // 103,500 over 12 equal installments
    let installment = Money::from_major(8_625);
    for month in 1..=12 {
        controller.advance(Duration::days(30));
        let outcome = payments.record_repayment(
            loan.id,
            member.id,
            installment,
            PaymentMethod::Mpesa,
            &time,
        )?;
        println!(
            "  month {:>2}: paid Ksh {:>8}, remaining Ksh {:>9}",
            month,
            installment.as_decimal(),
            outcome.loan.remaining_balance.as_decimal()
        );
    }

    // 2. completion
    println!("\n2. completion");
    println!("-------------");
    let settled = loans.loan(loan.id)?;
    println!("  status: {:?}", settled.status);
    println!("  remaining: Ksh {}", settled.remaining_balance.as_decimal());

    let me = AuthContext {
        member_id: member.id,
        role: Role::Member,
    };
    let history = payments.history(loan.id, me)?;
    println!("  payments on record: {}", history.len());

    // 3. admin overview
    println!("\n3. admin overview");
    println!("-----------------");
    let admin = AuthContext {
        member_id: Uuid::new_v4(),
        role: Role::Admin,
    };
    let overview = AdminDesk::new(store).overview(admin, &time)?;
    println!("  approved loan volume: Ksh {}", overview.loans_total.as_decimal());
    println!("  repayments collected: Ksh {}", overview.payments_total.as_decimal());
    println!("  pending approvals: {}", overview.pending_approvals);

    Ok(())
}
