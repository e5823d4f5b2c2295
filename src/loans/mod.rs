use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SaccoConfig;
use crate::decimal::{Money, Rate};
use crate::eligibility::{self, LoanRequest, RejectionReason};
use crate::errors::{Result, SaccoError};
use crate::events::{Event, EventStore};
use crate::members::AuthContext;
use crate::notifications::{Notification, NotificationDispatcher};
use crate::store::SaccoStore;
use crate::types::{LoanId, LoanStatus, MemberId};

/// a loan record and its repayment accounting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub member_id: MemberId,
    pub amount: Money,
    pub term_months: u32,
    pub interest_rate: Rate,
    pub purpose: String,
    pub status: LoanStatus,
    /// principal plus simple interest, fixed at application time
    pub total_repayment: Money,
    /// outstanding amount; non-increasing while active
    pub remaining_balance: Money,
    pub applied_at: DateTime<Utc>,
    pub processed_by: Option<MemberId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub officer_note: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// officer decision on a pending application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanDecision {
    Approve,
    Reject,
}

/// owns loan records and their status transitions; prices applications
/// and hands repayment-driven completion to the payment ledger
pub struct LoanLedger {
    config: SaccoConfig,
    store: Arc<SaccoStore>,
    dispatcher: Arc<NotificationDispatcher>,
    pub events: EventStore,
}

impl LoanLedger {
    pub fn new(
        config: SaccoConfig,
        store: Arc<SaccoStore>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            config,
            store,
            dispatcher,
            events: EventStore::new(),
        }
    }

    /// apply for a loan: run the eligibility policy against the member's
    /// profile and completed deposits, price the loan by term bracket,
    /// and record it as pending
    ///
    /// The policy check and the insert share one store critical section,
    /// so two concurrent applications by the same member cannot both
    /// pass the duplicate check.
    pub fn apply(
        &mut self,
        member_id: MemberId,
        amount: Money,
        term_months: u32,
        purpose: &str,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        let now = time.now();
        let (loan, applicant_email, applicant_name) = {
            let mut inner = self.store.lock();

            let profile = inner.member(member_id)?.profile.clone();
            let deposit_total = inner.completed_deposit_total(member_id);
            let has_open_loan = inner.open_loan_exists(member_id);

            let request = LoanRequest {
                profile: &profile,
                amount,
                term_months,
                purpose,
                completed_deposit_total: deposit_total,
                has_open_loan,
            };

            if let Err(reasons) = eligibility::evaluate(&request, &self.config.policy, now) {
                return Err(rejection_error(reasons));
            }

            let rate = self.config.pricing.rate_for_term(term_months);
            let interest = amount.simple_interest(rate, term_months);
            let total_repayment = amount + interest;

            let loan = Loan {
                id: Uuid::new_v4(),
                member_id,
                amount,
                term_months,
                interest_rate: rate,
                purpose: purpose.trim().to_string(),
                status: LoanStatus::Pending,
                total_repayment,
                remaining_balance: total_repayment,
                applied_at: now,
                processed_by: None,
                approved_at: None,
                rejected_at: None,
                officer_note: None,
                completed_at: None,
            };
            inner.loans.insert(loan.id, loan.clone());

            (loan, profile.email, profile.full_name)
        };

        self.events.emit(Event::LoanApplied {
            loan_id: loan.id,
            member_id,
            amount,
            term_months,
            total_repayment: loan.total_repayment,
            timestamp: now,
        });

        // best effort, decoupled from the application itself
        self.dispatcher.enqueue(
            Notification::loan_application_received(
                &applicant_email,
                &applicant_name,
                amount,
                term_months,
                loan.total_repayment,
            ),
            time,
        );
        self.dispatcher.enqueue(
            Notification::application_awaiting_review(
                &self.config.notifications.officer_desk,
                &applicant_name,
                amount,
            ),
            time,
        );

        Ok(loan)
    }

    /// approve or reject a pending application
    ///
    /// The decision is durable once the store section commits; a failed
    /// notification afterwards never rolls it back.
    pub fn process(
        &mut self,
        loan_id: LoanId,
        officer: AuthContext,
        decision: LoanDecision,
        note: &str,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        let now = time.now();
        if !officer.role.can_process_loans() {
            return Err(SaccoError::Authorization {
                message: "only loan officers can process applications".to_string(),
            });
        }

        let (loan, applicant_email, applicant_name) = {
            let mut inner = self.store.lock();

            let current = inner.loan(loan_id)?.status;
            if current != LoanStatus::Pending {
                return Err(SaccoError::InvalidLoanState {
                    current,
                    expected: LoanStatus::Pending,
                });
            }

            let member_id = inner.loan(loan_id)?.member_id;
            let profile = inner.member(member_id)?.profile.clone();

            let loan = inner.loan_mut(loan_id)?;
            loan.processed_by = Some(officer.member_id);
            loan.officer_note = if note.is_empty() {
                None
            } else {
                Some(note.to_string())
            };
            match decision {
                LoanDecision::Approve => {
                    loan.status = LoanStatus::Active;
                    loan.approved_at = Some(now);
                }
                LoanDecision::Reject => {
                    loan.status = LoanStatus::Rejected;
                    loan.rejected_at = Some(now);
                }
            }

            (loan.clone(), profile.email, profile.full_name)
        };

        match decision {
            LoanDecision::Approve => self.events.emit(Event::LoanApproved {
                loan_id,
                officer_id: officer.member_id,
                timestamp: now,
            }),
            LoanDecision::Reject => self.events.emit(Event::LoanRejected {
                loan_id,
                officer_id: officer.member_id,
                timestamp: now,
            }),
        }

        self.dispatcher.enqueue(
            Notification::loan_decision(
                &applicant_email,
                &applicant_name,
                decision == LoanDecision::Approve,
                note,
            ),
            time,
        );

        Ok(loan)
    }

    /// write off an active loan as unrecoverable
    pub fn mark_defaulted(
        &mut self,
        loan_id: LoanId,
        officer: AuthContext,
        time: &SafeTimeProvider,
    ) -> Result<Loan> {
        if !officer.role.can_process_loans() {
            return Err(SaccoError::Authorization {
                message: "only loan officers can write off loans".to_string(),
            });
        }

        let loan = {
            let mut inner = self.store.lock();
            let loan = inner.loan_mut(loan_id)?;
            if loan.status != LoanStatus::Active {
                return Err(SaccoError::InvalidLoanState {
                    current: loan.status,
                    expected: LoanStatus::Active,
                });
            }
            loan.status = LoanStatus::Defaulted;
            loan.clone()
        };

        self.events.emit(Event::LoanDefaulted {
            loan_id,
            written_off_balance: loan.remaining_balance,
            timestamp: time.now(),
        });

        Ok(loan)
    }

    /// fetch a single loan
    pub fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store.lock().loan(loan_id).cloned()
    }

    /// loans belonging to one member, most recent first
    pub fn loans_for_member(&self, member_id: MemberId) -> Vec<Loan> {
        let inner = self.store.lock();
        let mut loans: Vec<Loan> = inner
            .loans
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        loans
    }

    /// applications awaiting an officer decision, most recent first
    pub fn pending(&self) -> Vec<Loan> {
        let inner = self.store.lock();
        let mut loans: Vec<Loan> = inner
            .loans
            .values()
            .filter(|l| l.status == LoanStatus::Pending)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        loans
    }

    /// loans that cleared approval (active or fully repaid), newest
    /// approval first
    pub fn approved(&self) -> Vec<Loan> {
        let inner = self.store.lock();
        let mut loans: Vec<Loan> = inner
            .loans
            .values()
            .filter(|l| matches!(l.status, LoanStatus::Active | LoanStatus::Completed))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.approved_at.cmp(&a.approved_at));
        loans
    }
}

/// duplicate-application alone is a conflict; anything else is a
/// validation failure carrying every violated rule
fn rejection_error(reasons: Vec<RejectionReason>) -> SaccoError {
    if reasons == [RejectionReason::OpenLoanExists] {
        SaccoError::Conflict {
            message: RejectionReason::OpenLoanExists.to_string(),
        }
    } else {
        SaccoError::Validation {
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::{MemberDirectory, NewMember};
    use crate::payments::Transaction;
    use crate::types::{
        EmploymentStatus, Gender, PaymentMethod, Role, TransactionStatus, TransactionType,
    };
    use chrono::{NaiveDate, TimeZone};
    use hourglass_rs::TimeSource;

    fn fixtures() -> (Arc<SaccoStore>, Arc<NotificationDispatcher>, LoanLedger) {
        let config = SaccoConfig::default();
        let store = Arc::new(SaccoStore::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(config.notifications.clone()));
        let ledger = LoanLedger::new(config, store.clone(), dispatcher.clone());
        (store, dispatcher, ledger)
    }

    fn clock() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
        ))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn register_member(store: &Arc<SaccoStore>, time: &SafeTimeProvider) -> MemberId {
        let mut directory = MemberDirectory::new(
            SaccoConfig::default(),
            store.clone(),
        );
        let profile = directory
            .register(
                NewMember {
                    full_name: "Grace Njeri".to_string(),
                    email: "grace@example.com".to_string(),
                    password: "a-strong-phrase".to_string(),
                    phone_number: "+254700000003".to_string(),
                    date_of_birth: NaiveDate::from_ymd_opt(1994, 2, 10).unwrap(),
                    gender: Gender::Female,
                    national_id: "34567890".to_string(),
                    nationality: "Kenyan".to_string(),
                    employment: EmploymentStatus::Salaried,
                    monthly_income: Money::from_major(20_000),
                    role: None,
                },
                time,
            )
            .unwrap();
        profile.id
    }

    fn seed_deposits(store: &Arc<SaccoStore>, member_id: MemberId, amount: i64) {
        store.lock().transactions.push(Transaction {
            id: Uuid::new_v4(),
            member_id,
            loan_id: None,
            transaction_type: TransactionType::Deposit,
            amount: Money::from_major(amount),
            method: PaymentMethod::Mpesa,
            status: TransactionStatus::Completed,
            reference: format!("DEP-{}", Uuid::new_v4()),
            provider_reference: None,
            created_at: now(),
        });
    }

    fn officer() -> AuthContext {
        AuthContext {
            member_id: Uuid::new_v4(),
            role: Role::LoanOfficer,
        }
    }

    #[test]
    fn test_apply_prices_by_term_bracket() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);

        let loan = ledger
            .apply(member_id, Money::from_major(90_000), 12, "inventory", &time)
            .unwrap();

        assert_eq!(loan.status, LoanStatus::Pending);
        assert_eq!(loan.interest_rate, Rate::from_percentage(15));
        assert_eq!(loan.total_repayment, Money::from_major(103_500));
        assert_eq!(loan.remaining_balance, loan.total_repayment);
    }

    #[test]
    fn test_apply_queues_applicant_and_officer_notifications() {
        let (store, dispatcher, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);

        ledger
            .apply(member_id, Money::from_major(50_000), 6, "school fees", &time)
            .unwrap();

        assert_eq!(dispatcher.pending(), 2);
    }

    #[test]
    fn test_second_application_conflicts() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);

        ledger
            .apply(member_id, Money::from_major(50_000), 6, "school fees", &time)
            .unwrap();
        let err = ledger
            .apply(member_id, Money::from_major(10_000), 6, "stock", &time)
            .unwrap_err();

        assert!(matches!(err, SaccoError::Conflict { .. }));
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn test_ineligible_application_reports_reasons() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        // no deposits seeded: fails deposit minimum and the multiple rule
        let err = ledger
            .apply(member_id, Money::from_major(50_000), 6, "stock", &time)
            .unwrap_err();

        match err {
            SaccoError::Validation { reasons } => {
                assert_eq!(reasons.len(), 2);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_approve_moves_pending_to_active() {
        let (store, dispatcher, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);
        let loan = ledger
            .apply(member_id, Money::from_major(90_000), 12, "inventory", &time)
            .unwrap();

        let decided = ledger
            .process(loan.id, officer(), LoanDecision::Approve, "looks good", &time)
            .unwrap();

        assert_eq!(decided.status, LoanStatus::Active);
        assert_eq!(decided.approved_at, Some(now()));
        assert!(decided.processed_by.is_some());
        assert_eq!(decided.officer_note.as_deref(), Some("looks good"));
        // applicant + officer desk + decision
        assert_eq!(dispatcher.pending(), 3);
    }

    #[test]
    fn test_reject_is_terminal() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);
        let loan = ledger
            .apply(member_id, Money::from_major(90_000), 12, "inventory", &time)
            .unwrap();

        ledger
            .process(loan.id, officer(), LoanDecision::Reject, "income unverified", &time)
            .unwrap();

        let err = ledger
            .process(loan.id, officer(), LoanDecision::Approve, "", &time)
            .unwrap_err();
        assert!(matches!(
            err,
            SaccoError::InvalidLoanState {
                current: LoanStatus::Rejected,
                ..
            }
        ));
    }

    #[test]
    fn test_member_cannot_process_loans() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);
        let loan = ledger
            .apply(member_id, Money::from_major(90_000), 12, "inventory", &time)
            .unwrap();

        let requester = AuthContext {
            member_id,
            role: Role::Member,
        };
        let err = ledger
            .process(loan.id, requester, LoanDecision::Approve, "", &time)
            .unwrap_err();
        assert_eq!(err.http_status(), 403);
    }

    #[test]
    fn test_process_unknown_loan_is_not_found() {
        let (_, _, mut ledger) = fixtures();
        let time = clock();
        let err = ledger
            .process(Uuid::new_v4(), officer(), LoanDecision::Approve, "", &time)
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_rejection_frees_member_to_reapply() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);
        let loan = ledger
            .apply(member_id, Money::from_major(90_000), 12, "inventory", &time)
            .unwrap();
        ledger
            .process(loan.id, officer(), LoanDecision::Reject, "", &time)
            .unwrap();

        assert!(ledger
            .apply(member_id, Money::from_major(50_000), 6, "stock", &time)
            .is_ok());
    }

    #[test]
    fn test_mark_defaulted_writes_off_active_loan() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);
        let loan = ledger
            .apply(member_id, Money::from_major(90_000), 12, "inventory", &time)
            .unwrap();
        ledger
            .process(loan.id, officer(), LoanDecision::Approve, "", &time)
            .unwrap();

        let defaulted = ledger.mark_defaulted(loan.id, officer(), &time).unwrap();
        assert_eq!(defaulted.status, LoanStatus::Defaulted);

        // terminal: cannot default twice
        assert!(ledger.mark_defaulted(loan.id, officer(), &time).is_err());
    }

    #[test]
    fn test_listings_are_scoped_and_ordered() {
        let (store, _, mut ledger) = fixtures();
        let time = clock();
        let member_id = register_member(&store, &time);
        seed_deposits(&store, member_id, 20_000);

        let first = ledger
            .apply(member_id, Money::from_major(30_000), 6, "stock", &time)
            .unwrap();
        ledger
            .process(first.id, officer(), LoanDecision::Reject, "", &time)
            .unwrap();

        time.test_control().unwrap().advance(chrono::Duration::days(1));
        let second = ledger
            .apply(member_id, Money::from_major(40_000), 6, "fees", &time)
            .unwrap();

        let mine = ledger.loans_for_member(member_id);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, second.id); // most recent first

        assert_eq!(ledger.pending().len(), 1);
        assert!(ledger.approved().is_empty());
    }
}
