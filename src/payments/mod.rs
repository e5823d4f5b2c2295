use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::events::{Event, EventStore};
use crate::gateway::{ChargeRequest, PaymentGateway};
use crate::loans::Loan;
use crate::members::AuthContext;
use crate::notifications::{Notification, NotificationDispatcher};
use crate::store::SaccoStore;
use crate::types::{
    LoanId, LoanStatus, MemberId, PaymentMethod, TransactionId, TransactionStatus,
    TransactionType,
};


/// a money movement event; immutable once terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub member_id: MemberId,
    pub loan_id: Option<LoanId>,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub method: PaymentMethod,
    pub status: TransactionStatus,
    /// unique ledger-side reference, e.g. "DEP-.." or "PAY-.."
    pub reference: String,
    /// reference echoed by the payment provider, when one was involved
    pub provider_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// result of a successful repayment: the recorded transaction and the
/// loan as it stands afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentOutcome {
    pub transaction: Transaction,
    pub loan: Loan,
}

/// records money movement and adjusts loan balances
pub struct PaymentLedger {
    store: Arc<SaccoStore>,
    gateway: Arc<dyn PaymentGateway>,
    dispatcher: Arc<NotificationDispatcher>,
    pub events: EventStore,
}

impl PaymentLedger {
    pub fn new(
        store: Arc<SaccoStore>,
        gateway: Arc<dyn PaymentGateway>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            store,
            gateway,
            dispatcher,
            events: EventStore::new(),
        }
    }

    /// record a deposit; methods that require the gateway only complete
    /// after the charge succeeds, and a declined charge leaves a failed
    /// transaction on the books
    pub fn record_deposit(
        &mut self,
        member_id: MemberId,
        amount: Money,
        method: PaymentMethod,
        time: &SafeTimeProvider,
    ) -> Result<Transaction> {
        let now = time.now();
        if !amount.is_positive() {
            return Err(SaccoError::InvalidPaymentAmount { amount });
        }

        let (email, full_name) = {
            let inner = self.store.lock();
            let profile = &inner.member(member_id)?.profile;
            (profile.email.clone(), profile.full_name.clone())
        };

        let reference = format!("DEP-{}", Uuid::new_v4());
        let provider_reference = self.charge_if_required(
            member_id,
            None,
            TransactionType::Deposit,
            amount,
            method,
            &reference,
            now,
        )?;

        let transaction = Transaction {
            id: Uuid::new_v4(),
            member_id,
            loan_id: None,
            transaction_type: TransactionType::Deposit,
            amount,
            method,
            status: TransactionStatus::Completed,
            reference,
            provider_reference,
            created_at: now,
        };
        self.store.lock().transactions.push(transaction.clone());

        self.events.emit(Event::DepositRecorded {
            transaction_id: transaction.id,
            member_id,
            amount,
            method,
            timestamp: now,
        });
        self.dispatcher.enqueue(
            Notification::deposit_received(&email, &full_name, amount),
            time,
        );

        Ok(transaction)
    }

    /// record a repayment against an active loan
    ///
    /// The transaction insert and the balance decrement happen inside
    /// one store critical section: both apply or neither does. A balance
    /// reaching exactly zero completes the loan.
    pub fn record_repayment(
        &mut self,
        loan_id: LoanId,
        member_id: MemberId,
        amount: Money,
        method: PaymentMethod,
        time: &SafeTimeProvider,
    ) -> Result<RepaymentOutcome> {
        let now = time.now();
        // validate before charging anything
        let (email, full_name) = {
            let inner = self.store.lock();
            let loan = inner.loan(loan_id)?;
            Self::check_repayment(loan, member_id, amount)?;
            let profile = &inner.member(member_id)?.profile;
            (profile.email.clone(), profile.full_name.clone())
        };

        let reference = format!("PAY-{}", Uuid::new_v4());
        let provider_reference = self.charge_if_required(
            member_id,
            Some(loan_id),
            TransactionType::Repayment,
            amount,
            method,
            &reference,
            now,
        )?;

        // atomic apply: re-validate under the lock, then insert the
        // transaction and decrement the balance together
        let outcome = {
            let mut inner = self.store.lock();
            if let Err(err) = Self::check_repayment(inner.loan(loan_id)?, member_id, amount) {
                // the charge succeeded but a concurrent repayment got
                // there first; keep an audit record of the failed apply
                warn!(%loan_id, %amount, "repayment superseded by concurrent update");
                inner.transactions.push(Transaction {
                    id: Uuid::new_v4(),
                    member_id,
                    loan_id: Some(loan_id),
                    transaction_type: TransactionType::Repayment,
                    amount,
                    method,
                    status: TransactionStatus::Failed,
                    reference,
                    provider_reference,
                    created_at: now,
                });
                return Err(err);
            }

            let transaction = Transaction {
                id: Uuid::new_v4(),
                member_id,
                loan_id: Some(loan_id),
                transaction_type: TransactionType::Repayment,
                amount,
                method,
                status: TransactionStatus::Completed,
                reference,
                provider_reference,
                created_at: now,
            };
            inner.transactions.push(transaction.clone());

            let loan = inner.loan_mut(loan_id)?;
            loan.remaining_balance -= amount;
            if loan.remaining_balance.is_zero() {
                loan.status = LoanStatus::Completed;
                loan.completed_at = Some(now);
            }

            RepaymentOutcome {
                loan: loan.clone(),
                transaction,
            }
        };

        self.events.emit(Event::RepaymentRecorded {
            transaction_id: outcome.transaction.id,
            loan_id,
            amount,
            new_balance: outcome.loan.remaining_balance,
            timestamp: now,
        });
        if outcome.loan.status == LoanStatus::Completed {
            self.events.emit(Event::LoanCompleted {
                loan_id,
                final_payment: amount,
                timestamp: now,
            });
        }

        self.dispatcher.enqueue(
            Notification::payment_received(
                &email,
                &full_name,
                amount,
                &outcome.transaction.reference,
                outcome.loan.remaining_balance,
            ),
            time,
        );

        Ok(outcome)
    }

    /// repayment history for a loan, most recent first; members see only
    /// their own loans, escalated roles see all
    pub fn history(&self, loan_id: LoanId, requester: AuthContext) -> Result<Vec<Transaction>> {
        let inner = self.store.lock();
        let loan = inner.loan(loan_id)?;
        if !requester.role.can_view_all_transactions() && loan.member_id != requester.member_id {
            return Err(SaccoError::Authorization {
                message: "you may only view your own loans".to_string(),
            });
        }

        let mut transactions: Vec<Transaction> = inner
            .transactions
            .iter()
            .filter(|t| t.loan_id == Some(loan_id))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    /// all transactions for a member, most recent first, same visibility
    /// rule as history
    pub fn transactions_for_member(
        &self,
        member_id: MemberId,
        requester: AuthContext,
    ) -> Result<Vec<Transaction>> {
        if !requester.role.can_view_all_transactions() && member_id != requester.member_id {
            return Err(SaccoError::Authorization {
                message: "you may only view your own transactions".to_string(),
            });
        }

        let inner = self.store.lock();
        let mut transactions: Vec<Transaction> = inner
            .transactions
            .iter()
            .filter(|t| t.member_id == member_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transactions)
    }

    /// sum of the member's completed deposits
    pub fn completed_deposit_total(&self, member_id: MemberId) -> Money {
        self.store.lock().completed_deposit_total(member_id)
    }

    fn check_repayment(loan: &Loan, member_id: MemberId, amount: Money) -> Result<()> {
        // another member's loan is reported as absent, not forbidden
        if loan.member_id != member_id {
            return Err(SaccoError::NotFound {
                entity: "loan",
                id: loan.id,
            });
        }
        if loan.status != LoanStatus::Active {
            return Err(SaccoError::InvalidLoanState {
                current: loan.status,
                expected: LoanStatus::Active,
            });
        }
        if !amount.is_positive() {
            return Err(SaccoError::InvalidPaymentAmount { amount });
        }
        if amount > loan.remaining_balance {
            return Err(SaccoError::ExceedsBalance {
                remaining_balance: loan.remaining_balance,
                requested: amount,
            });
        }
        Ok(())
    }

    /// place the gateway charge when the method needs one; a failure
    /// leaves a failed transaction on the books and surfaces as a
    /// dependency error without touching any balance
    #[allow(clippy::too_many_arguments)]
    fn charge_if_required(
        &mut self,
        member_id: MemberId,
        loan_id: Option<LoanId>,
        transaction_type: TransactionType,
        amount: Money,
        method: PaymentMethod,
        reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>> {
        if !method.requires_gateway() {
            return Ok(None);
        }

        let request = ChargeRequest {
            member_id,
            amount,
            method,
            account_reference: reference.to_string(),
        };
        match self.gateway.charge(&request) {
            Ok(receipt) => Ok(Some(receipt.provider_reference)),
            Err(err) => {
                warn!(%member_id, %amount, ?method, error = %err, "gateway charge failed");
                let transaction_id = Uuid::new_v4();
                self.store.lock().transactions.push(Transaction {
                    id: transaction_id,
                    member_id,
                    loan_id,
                    transaction_type,
                    amount,
                    method,
                    status: TransactionStatus::Failed,
                    reference: reference.to_string(),
                    provider_reference: None,
                    created_at: now,
                });
                self.events.emit(Event::TransactionFailed {
                    transaction_id,
                    member_id,
                    transaction_type,
                    amount,
                    reason: err.to_string(),
                    timestamp: now,
                });
                Err(SaccoError::Dependency {
                    service: "payment gateway",
                    message: err.to_string(),
                })
            }
        }
    }
}
