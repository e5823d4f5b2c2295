use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::loans::Loan;
use crate::members::MemberRecord;
use crate::payments::Transaction;
use crate::types::{LoanId, MemberId, TransactionStatus, TransactionType};

/// in-memory book of record for members, loans, and transactions
///
/// Every read-then-write sequence with a precondition (duplicate-loan
/// check, balance decrement, deposit-total aggregation feeding
/// eligibility) runs inside a single `lock()` critical section, which
/// serializes it against concurrent operations on the same member or
/// loan.
#[derive(Default)]
pub struct SaccoStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StoreInner {
    pub members: HashMap<MemberId, MemberRecord>,
    pub loans: HashMap<LoanId, Loan>,
    pub transactions: Vec<Transaction>,
}

impl SaccoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// take the store lock; hold it for the whole atomic unit of work
    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("lock poisoned")
    }

    /// serialize the whole book of record
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.lock()).map_err(|e| SaccoError::Internal {
            message: format!("state serialization failed: {e}"),
        })
    }

    /// restore a book of record from a serialized snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        let inner: StoreInner =
            serde_json::from_str(json).map_err(|e| SaccoError::Internal {
                message: format!("state deserialization failed: {e}"),
            })?;
        Ok(Self {
            inner: Mutex::new(inner),
        })
    }
}

impl StoreInner {
    pub fn member(&self, id: MemberId) -> Result<&MemberRecord> {
        self.members.get(&id).ok_or(SaccoError::NotFound {
            entity: "member",
            id,
        })
    }

    pub fn member_by_email(&self, email: &str) -> Option<&MemberRecord> {
        self.members.values().find(|r| r.profile.email == email)
    }

    pub fn member_by_national_id(&self, national_id: &str) -> Option<&MemberRecord> {
        self.members
            .values()
            .find(|r| r.profile.national_id == national_id)
    }

    pub fn loan(&self, id: LoanId) -> Result<&Loan> {
        self.loans.get(&id).ok_or(SaccoError::NotFound {
            entity: "loan",
            id,
        })
    }

    pub fn loan_mut(&mut self, id: LoanId) -> Result<&mut Loan> {
        self.loans.get_mut(&id).ok_or(SaccoError::NotFound {
            entity: "loan",
            id,
        })
    }

    /// whether the member holds a loan in pending or active
    pub fn open_loan_exists(&self, member_id: MemberId) -> bool {
        self.loans
            .values()
            .any(|l| l.member_id == member_id && l.status.is_open())
    }

    /// sum of the member's completed deposits, the borrowing-limit basis
    pub fn completed_deposit_total(&self, member_id: MemberId) -> Money {
        self.transactions
            .iter()
            .filter(|t| {
                t.member_id == member_id
                    && t.transaction_type == TransactionType::Deposit
                    && t.status == TransactionStatus::Completed
            })
            .fold(Money::ZERO, |acc, t| acc + t.amount)
    }
}
