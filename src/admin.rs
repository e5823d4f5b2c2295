use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::members::AuthContext;
use crate::store::SaccoStore;
use crate::types::{
    LoanStatus, MemberId, Role, TransactionStatus, TransactionType,
};

/// aggregate counts for dashboards; pure reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    /// volume of loans that cleared approval (active or fully repaid)
    pub loans_total: Money,
    pub pending_approvals: usize,
    /// volume of completed repayments
    pub payments_total: Money,
    /// completed repayments in the last 7 days
    pub recent_payment_count: usize,
    /// members joined in the last 30 days, newest first, capped at 5
    pub recent_members: Vec<RecentMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentMember {
    pub id: MemberId,
    pub full_name: String,
    pub joined_at: DateTime<Utc>,
}

/// read-only dashboard queries over the shared store
pub struct AdminDesk {
    store: Arc<SaccoStore>,
}

impl AdminDesk {
    pub fn new(store: Arc<SaccoStore>) -> Self {
        Self { store }
    }

    pub fn overview(&self, requester: AuthContext, time: &SafeTimeProvider) -> Result<Overview> {
        let now = time.now();
        if !matches!(requester.role, Role::Admin | Role::Accountant) {
            return Err(SaccoError::Authorization {
                message: "only admins and accountants can view the overview".to_string(),
            });
        }

        let inner = self.store.lock();

        let loans_total = inner
            .loans
            .values()
            .filter(|l| matches!(l.status, LoanStatus::Active | LoanStatus::Completed))
            .fold(Money::ZERO, |acc, l| acc + l.amount);

        let pending_approvals = inner
            .loans
            .values()
            .filter(|l| l.status == LoanStatus::Pending)
            .count();

        let completed_repayments = inner.transactions.iter().filter(|t| {
            t.transaction_type == TransactionType::Repayment
                && t.status == TransactionStatus::Completed
        });
        let payments_total = completed_repayments
            .clone()
            .fold(Money::ZERO, |acc, t| acc + t.amount);
        let week_ago = now - Duration::days(7);
        let recent_payment_count = completed_repayments
            .filter(|t| t.created_at >= week_ago)
            .count();

        let month_ago = now - Duration::days(30);
        let mut recent_members: Vec<RecentMember> = inner
            .members
            .values()
            .filter(|r| r.profile.role == Role::Member && r.profile.joined_at >= month_ago)
            .map(|r| RecentMember {
                id: r.profile.id,
                full_name: r.profile.full_name.clone(),
                joined_at: r.profile.joined_at,
            })
            .collect();
        recent_members.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        recent_members.truncate(5);

        Ok(Overview {
            loans_total,
            pending_approvals,
            payments_total,
            recent_payment_count,
            recent_members,
        })
    }
}
