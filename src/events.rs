use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{LoanId, MemberId, PaymentMethod, TransactionId, TransactionType};

/// all events emitted by the ledgers and directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // member lifecycle
    MemberRegistered {
        member_id: MemberId,
        email: String,
        timestamp: DateTime<Utc>,
    },
    MemberAuthenticated {
        member_id: MemberId,
        timestamp: DateTime<Utc>,
    },
    MemberStatusChanged {
        member_id: MemberId,
        new_status: crate::types::MemberStatus,
        timestamp: DateTime<Utc>,
    },

    // loan lifecycle
    LoanApplied {
        loan_id: LoanId,
        member_id: MemberId,
        amount: Money,
        term_months: u32,
        total_repayment: Money,
        timestamp: DateTime<Utc>,
    },
    LoanApproved {
        loan_id: LoanId,
        officer_id: MemberId,
        timestamp: DateTime<Utc>,
    },
    LoanRejected {
        loan_id: LoanId,
        officer_id: MemberId,
        timestamp: DateTime<Utc>,
    },
    LoanCompleted {
        loan_id: LoanId,
        final_payment: Money,
        timestamp: DateTime<Utc>,
    },
    LoanDefaulted {
        loan_id: LoanId,
        written_off_balance: Money,
        timestamp: DateTime<Utc>,
    },
    // money movement
    DepositRecorded {
        transaction_id: TransactionId,
        member_id: MemberId,
        amount: Money,
        method: PaymentMethod,
        timestamp: DateTime<Utc>,
    },
    RepaymentRecorded {
        transaction_id: TransactionId,
        loan_id: LoanId,
        amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    TransactionFailed {
        transaction_id: TransactionId,
        member_id: MemberId,
        transaction_type: TransactionType,
        amount: Money,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // outbound messaging
    NotificationQueued {
        recipient: String,
        subject: String,
        timestamp: DateTime<Utc>,
    },
    NotificationDelivered {
        recipient: String,
        subject: String,
        timestamp: DateTime<Utc>,
    },
    NotificationFailed {
        recipient: String,
        subject: String,
        attempts: u32,
        dead_lettered: bool,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_take_drains_store() {
        let mut store = EventStore::new();
        store.emit(Event::MemberRegistered {
            member_id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        });

        assert_eq!(store.events().len(), 1);
        let taken = store.take_events();
        assert_eq!(taken.len(), 1);
        assert!(store.events().is_empty());
    }
}
