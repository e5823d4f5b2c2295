use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a member
pub type MemberId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a ledger transaction
pub type TransactionId = Uuid;

/// member roles, in ascending order of privilege for money visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    LoanOfficer,
    Accountant,
    Admin,
}

impl Role {
    /// roles allowed to see every member's transactions
    pub fn can_view_all_transactions(&self) -> bool {
        !matches!(self, Role::Member)
    }

    /// roles allowed to approve or reject loan applications
    pub fn can_process_loans(&self) -> bool {
        matches!(self, Role::LoanOfficer | Role::Admin)
    }
}

/// member account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Inactive,
    Suspended,
}

/// loan status
///
/// Approval moves a loan straight from `Pending` to `Active`; there is
/// no intermediate approved-but-not-yet-active state to leave
/// half-written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// application received, awaiting an officer decision
    Pending,
    /// approved and repayable
    Active,
    /// declined by an officer
    Rejected,
    /// fully repaid
    Completed,
    /// written off as unrecoverable
    Defaulted,
}

impl LoanStatus {
    /// open loans block a member from applying again
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::Active)
    }

    /// terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Rejected | LoanStatus::Completed | LoanStatus::Defaulted
        )
    }
}

/// ledger transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Repayment,
    Disbursement,
    Withdrawal,
}

/// ledger transaction status, moves out of Pending exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

/// supported payment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Mpesa,
    Visa,
    Mastercard,
    BankTransfer,
    Cash,
}

impl PaymentMethod {
    /// whether a gateway charge must succeed before the transaction
    /// completes; card methods go through the gateway too rather than
    /// being accepted on trust
    pub fn requires_gateway(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

/// employment status declared on a loan application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Salaried,
    SelfEmployed,
    Unemployed,
}

/// member gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// a registered member's profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: MemberId,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
    pub status: MemberStatus,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub national_id: String,
    pub nationality: String,
    pub employment: EmploymentStatus,
    pub monthly_income: Money,
    pub joined_at: DateTime<Utc>,
}

impl MemberProfile {
    /// whole years elapsed since date of birth, floored
    pub fn age_at(&self, now: DateTime<Utc>) -> u32 {
        let today = now.date_naive();
        let mut age = today.years_since(self.date_of_birth).unwrap_or(0);
        // years_since already floors; guard against birthdays in the future
        if self.date_of_birth > today {
            age = 0;
        }
        age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile_born(date: NaiveDate) -> MemberProfile {
        MemberProfile {
            id: Uuid::new_v4(),
            full_name: "Jane Wanjiku".to_string(),
            email: "jane@example.com".to_string(),
            phone_number: "+254700000001".to_string(),
            role: Role::Member,
            status: MemberStatus::Active,
            date_of_birth: date,
            gender: Gender::Female,
            national_id: "12345678".to_string(),
            nationality: "Kenyan".to_string(),
            employment: EmploymentStatus::Salaried,
            monthly_income: Money::from_major(20_000),
            joined_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_age_floors_whole_years() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let profile = profile_born(NaiveDate::from_ymd_opt(2006, 6, 1).unwrap());
        assert_eq!(profile.age_at(now), 18);

        // one day short of the 18th birthday
        let profile = profile_born(NaiveDate::from_ymd_opt(2006, 6, 2).unwrap());
        assert_eq!(profile.age_at(now), 17);
    }

    #[test]
    fn test_open_and_terminal_statuses() {
        assert!(LoanStatus::Pending.is_open());
        assert!(LoanStatus::Active.is_open());
        assert!(!LoanStatus::Completed.is_open());

        assert!(LoanStatus::Rejected.is_terminal());
        assert!(LoanStatus::Defaulted.is_terminal());
        assert!(!LoanStatus::Active.is_terminal());
    }

    #[test]
    fn test_gateway_requirement() {
        assert!(PaymentMethod::Mpesa.requires_gateway());
        assert!(PaymentMethod::Visa.requires_gateway());
        assert!(!PaymentMethod::Cash.requires_gateway());
    }
}
