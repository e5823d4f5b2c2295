use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PolicyConfig;
use crate::decimal::Money;
use crate::types::{EmploymentStatus, MemberProfile};

/// a single violated eligibility rule, with the member-facing message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    UnsupportedNationality,
    UnderAge {
        minimum: u32,
    },
    NotSalaried,
    IncomeBelowMinimum {
        minimum: Money,
    },
    DepositsBelowMinimum {
        minimum: Money,
    },
    NonPositiveAmount,
    AmountExceedsDepositMultiple {
        multiple: u32,
        limit: Money,
    },
    MissingPurpose,
    OpenLoanExists,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::UnsupportedNationality => {
                write!(f, "Only Kenyan nationals are eligible.")
            }
            RejectionReason::UnderAge { minimum } => {
                write!(f, "You must be at least {} years old.", minimum)
            }
            RejectionReason::NotSalaried => {
                write!(f, "Only salaried members can apply.")
            }
            RejectionReason::IncomeBelowMinimum { minimum } => {
                write!(f, "Monthly income must be at least Ksh {}.", minimum)
            }
            RejectionReason::DepositsBelowMinimum { minimum } => {
                write!(f, "Completed deposits must total at least Ksh {}.", minimum)
            }
            RejectionReason::NonPositiveAmount => {
                write!(f, "Enter a valid loan amount.")
            }
            RejectionReason::AmountExceedsDepositMultiple { multiple, limit } => {
                write!(
                    f,
                    "You can borrow up to {}x your deposits (Ksh {}).",
                    multiple, limit
                )
            }
            RejectionReason::MissingPurpose => {
                write!(f, "Enter the loan purpose.")
            }
            RejectionReason::OpenLoanExists => {
                write!(f, "You already have a pending or active loan.")
            }
        }
    }
}

/// the facts an eligibility decision is made from
#[derive(Debug, Clone)]
pub struct LoanRequest<'a> {
    pub profile: &'a MemberProfile,
    pub amount: Money,
    pub term_months: u32,
    pub purpose: &'a str,
    /// sum of the member's deposits with status completed
    pub completed_deposit_total: Money,
    /// whether the member holds a loan in pending or active
    pub has_open_loan: bool,
}

/// evaluate a loan request against policy; read-only, collects every
/// violated rule rather than short-circuiting so callers can show the
/// full list
pub fn evaluate(
    request: &LoanRequest<'_>,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> Result<(), Vec<RejectionReason>> {
    let mut reasons = Vec::new();
    let profile = request.profile;

    if profile.nationality != policy.supported_nationality {
        reasons.push(RejectionReason::UnsupportedNationality);
    }

    if profile.age_at(now) < policy.minimum_age {
        reasons.push(RejectionReason::UnderAge {
            minimum: policy.minimum_age,
        });
    }

    if profile.employment != EmploymentStatus::Salaried {
        reasons.push(RejectionReason::NotSalaried);
    }

    if profile.monthly_income < policy.minimum_monthly_income {
        reasons.push(RejectionReason::IncomeBelowMinimum {
            minimum: policy.minimum_monthly_income,
        });
    }

    if request.completed_deposit_total < policy.minimum_deposit_total {
        reasons.push(RejectionReason::DepositsBelowMinimum {
            minimum: policy.minimum_deposit_total,
        });
    }

    if !request.amount.is_positive() {
        reasons.push(RejectionReason::NonPositiveAmount);
    } else {
        let limit = request.completed_deposit_total
            * Decimal::from(policy.deposit_multiple);
        if request.amount > limit {
            reasons.push(RejectionReason::AmountExceedsDepositMultiple {
                multiple: policy.deposit_multiple,
                limit,
            });
        }
    }

    if request.purpose.trim().is_empty() {
        reasons.push(RejectionReason::MissingPurpose);
    }

    if request.has_open_loan {
        reasons.push(RejectionReason::OpenLoanExists);
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(reasons)
    }
}
