use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::LoanStatus;

#[derive(Error, Debug)]
pub enum SaccoError {
    #[error("validation failed: {}", reasons.join("; "))]
    Validation {
        reasons: Vec<String>,
    },

    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
    },

    #[error("not permitted: {message}")]
    Authorization {
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("conflict: {message}")]
    Conflict {
        message: String,
    },

    #[error("loan not in expected state: current {current:?}, expected {expected:?}")]
    InvalidLoanState {
        current: LoanStatus,
        expected: LoanStatus,
    },

    #[error("payment amount exceeds remaining balance: balance {remaining_balance}, requested {requested}")]
    ExceedsBalance {
        remaining_balance: Money,
        requested: Money,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("dependency failure: {service}: {message}")]
    Dependency {
        service: &'static str,
        message: String,
    },

    #[error("internal error: {message}")]
    Internal {
        message: String,
    },
}

impl SaccoError {
    /// single-reason validation error
    pub fn validation(reason: impl Into<String>) -> Self {
        SaccoError::Validation {
            reasons: vec![reason.into()],
        }
    }

    /// HTTP status an outer transport layer would map this error to
    pub fn http_status(&self) -> u16 {
        match self {
            SaccoError::Validation { .. }
            | SaccoError::InvalidLoanState { .. }
            | SaccoError::ExceedsBalance { .. }
            | SaccoError::InvalidPaymentAmount { .. } => 400,
            SaccoError::Authentication { .. } => 401,
            SaccoError::Authorization { .. } => 403,
            SaccoError::NotFound { .. } => 404,
            SaccoError::Conflict { .. } => 409,
            SaccoError::Dependency { .. } | SaccoError::Internal { .. } => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, SaccoError>;
