use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{MemberId, PaymentMethod};

/// a charge to be placed against a member's payment instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub member_id: MemberId,
    pub amount: Money,
    pub method: PaymentMethod,
    /// ledger-side reference the provider echoes back, e.g. "DEP-..." or "PAY-..."
    pub account_reference: String,
}

/// provider confirmation of a successful charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeReceipt {
    pub provider_reference: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("charge declined: {reason}")]
    Declined { reason: String },

    #[error("gateway unreachable: {message}")]
    Unreachable { message: String },
}

/// boundary to the payment provider; the call blocks until the provider
/// responds or times out
pub trait PaymentGateway: Send + Sync {
    fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError>;
}

/// scripted gateway for tests and demos
pub struct MockGateway {
    outcomes: Mutex<Vec<Result<ChargeReceipt, GatewayError>>>,
    charges: Mutex<Vec<ChargeRequest>>,
    /// outcome once the script is exhausted
    fallback: Option<GatewayError>,
}

impl MockGateway {
    /// gateway that approves every charge with a fresh reference
    pub fn approving() -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            charges: Mutex::new(Vec::new()),
            fallback: None,
        }
    }

    /// gateway that declines every charge
    pub fn declining(reason: &str) -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            charges: Mutex::new(Vec::new()),
            fallback: Some(GatewayError::Declined {
                reason: reason.to_string(),
            }),
        }
    }

    /// push an outcome; scripted outcomes are consumed in order, after
    /// which the constructor's standing behavior resumes
    pub fn script(&self, outcome: Result<ChargeReceipt, GatewayError>) {
        self.outcomes.lock().expect("lock poisoned").push(outcome);
    }

    /// charges seen so far
    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().expect("lock poisoned").clone()
    }
}

impl PaymentGateway for MockGateway {
    fn charge(&self, request: &ChargeRequest) -> Result<ChargeReceipt, GatewayError> {
        self.charges
            .lock()
            .expect("lock poisoned")
            .push(request.clone());

        let mut outcomes = self.outcomes.lock().expect("lock poisoned");
        if !outcomes.is_empty() {
            return outcomes.remove(0);
        }
        match &self.fallback {
            Some(err) => Err(err.clone()),
            None => Ok(ChargeReceipt {
                provider_reference: format!("MOCK-{}", Uuid::new_v4()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChargeRequest {
        ChargeRequest {
            member_id: Uuid::new_v4(),
            amount: Money::from_major(1_000),
            method: PaymentMethod::Mpesa,
            account_reference: "DEP-test".to_string(),
        }
    }

    #[test]
    fn test_approving_gateway_issues_references() {
        let gateway = MockGateway::approving();
        let receipt = gateway.charge(&request()).unwrap();
        assert!(receipt.provider_reference.starts_with("MOCK-"));
        assert_eq!(gateway.charges().len(), 1);
    }

    #[test]
    fn test_declining_gateway_declines_every_charge() {
        let gateway = MockGateway::declining("card blocked");

        for _ in 0..3 {
            let err = gateway.charge(&request()).unwrap_err();
            assert_eq!(
                err,
                GatewayError::Declined {
                    reason: "card blocked".to_string(),
                }
            );
        }
    }

    #[test]
    fn test_scripted_outcomes_consumed_in_order() {
        let gateway = MockGateway::approving();
        gateway.script(Err(GatewayError::Declined {
            reason: "insufficient funds".to_string(),
        }));

        assert!(gateway.charge(&request()).is_err());
        // script exhausted, back to approving
        assert!(gateway.charge(&request()).is_ok());
    }
}
