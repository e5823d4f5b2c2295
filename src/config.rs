use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};

/// top-level configuration injected into each component at construction
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SaccoConfig {
    pub policy: PolicyConfig,
    pub pricing: PricingConfig,
    pub auth: AuthConfig,
    pub notifications: NotificationConfig,
}

/// eligibility policy thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub supported_nationality: String,
    pub minimum_age: u32,
    pub minimum_monthly_income: Money,
    pub minimum_deposit_total: Money,
    /// members may borrow up to this multiple of their completed deposits
    pub deposit_multiple: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            supported_nationality: "Kenyan".to_string(),
            minimum_age: 18,
            minimum_monthly_income: Money::from_major(15_000),
            minimum_deposit_total: Money::from_major(15_000),
            deposit_multiple: 5,
        }
    }
}

/// interest pricing by term bracket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// (max term in months, annual rate) pairs, checked in order
    pub term_brackets: Vec<(u32, Rate)>,
    /// rate applied beyond the last bracket
    pub default_rate: Rate,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            term_brackets: vec![
                (6, Rate::from_percentage(12)),
                (12, Rate::from_percentage(15)),
            ],
            default_rate: Rate::from_percentage(18),
        }
    }
}

impl PricingConfig {
    /// annual rate for a term in months
    pub fn rate_for_term(&self, term_months: u32) -> Rate {
        for (max_term, rate) in &self.term_brackets {
            if term_months <= *max_term {
                return *rate;
            }
        }
        self.default_rate
    }
}

/// session token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// secret for token signatures; rotate by restarting with a new value
    pub token_secret: Vec<u8>,
    /// token lifetime in seconds
    pub token_ttl_secs: i64,
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::seconds(self.token_ttl_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: b"change-me-before-production".to_vec(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

/// outbound notification retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// delivery attempts before a message moves to the dead letter list
    pub max_attempts: u32,
    /// shared inbox alerted when an application awaits review
    pub officer_desk: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            officer_desk: "loans@sacco.example".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_brackets() {
        let pricing = PricingConfig::default();
        assert_eq!(pricing.rate_for_term(1), Rate::from_percentage(12));
        assert_eq!(pricing.rate_for_term(6), Rate::from_percentage(12));
        assert_eq!(pricing.rate_for_term(7), Rate::from_percentage(15));
        assert_eq!(pricing.rate_for_term(12), Rate::from_percentage(15));
        assert_eq!(pricing.rate_for_term(13), Rate::from_percentage(18));
        assert_eq!(pricing.rate_for_term(36), Rate::from_percentage(18));
    }

    #[test]
    fn test_policy_defaults() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.minimum_monthly_income, Money::from_major(15_000));
        assert_eq!(policy.deposit_multiple, 5);
        assert_eq!(policy.supported_nationality, "Kenyan");
    }
}
