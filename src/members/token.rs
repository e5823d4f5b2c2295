use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::{Result, SaccoError};
use crate::types::{MemberId, Role};

/// identity a verified token resolves to; protected operations consume this
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    pub member_id: MemberId,
    pub role: Role,
}

/// signed, time-limited bearer token
///
/// Wire format is `member_id.role.expiry_unix.signature` where the
/// signature is SHA-256 over the payload and the configured secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// issue a token for a member expiring `auth.token_ttl()` from now
    pub fn issue(
        member_id: MemberId,
        role: Role,
        auth: &AuthConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let expiry = (now + auth.token_ttl()).timestamp();
        let role_tag = role_tag(role);
        let signature = sign(member_id, role_tag, expiry, &auth.token_secret);
        SessionToken(format!("{member_id}.{role_tag}.{expiry}.{signature}"))
    }

    /// verify signature and expiry, resolving the carried identity
    pub fn verify(&self, auth: &AuthConfig, now: DateTime<Utc>) -> Result<AuthContext> {
        let parts: Vec<&str> = self.0.split('.').collect();
        if parts.len() != 4 {
            return Err(SaccoError::Authentication {
                message: "malformed token".to_string(),
            });
        }

        let member_id = Uuid::parse_str(parts[0]).map_err(|_| SaccoError::Authentication {
            message: "malformed token".to_string(),
        })?;
        let role = parse_role(parts[1]).ok_or_else(|| SaccoError::Authentication {
            message: "malformed token".to_string(),
        })?;
        let expiry: i64 = parts[2].parse().map_err(|_| SaccoError::Authentication {
            message: "malformed token".to_string(),
        })?;

        let expected = sign(member_id, parts[1], expiry, &auth.token_secret);
        if expected != parts[3] {
            return Err(SaccoError::Authentication {
                message: "invalid token signature".to_string(),
            });
        }

        let expiry_at = Utc
            .timestamp_opt(expiry, 0)
            .single()
            .ok_or_else(|| SaccoError::Authentication {
                message: "malformed token".to_string(),
            })?;
        if now >= expiry_at {
            return Err(SaccoError::Authentication {
                message: "token expired".to_string(),
            });
        }

        Ok(AuthContext { member_id, role })
    }
}

fn sign(member_id: MemberId, role_tag: &str, expiry: i64, secret: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(b"|");
    hasher.update(member_id.as_bytes());
    hasher.update(b"|");
    hasher.update(role_tag.as_bytes());
    hasher.update(b"|");
    hasher.update(expiry.to_be_bytes());
    hex::encode(hasher.finalize())
}

fn role_tag(role: Role) -> &'static str {
    match role {
        Role::Member => "member",
        Role::LoanOfficer => "loan_officer",
        Role::Accountant => "accountant",
        Role::Admin => "admin",
    }
}

fn parse_role(tag: &str) -> Option<Role> {
    match tag {
        "member" => Some(Role::Member),
        "loan_officer" => Some(Role::LoanOfficer),
        "accountant" => Some(Role::Accountant),
        "admin" => Some(Role::Admin),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn auth() -> AuthConfig {
        AuthConfig {
            token_secret: b"test-secret".to_vec(),
            token_ttl_secs: 3600,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let member_id = Uuid::new_v4();
        let token = SessionToken::issue(member_id, Role::LoanOfficer, &auth(), now());

        let ctx = token.verify(&auth(), now()).unwrap();
        assert_eq!(ctx.member_id, member_id);
        assert_eq!(ctx.role, Role::LoanOfficer);
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = SessionToken::issue(Uuid::new_v4(), Role::Member, &auth(), now());
        let later = now() + Duration::hours(2);

        let err = token.verify(&auth(), later).unwrap_err();
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = SessionToken::issue(Uuid::new_v4(), Role::Member, &auth(), now());

        // promote member -> admin without re-signing
        let tampered = SessionToken(token.as_str().replacen("member", "admin", 1));
        assert!(tampered.verify(&auth(), now()).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = SessionToken::issue(Uuid::new_v4(), Role::Member, &auth(), now());
        let other = AuthConfig {
            token_secret: b"other-secret".to_vec(),
            token_ttl_secs: 3600,
        };
        assert!(token.verify(&other, now()).is_err());
    }
}
