mod credentials;
mod token;

pub use credentials::StoredCredential;
pub use token::{AuthContext, SessionToken};

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SaccoConfig;
use crate::decimal::Money;
use crate::errors::{Result, SaccoError};
use crate::events::{Event, EventStore};
use crate::store::SaccoStore;
use crate::types::{
    EmploymentStatus, Gender, MemberId, MemberProfile, MemberStatus, Role,
};

/// a member as stored: profile plus hashed credential
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub profile: MemberProfile,
    pub credential: StoredCredential,
}

/// registration payload
#[derive(Debug, Clone)]
pub struct NewMember {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub national_id: String,
    pub nationality: String,
    pub employment: EmploymentStatus,
    pub monthly_income: Money,
    /// defaults to Member when absent
    pub role: Option<Role>,
}

/// self-service profile changes; unset fields are left alone
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub employment: Option<EmploymentStatus>,
    pub monthly_income: Option<Money>,
}

/// stores identity, role, and status; every other component consults it
/// for identity and authorization
pub struct MemberDirectory {
    config: SaccoConfig,
    store: Arc<SaccoStore>,
    pub events: EventStore,
}

impl MemberDirectory {
    pub fn new(config: SaccoConfig, store: Arc<SaccoStore>) -> Self {
        Self {
            config,
            store,
            events: EventStore::new(),
        }
    }

    /// register a member: unique email and national id, age at least the
    /// policy minimum, credential hashed at rest; members are never
    /// hard-deleted afterwards
    pub fn register(
        &mut self,
        new_member: NewMember,
        time: &SafeTimeProvider,
    ) -> Result<MemberProfile> {
        let now = time.now();

        let mut reasons = Vec::new();
        if new_member.full_name.trim().is_empty() {
            reasons.push("full name is required".to_string());
        }
        if new_member.email.trim().is_empty() || !new_member.email.contains('@') {
            reasons.push("a valid email is required".to_string());
        }
        if new_member.password.len() < 8 {
            reasons.push("password must be at least 8 characters".to_string());
        }
        if new_member.phone_number.trim().is_empty() {
            reasons.push("phone number is required".to_string());
        }
        if new_member.national_id.trim().is_empty() {
            reasons.push("national id is required".to_string());
        }
        if !reasons.is_empty() {
            return Err(SaccoError::Validation { reasons });
        }

        let profile = {
            let mut inner = self.store.lock();

            if inner.member_by_email(&new_member.email).is_some() {
                return Err(SaccoError::Conflict {
                    message: "email already registered".to_string(),
                });
            }
            if inner.member_by_national_id(&new_member.national_id).is_some() {
                return Err(SaccoError::Conflict {
                    message: "national id already registered".to_string(),
                });
            }

            let profile = MemberProfile {
                id: Uuid::new_v4(),
                full_name: new_member.full_name.trim().to_string(),
                email: new_member.email.trim().to_string(),
                phone_number: new_member.phone_number.trim().to_string(),
                role: new_member.role.unwrap_or(Role::Member),
                status: MemberStatus::Active,
                date_of_birth: new_member.date_of_birth,
                gender: new_member.gender,
                national_id: new_member.national_id.trim().to_string(),
                nationality: new_member.nationality.trim().to_string(),
                employment: new_member.employment,
                monthly_income: new_member.monthly_income,
                joined_at: now,
            };

            if profile.age_at(now) < self.config.policy.minimum_age {
                return Err(SaccoError::validation(format!(
                    "must be at least {} years old",
                    self.config.policy.minimum_age
                )));
            }

            let record = MemberRecord {
                profile: profile.clone(),
                credential: StoredCredential::from_plaintext(&new_member.password),
            };
            inner.members.insert(profile.id, record);
            profile
        };

        self.events.emit(Event::MemberRegistered {
            member_id: profile.id,
            email: profile.email.clone(),
            timestamp: now,
        });

        Ok(profile)
    }

    /// verify a credential and issue a signed, time-limited session token
    pub fn authenticate(
        &mut self,
        email: &str,
        password: &str,
        time: &SafeTimeProvider,
    ) -> Result<SessionToken> {
        let now = time.now();

        let (member_id, role) = {
            let inner = self.store.lock();
            let record = inner
                .member_by_email(email)
                .ok_or_else(invalid_credentials)?;

            if !record.credential.verify(password) {
                return Err(invalid_credentials());
            }
            if record.profile.status != MemberStatus::Active {
                return Err(SaccoError::Authentication {
                    message: "account is not active".to_string(),
                });
            }
            (record.profile.id, record.profile.role)
        };

        self.events.emit(Event::MemberAuthenticated {
            member_id,
            timestamp: now,
        });

        Ok(SessionToken::issue(member_id, role, &self.config.auth, now))
    }

    /// resolve a bearer token to the identity it carries
    pub fn verify_token(
        &self,
        token: &SessionToken,
        time: &SafeTimeProvider,
    ) -> Result<AuthContext> {
        let ctx = token.verify(&self.config.auth, time.now())?;
        // the token may outlive a suspension
        let inner = self.store.lock();
        let record = inner.member(ctx.member_id)?;
        if record.profile.status != MemberStatus::Active {
            return Err(SaccoError::Authentication {
                message: "account is not active".to_string(),
            });
        }
        Ok(ctx)
    }

    /// fetch a profile
    pub fn profile(&self, member_id: MemberId) -> Result<MemberProfile> {
        Ok(self.store.lock().member(member_id)?.profile.clone())
    }

    /// self-service profile update; admins may edit any member
    pub fn update_profile(
        &mut self,
        member_id: MemberId,
        update: ProfileUpdate,
        requester: AuthContext,
    ) -> Result<MemberProfile> {
        if requester.member_id != member_id && requester.role != Role::Admin {
            return Err(SaccoError::Authorization {
                message: "you may only edit your own profile".to_string(),
            });
        }

        let mut inner = self.store.lock();
        let record = inner.members.get_mut(&member_id).ok_or(SaccoError::NotFound {
            entity: "member",
            id: member_id,
        })?;

        if let Some(full_name) = update.full_name {
            record.profile.full_name = full_name;
        }
        if let Some(phone_number) = update.phone_number {
            record.profile.phone_number = phone_number;
        }
        if let Some(employment) = update.employment {
            record.profile.employment = employment;
        }
        if let Some(monthly_income) = update.monthly_income {
            record.profile.monthly_income = monthly_income;
        }

        Ok(record.profile.clone())
    }

    /// admin-only status change (suspend/reactivate); never deletes
    pub fn set_status(
        &mut self,
        member_id: MemberId,
        new_status: MemberStatus,
        requester: AuthContext,
        time: &SafeTimeProvider,
    ) -> Result<MemberProfile> {
        if requester.role != Role::Admin {
            return Err(SaccoError::Authorization {
                message: "only admins can change member status".to_string(),
            });
        }

        let profile = {
            let mut inner = self.store.lock();
            let record = inner.members.get_mut(&member_id).ok_or(SaccoError::NotFound {
                entity: "member",
                id: member_id,
            })?;
            record.profile.status = new_status;
            record.profile.clone()
        };

        self.events.emit(Event::MemberStatusChanged {
            member_id,
            new_status,
            timestamp: time.now(),
        });

        Ok(profile)
    }
}

fn invalid_credentials() -> SaccoError {
    SaccoError::Authentication {
        message: "invalid email or password".to_string(),
    }
}
