pub mod admin;
pub mod config;
pub mod decimal;
pub mod eligibility;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod loans;
pub mod members;
pub mod notifications;
pub mod payments;
pub mod store;
pub mod types;

// re-export key types
pub use decimal::{Money, Rate};
pub use errors::{Result, SaccoError};
pub use events::{Event, EventStore};
pub use admin::{AdminDesk, Overview};
pub use config::{AuthConfig, NotificationConfig, PolicyConfig, PricingConfig, SaccoConfig};
pub use gateway::{ChargeReceipt, ChargeRequest, GatewayError, MockGateway, PaymentGateway};
pub use loans::{Loan, LoanDecision, LoanLedger};
pub use members::{AuthContext, MemberDirectory, NewMember, ProfileUpdate, SessionToken};
pub use notifications::{Notification, NotificationDispatcher, NotificationSender};
pub use payments::{PaymentLedger, RepaymentOutcome, Transaction};
pub use store::SaccoStore;
pub use types::{
    EmploymentStatus, Gender, LoanId, LoanStatus, MemberId, MemberProfile, MemberStatus,
    PaymentMethod, Role, TransactionId, TransactionStatus, TransactionType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
