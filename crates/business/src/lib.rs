//! # RCard Business
//!
//! Business logic layer for RCard: card grants, wallet balances and the
//! loan lifecycle with its interest and yearly-limit rules.
//!
//! ## Services
//!
//! - [`UserService`] - registration, login, card grants
//! - [`WalletLedger`] - central wallet balance
//! - [`LoanLifecycle`] - create / preview / refresh / repay
//! - [`SponsorService`] - sponsor card programs
//! - [`FraudService`] - fraud report submission
//! - [`RcardApi`] - session-checked facade over all of the above
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rcard_business::{PlatformConfig, RcardApi, ServiceContext};
//! use rcard_core::SystemClock;
//! use rcard_persistence::Database;
//! use std::sync::Arc;
//!
//! let db = Database::open("sqlite:data/rcard.db", "data/events").await?;
//! let ctx = ServiceContext::new(db, PlatformConfig::default(), Arc::new(SystemClock));
//! let api = RcardApi::new(ctx);
//!
//! let session = api.login("alice", "secret123").await?;
//! let loan = api.create_loan(&session, "gold-credit", dec!(500), 10).await?;
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fraud;
pub mod loan;
pub mod rate_limit;
pub mod services;
pub mod sponsor;
pub mod user;
pub mod wallet;

pub use api::RcardApi;
pub use auth::{AuthProvider, PasswordHasher, Principal, Session, SessionAuth, Sha256Hasher};
pub use config::{PlatformConfig, RateLimit, RateLimitConfig, YearlyCapBasis};
pub use error::{BusinessError, BusinessResult, ErrorKind};
pub use fraud::FraudService;
pub use loan::{LoanLifecycle, LoanPreview, LoansOverview, YearlyLimit};
pub use rate_limit::{RateAction, RateLimiter, RetryAfter};
pub use services::{ServiceContext, UserLocks, SYSTEM_USER_ID};
pub use sponsor::SponsorService;
pub use user::{CardGrantRequest, UserService};
pub use wallet::WalletLedger;
