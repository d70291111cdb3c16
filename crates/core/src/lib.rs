//! # RCard Core
//!
//! Core domain types for the RCard card-issuing and short-term loan platform.
//!
//! - [`policy`]: card policies and the policy catalog
//! - [`interest`]: pure interest math (preview + daily accrual)
//! - [`loan`]: loan records and the repayment allocation rules
//! - [`user`]: users, card grants and wallet balances
//! - [`sponsor`]: sponsor-defined card programs
//! - [`event`]: audit events appended after every state change

pub mod clock;
pub mod error;
pub mod event;
pub mod fraud;
pub mod interest;
pub mod loan;
pub mod money;
pub mod policy;
pub mod sponsor;
pub mod user;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use event::{Event, EventType};
pub use fraud::{FraudReport, FraudReportStatus};
pub use interest::{accrued_interest, days_between, preview_interest, InterestPreview};
pub use loan::{Loan, LoanStatus, LoanView, RepaymentOutcome};
pub use money::round_money;
pub use policy::{CardType, Policy, PolicyCatalog};
pub use sponsor::{SponsorCard, SponsorCardSpec};
pub use user::{CardGrant, User, UserId, CENTRAL_WALLET};
