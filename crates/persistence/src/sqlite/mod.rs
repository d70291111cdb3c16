//! SQLite persistence module
//!
//! Repository pattern over the ledger tables.

pub mod repos;
pub mod schema;

pub use repos::{
    connect, init_database, load_user, run_migrations, BalanceRepo, CardGrantRepo,
    FraudReportRepo, LoanRepo, SponsorCardRepo, UserRepo,
};
pub use schema::{BalanceRow, CardGrantRow, FraudReportRow, LoanRow, SponsorCardRow, UserRow};
