//! Database schema definitions
//!
//! Row types for sqlx mapping of the SQLite tables defined in
//! `migrations/20261017000000_init.sql`. Decimals are stored as TEXT.

use crate::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, NaiveDate, Utc};
use rcard_core::{
    CardGrant, FraudReport, FraudReportStatus, Loan, LoanStatus, SponsorCard, SponsorCardSpec,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

fn parse_decimal(field: &str, value: &str) -> PersistenceResult<Decimal> {
    Decimal::from_str(value).map_err(|_| PersistenceError::invalid_decimal(field, value))
}

/// Row type for table `users`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Row type for table `card_grants`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CardGrantRow {
    pub user_id: i64,
    pub card_id: String,
    pub card_identifier: String,
    pub card_type: String,
    pub applied_at: DateTime<Utc>,
}

/// Row type for table `balances`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct BalanceRow {
    pub user_id: i64,
    pub balance_type: String,
    pub amount: String, // Decimal stored as TEXT
    pub updated_at: DateTime<Utc>,
}

impl BalanceRow {
    pub fn amount(&self) -> PersistenceResult<Decimal> {
        parse_decimal("balances.amount", &self.amount)
    }
}

/// Row type for table `loans`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LoanRow {
    pub id: String,
    pub user_id: i64,
    pub card_id: String,
    pub principal: String,
    pub original_principal: String,
    pub interest_rate_monthly: String,
    pub interest_accrued: String,
    pub created_at: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub last_interest_calc: NaiveDate,
    pub days_duration: i64,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_amount: Option<String>,
}

/// Row type for table `sponsor_cards`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct SponsorCardRow {
    pub id: String,
    pub org_id: String,
    pub public_identifier: String,
    pub spec: String, // JSON document
    pub created_at: DateTime<Utc>,
}

/// Row type for table `fraud_reports`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct FraudReportRow {
    pub id: String,
    pub user_id: i64,
    pub report_type: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// === Conversion implementations ===

impl From<CardGrantRow> for CardGrant {
    fn from(row: CardGrantRow) -> Self {
        Self {
            id: row.card_id,
            card_identifier: row.card_identifier,
            card_type: row.card_type,
            applied_at: row.applied_at,
        }
    }
}

impl From<&Loan> for LoanRow {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id.clone(),
            user_id: loan.user_id,
            card_id: loan.card_id.clone(),
            principal: loan.principal.to_string(),
            original_principal: loan.original_principal.to_string(),
            interest_rate_monthly: loan.interest_rate_monthly.to_string(),
            interest_accrued: loan.interest_accrued.to_string(),
            created_at: loan.created_at,
            due_date: loan.due_date,
            status: loan.status.as_str().to_string(),
            last_interest_calc: loan.last_interest_calc,
            days_duration: i64::from(loan.days_duration),
            paid_at: loan.paid_at,
            paid_amount: loan.paid_amount.map(|a| a.to_string()),
        }
    }
}

impl TryFrom<LoanRow> for Loan {
    type Error = PersistenceError;

    fn try_from(row: LoanRow) -> PersistenceResult<Self> {
        let status = LoanStatus::parse(&row.status)
            .map_err(|_| PersistenceError::invalid_enum("loans.status", &row.status))?;
        let days_duration = u32::try_from(row.days_duration).map_err(|_| {
            PersistenceError::invalid_enum("loans.days_duration", &row.days_duration.to_string())
        })?;
        let paid_amount = row
            .paid_amount
            .as_deref()
            .map(|v| parse_decimal("loans.paid_amount", v))
            .transpose()?;

        Ok(Loan {
            principal: parse_decimal("loans.principal", &row.principal)?,
            original_principal: parse_decimal("loans.original_principal", &row.original_principal)?,
            interest_rate_monthly: parse_decimal(
                "loans.interest_rate_monthly",
                &row.interest_rate_monthly,
            )?,
            interest_accrued: parse_decimal("loans.interest_accrued", &row.interest_accrued)?,
            id: row.id,
            user_id: row.user_id,
            card_id: row.card_id,
            created_at: row.created_at,
            due_date: row.due_date,
            status,
            last_interest_calc: row.last_interest_calc,
            days_duration,
            paid_at: row.paid_at,
            paid_amount,
        })
    }
}

impl TryFrom<SponsorCardRow> for SponsorCard {
    type Error = PersistenceError;

    fn try_from(row: SponsorCardRow) -> PersistenceResult<Self> {
        let spec: SponsorCardSpec = serde_json::from_str(&row.spec)?;
        Ok(SponsorCard {
            id: row.id,
            org_id: row.org_id,
            public_identifier: row.public_identifier,
            spec,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<FraudReportRow> for FraudReport {
    type Error = PersistenceError;

    fn try_from(row: FraudReportRow) -> PersistenceResult<Self> {
        let status = match row.status.as_str() {
            "pending" => FraudReportStatus::Pending,
            other => return Err(PersistenceError::invalid_enum("fraud_reports.status", other)),
        };
        Ok(FraudReport {
            id: row.id,
            user_id: row.user_id,
            report_type: row.report_type,
            description: row.description,
            ip_address: row.ip_address,
            status,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_loan_row_roundtrip_keeps_precision() {
        let mut loan = Loan::new(
            "loan_1".to_string(),
            1,
            "default".to_string(),
            dec!(500),
            dec!(10),
            10,
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        )
        .unwrap();
        loan.interest_accrued = dec!(500) * dec!(10) / dec!(3000);

        let row = LoanRow::from(&loan);
        assert_eq!(row.status, "active");
        let back = Loan::try_from(row).unwrap();
        assert_eq!(back, loan);
    }

    #[test]
    fn test_loan_row_rejects_bad_decimal() {
        let loan = Loan::new(
            "loan_1".to_string(),
            1,
            "default".to_string(),
            dec!(500),
            dec!(10),
            10,
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        )
        .unwrap();
        let mut row = LoanRow::from(&loan);
        row.principal = "five hundred".to_string();
        assert!(matches!(
            Loan::try_from(row),
            Err(PersistenceError::InvalidDecimal { .. })
        ));
    }
}
