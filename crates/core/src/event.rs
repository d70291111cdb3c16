//! # Event Module
//!
//! Audit events appended to the JSONL event store after each committed
//! state change. Events are immutable and append-only.

use crate::loan::{Loan, LoanStatus, RepaymentOutcome};
use crate::user::UserId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of state change recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // === User events ===
    UserRegistered,
    UserLoggedIn,
    CardGranted,

    // === Wallet events ===
    WalletDeposit,
    BalanceSet,

    // === Loan events ===
    LoanCreated,
    InterestRefreshed,
    LoanRepaid,
    LoanSettled,

    // === Sponsor / reports ===
    SponsorCardCreated,
    FraudReported,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserRegistered => "user_registered",
            EventType::UserLoggedIn => "user_logged_in",
            EventType::CardGranted => "card_granted",
            EventType::WalletDeposit => "wallet_deposit",
            EventType::BalanceSet => "balance_set",
            EventType::LoanCreated => "loan_created",
            EventType::InterestRefreshed => "interest_refreshed",
            EventType::LoanRepaid => "loan_repaid",
            EventType::LoanSettled => "loan_settled",
            EventType::SponsorCardCreated => "sponsor_card_created",
            EventType::FraudReported => "fraud_reported",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        let all = [
            EventType::UserRegistered,
            EventType::UserLoggedIn,
            EventType::CardGranted,
            EventType::WalletDeposit,
            EventType::BalanceSet,
            EventType::LoanCreated,
            EventType::InterestRefreshed,
            EventType::LoanRepaid,
            EventType::LoanSettled,
            EventType::SponsorCardCreated,
            EventType::FraudReported,
        ];
        let s = s.trim().to_lowercase();
        all.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An audit event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Sequential id (EVT_000001, ...)
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub user_id: UserId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Event {
    pub fn new(
        event_id: String,
        timestamp: DateTime<Utc>,
        event_type: EventType,
        user_id: UserId,
    ) -> Self {
        Self {
            event_id,
            timestamp,
            event_type,
            user_id,
            loan_id: None,
            card_id: None,
            amount: None,
            description: None,
        }
    }

    // === Builder methods ===

    pub fn with_loan(mut self, loan_id: &str) -> Self {
        self.loan_id = Some(loan_id.to_string());
        self
    }

    pub fn with_card(mut self, card_id: &str) -> Self {
        self.card_id = Some(card_id.to_string());
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    // === Factory methods ===

    pub fn loan_created(event_id: &str, timestamp: DateTime<Utc>, loan: &Loan) -> Self {
        Self::new(
            event_id.to_string(),
            timestamp,
            EventType::LoanCreated,
            loan.user_id,
        )
        .with_loan(&loan.id)
        .with_card(&loan.card_id)
        .with_amount(loan.principal)
        .with_description(&format!(
            "{} days at {}%/month, due {}",
            loan.days_duration, loan.interest_rate_monthly, loan.due_date
        ))
    }

    pub fn loan_repayment(
        event_id: &str,
        timestamp: DateTime<Utc>,
        user_id: UserId,
        outcome: &RepaymentOutcome,
    ) -> Self {
        let event_type = if outcome.status == LoanStatus::Paid {
            EventType::LoanSettled
        } else {
            EventType::LoanRepaid
        };
        Self::new(event_id.to_string(), timestamp, event_type, user_id)
            .with_loan(&outcome.loan_id)
            .with_amount(outcome.amount_paid)
            .with_description(&format!(
                "remaining principal {}, remaining interest {}",
                outcome.remaining_principal, outcome.remaining_interest
            ))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} user={}",
            self.event_id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.event_type,
            self.user_id
        )?;
        if let Some(loan_id) = &self.loan_id {
            write!(f, " loan={}", loan_id)?;
        }
        if let Some(amount) = &self.amount {
            write!(f, " amount={}", amount)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_event_type_parse() {
        assert_eq!(EventType::from_str("loan_created"), Some(EventType::LoanCreated));
        assert_eq!(EventType::from_str("LOAN_SETTLED"), Some(EventType::LoanSettled));
        assert_eq!(EventType::from_str("deposit"), None);
    }

    #[test]
    fn test_loan_created_event() {
        let loan = Loan::new(
            "loan_x".to_string(),
            3,
            "gold-credit".to_string(),
            dec!(500),
            dec!(10),
            10,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
        .unwrap();
        let event = Event::loan_created("EVT_000001", Utc::now(), &loan);
        assert_eq!(event.event_type, EventType::LoanCreated);
        assert_eq!(event.loan_id.as_deref(), Some("loan_x"));
        assert_eq!(event.amount, Some(dec!(500)));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"loan_created\""));
        assert!(json.contains("\"500\""));
    }

    #[test]
    fn test_repayment_event_type_follows_status() {
        let mut outcome = RepaymentOutcome {
            loan_id: "loan_x".to_string(),
            amount_paid: dec!(10),
            remaining_principal: dec!(500),
            remaining_interest: dec!(6.67),
            status: LoanStatus::Active,
        };
        let event = Event::loan_repayment("EVT_000002", Utc::now(), 3, &outcome);
        assert_eq!(event.event_type, EventType::LoanRepaid);

        outcome.status = LoanStatus::Paid;
        let event = Event::loan_repayment("EVT_000003", Utc::now(), 3, &outcome);
        assert_eq!(event.event_type, EventType::LoanSettled);
    }
}
