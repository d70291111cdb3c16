//! # User Module
//!
//! Users, the cards granted to them and their wallet balances.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique positive user id
pub type UserId = i64;

/// Balance type used to fund repayments
pub const CENTRAL_WALLET: &str = "central_wallet";

/// Username length bounds (inclusive)
pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;

/// A card granted to a user. Unique per user by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardGrant {
    /// Policy/card identifier
    pub id: String,
    pub card_identifier: String,
    #[serde(rename = "type")]
    pub card_type: String,
    pub applied_at: DateTime<Utc>,
}

/// A registered platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Never serialized back to callers
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub cards: Vec<CardGrant>,
    /// Balance type -> amount
    pub balances: BTreeMap<String, Decimal>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Balance of one type, 0 when absent
    pub fn balance(&self, balance_type: &str) -> Decimal {
        self.balances
            .get(balance_type)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn central_wallet(&self) -> Decimal {
        self.balance(CENTRAL_WALLET)
    }

    /// Whether a card with this id was already granted
    pub fn has_card(&self, card_id: &str) -> bool {
        self.cards.iter().any(|c| c.id == card_id)
    }

    /// Check a username is within the length bounds (after trimming)
    pub fn is_valid_username(username: &str) -> bool {
        let len = username.trim().chars().count();
        (USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {} ({}, cards: {}, wallet: {})",
            self.id,
            self.username,
            self.cards.len(),
            self.central_wallet()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn user() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            password_hash: "secret".to_string(),
            cards: vec![CardGrant {
                id: "gold-credit".to_string(),
                card_identifier: "4111".to_string(),
                card_type: "credit".to_string(),
                applied_at: Utc::now(),
            }],
            balances: BTreeMap::from([(CENTRAL_WALLET.to_string(), dec!(250))]),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_balance_defaults_to_zero() {
        let u = user();
        assert_eq!(u.central_wallet(), dec!(250));
        assert_eq!(u.balance("savings"), Decimal::ZERO);
    }

    #[test]
    fn test_has_card() {
        let u = user();
        assert!(u.has_card("gold-credit"));
        assert!(!u.has_card("silver-credit"));
    }

    #[test]
    fn test_username_bounds() {
        assert!(!User::is_valid_username("ab"));
        assert!(User::is_valid_username("abc"));
        assert!(User::is_valid_username(&"x".repeat(30)));
        assert!(!User::is_valid_username(&"x".repeat(31)));
        assert!(!User::is_valid_username("  ab  "));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_string(&user()).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("central_wallet"));
    }
}
