//! # Policy Module
//!
//! Card policies (fees, monthly interest rate, minimum interest days, yearly
//! borrowing cap) and the catalog they are looked up from.
//!
//! The catalog is a value object loaded from configuration at startup and
//! passed by reference to the loan lifecycle. Lookup never fails: an unknown
//! card id resolves to the catalog's default policy.

use crate::error::{CoreError, CoreResult};
use crate::loan::MAX_LOAN_DAYS;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

/// Card program type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Credit,
    Debit,
    Merchant,
    Custom,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Credit => "credit",
            CardType::Debit => "debit",
            CardType::Merchant => "merchant",
            CardType::Custom => "custom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Some(CardType::Credit),
            "debit" => Some(CardType::Debit),
            "merchant" => Some(CardType::Merchant),
            "custom" => Some(CardType::Custom),
            _ => None,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fee/rate/limit configuration of a card program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub annual_fee: Decimal,
    /// Monthly interest rate in percent (10 = 10% per month)
    pub interest_rate_monthly: Decimal,
    pub transaction_fee: Decimal,
    /// Cap on principal borrowed per calendar year
    pub max_yearly_loans: Decimal,
    pub min_interest_days: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand_primary: String,
    #[serde(default)]
    pub brand_secondary: String,
    #[serde(default)]
    pub benefit_key: String,
}

impl Policy {
    #[allow(clippy::too_many_arguments)]
    fn preset(
        id: &str,
        name: &str,
        card_type: CardType,
        annual_fee: Decimal,
        interest_rate_monthly: Decimal,
        transaction_fee: Decimal,
        max_yearly_loans: Decimal,
        branding: (&str, &str, &str),
        description: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            card_type,
            annual_fee,
            interest_rate_monthly,
            transaction_fee,
            max_yearly_loans,
            min_interest_days: 5,
            description: description.to_string(),
            brand_primary: branding.0.to_string(),
            brand_secondary: branding.1.to_string(),
            benefit_key: branding.2.to_string(),
        }
    }

    /// Fallback policy used when a card id is not in the catalog
    pub fn fallback() -> Self {
        Self::preset(
            "default",
            "Default Card",
            CardType::Custom,
            Decimal::ZERO,
            Decimal::new(15, 0),
            Decimal::new(5, 0),
            Decimal::new(1000, 0),
            ("#6366f1", "#818cf8", "default-benefits"),
            "Default card configuration",
        )
    }

    /// Reject policies the loan engine cannot work with
    pub fn validate(&self) -> CoreResult<()> {
        if self.id.trim().is_empty() {
            return Err(CoreError::invalid_policy(&self.id, "id must not be empty"));
        }
        if self.min_interest_days < 1 {
            return Err(CoreError::invalid_policy(
                &self.id,
                "min_interest_days must be >= 1",
            ));
        }
        if self.min_interest_days > MAX_LOAN_DAYS {
            return Err(CoreError::invalid_policy(
                &self.id,
                &format!("min_interest_days must be <= {}", MAX_LOAN_DAYS),
            ));
        }
        if self.interest_rate_monthly > Decimal::ONE_HUNDRED {
            return Err(CoreError::invalid_policy(
                &self.id,
                "interest_rate_monthly must be <= 100",
            ));
        }
        let amounts = [
            ("annual_fee", self.annual_fee),
            ("interest_rate_monthly", self.interest_rate_monthly),
            ("transaction_fee", self.transaction_fee),
            ("max_yearly_loans", self.max_yearly_loans),
        ];
        for (field, value) in amounts {
            if value < Decimal::ZERO {
                return Err(CoreError::invalid_policy(
                    &self.id,
                    &format!("{} must not be negative", field),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {}%/month, cap {}, min {} days)",
            self.id,
            self.card_type,
            self.interest_rate_monthly,
            self.max_yearly_loans,
            self.min_interest_days
        )
    }
}

/// Catalog of card policies grouped by card type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCatalog {
    #[serde(default)]
    pub credit: Vec<Policy>,
    #[serde(default)]
    pub debit: Vec<Policy>,
    #[serde(default)]
    pub merchant: Vec<Policy>,
    #[serde(default = "Policy::fallback")]
    pub default: Policy,
}

impl PolicyCatalog {
    /// Built-in RCard catalog
    pub fn builtin() -> Self {
        Self {
            credit: vec![
                Policy::preset(
                    "platinum-credit",
                    "Platinum Credit Card",
                    CardType::Credit,
                    Decimal::new(500, 0),
                    Decimal::new(12, 0),
                    Decimal::new(5, 0),
                    Decimal::new(2500, 0),
                    ("#14b8a6", "#3b82f6", "platinum-benefits"),
                    "Premium credit card with exclusive benefits",
                ),
                Policy::preset(
                    "gold-credit",
                    "Gold Credit Card",
                    CardType::Credit,
                    Decimal::new(300, 0),
                    Decimal::new(10, 0),
                    Decimal::new(3, 0),
                    Decimal::new(2000, 0),
                    ("#f59e0b", "#fbbf24", "gold-benefits"),
                    "Mid-tier credit card with great rewards",
                ),
                Policy::preset(
                    "silver-credit",
                    "Silver Credit Card",
                    CardType::Credit,
                    Decimal::new(100, 0),
                    Decimal::new(8, 0),
                    Decimal::new(2, 0),
                    Decimal::new(1500, 0),
                    ("#6b7280", "#9ca3af", "silver-benefits"),
                    "Entry-level credit card for everyday use",
                ),
            ],
            debit: vec![
                Policy::preset(
                    "premium-debit",
                    "Premium Debit Card",
                    CardType::Debit,
                    Decimal::new(200, 0),
                    Decimal::ZERO,
                    Decimal::new(1, 0),
                    Decimal::new(1000, 0),
                    ("#8b5cf6", "#a78bfa", "premium-debit-benefits"),
                    "Premium debit card with low fees",
                ),
                Policy::preset(
                    "standard-debit",
                    "Standard Debit Card",
                    CardType::Debit,
                    Decimal::new(50, 0),
                    Decimal::ZERO,
                    Decimal::new(5, 1),
                    Decimal::new(500, 0),
                    ("#10b981", "#34d399", "standard-debit-benefits"),
                    "Basic debit card for everyday transactions",
                ),
            ],
            merchant: vec![Policy::preset(
                "merchant-pro",
                "Merchant Pro Card",
                CardType::Merchant,
                Decimal::new(1000, 0),
                Decimal::new(5, 0),
                Decimal::ZERO,
                Decimal::new(5000, 0),
                ("#ef4444", "#f87171", "merchant-pro-benefits"),
                "Professional card for business merchants",
            )],
            default: Policy::fallback(),
        }
    }

    /// Load a catalog from a JSON file and validate it
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON catalog
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Every policy is valid and ids are unique across types
    pub fn validate(&self) -> CoreResult<()> {
        self.default.validate()?;
        let mut seen = HashSet::new();
        for policy in self.programs() {
            policy.validate()?;
            if !seen.insert(policy.id.as_str()) {
                return Err(CoreError::DuplicatePolicy(policy.id.clone()));
            }
        }
        Ok(())
    }

    /// Policies of one card type (the default policy is not included)
    pub fn of_type(&self, card_type: CardType) -> &[Policy] {
        match card_type {
            CardType::Credit => &self.credit,
            CardType::Debit => &self.debit,
            CardType::Merchant => &self.merchant,
            CardType::Custom => &[],
        }
    }

    /// All catalog programs, excluding the default policy
    pub fn programs(&self) -> impl Iterator<Item = &Policy> {
        self.credit
            .iter()
            .chain(self.debit.iter())
            .chain(self.merchant.iter())
    }

    /// Find a program by exact id
    pub fn find(&self, card_id: &str) -> Option<&Policy> {
        self.programs().find(|p| p.id == card_id)
    }

    /// Look up the policy for a card id, falling back to the default policy.
    pub fn lookup(&self, card_id: &str) -> &Policy {
        self.find(card_id).unwrap_or(&self.default)
    }

    /// Look up within one card type first, then across the whole catalog
    pub fn lookup_in(&self, card_id: &str, card_type: CardType) -> &Policy {
        self.of_type(card_type)
            .iter()
            .find(|p| p.id == card_id)
            .unwrap_or_else(|| self.lookup(card_id))
    }
}

impl Default for PolicyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = PolicyCatalog::builtin();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.programs().count(), 6);
    }

    #[test]
    fn test_lookup_known_card() {
        let catalog = PolicyCatalog::builtin();
        let gold = catalog.lookup("gold-credit");
        assert_eq!(gold.interest_rate_monthly, dec!(10));
        assert_eq!(gold.max_yearly_loans, dec!(2000));
        assert_eq!(gold.card_type, CardType::Credit);
    }

    #[test]
    fn test_lookup_unknown_falls_back_to_default() {
        let catalog = PolicyCatalog::builtin();
        let policy = catalog.lookup("42");
        assert_eq!(policy.id, "default");
        assert_eq!(policy.interest_rate_monthly, dec!(15));
        assert_eq!(policy.max_yearly_loans, dec!(1000));
        assert_eq!(policy.min_interest_days, 5);
    }

    #[test]
    fn test_lookup_in_type_then_global() {
        let catalog = PolicyCatalog::builtin();
        // Wrong type hint still finds the program globally
        let policy = catalog.lookup_in("merchant-pro", CardType::Debit);
        assert_eq!(policy.id, "merchant-pro");
        assert_eq!(catalog.lookup_in("nope", CardType::Credit).id, "default");
    }

    #[test]
    fn test_catalog_partial_json_uses_default_policy() {
        let json = r#"{
            "credit": [{
                "id": "test-credit",
                "name": "Test",
                "type": "credit",
                "annual_fee": "0",
                "interest_rate_monthly": "10",
                "transaction_fee": "0",
                "max_yearly_loans": "1000",
                "min_interest_days": 5
            }]
        }"#;
        let catalog = PolicyCatalog::from_json(json).unwrap();
        assert_eq!(catalog.lookup("test-credit").max_yearly_loans, dec!(1000));
        assert_eq!(catalog.default.id, "default");
        assert!(catalog.debit.is_empty());
    }

    #[test]
    fn test_catalog_rejects_zero_min_days() {
        let mut catalog = PolicyCatalog::builtin();
        catalog.credit[0].min_interest_days = 0;
        assert!(matches!(
            catalog.validate(),
            Err(CoreError::InvalidPolicy { .. })
        ));
    }

    #[test]
    fn test_catalog_rejects_out_of_range_terms_and_rates() {
        let mut catalog = PolicyCatalog::builtin();
        catalog.debit[0].min_interest_days = MAX_LOAN_DAYS + 1;
        assert!(matches!(
            catalog.validate(),
            Err(CoreError::InvalidPolicy { .. })
        ));

        let mut catalog = PolicyCatalog::builtin();
        catalog.default.interest_rate_monthly = dec!(100.5);
        assert!(matches!(
            catalog.validate(),
            Err(CoreError::InvalidPolicy { id, .. }) if id == "default"
        ));
    }

    #[test]
    fn test_catalog_rejects_duplicate_ids() {
        let mut catalog = PolicyCatalog::builtin();
        let dup = catalog.credit[0].clone();
        catalog.merchant.push(dup);
        assert!(matches!(
            catalog.validate(),
            Err(CoreError::DuplicatePolicy(id)) if id == "platinum-credit"
        ));
    }

    #[test]
    fn test_catalog_json_roundtrip_keeps_type_field() {
        let catalog = PolicyCatalog::builtin();
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.contains(r#""type":"credit""#));
        let parsed = PolicyCatalog::from_json(&json).unwrap();
        assert_eq!(parsed, catalog);
    }
}
