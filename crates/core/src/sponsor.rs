//! # Sponsor Module
//!
//! Sponsor-defined card programs. A sponsor (organization) publishes a card
//! spec that overrides fields of a base catalog policy.

use crate::policy::{CardType, Policy, PolicyCatalog};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Card spec submitted by a sponsor. Unset fields inherit from the base policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorCardSpec {
    pub name: String,
    /// Base catalog policy ("default" when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<CardType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate_monthly: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_yearly_loans: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interest_days: Option<u32>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand_primary: String,
    #[serde(default)]
    pub brand_secondary: String,
    #[serde(default)]
    pub benefit_key: String,
    #[serde(default)]
    pub hero_title: String,
    #[serde(default)]
    pub hero_subtitle: String,
}

/// A published sponsor card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorCard {
    /// Internal id (`card_<uuid>`)
    pub id: String,
    pub org_id: String,
    pub public_identifier: String,
    pub spec: SponsorCardSpec,
    pub created_at: DateTime<Utc>,
}

fn override_text(target: &mut String, value: &str) {
    if !value.trim().is_empty() {
        *target = value.to_string();
    }
}

impl SponsorCard {
    /// Base policy id this card builds on
    pub fn base_policy_id(&self) -> &str {
        self.spec.policy_id.as_deref().unwrap_or("default")
    }

    /// Base policy merged with this card's overrides
    pub fn effective_policy(&self, catalog: &PolicyCatalog) -> Policy {
        let mut policy = catalog.lookup(self.base_policy_id()).clone();
        let spec = &self.spec;

        policy.id = self.public_identifier.clone();
        override_text(&mut policy.name, &spec.name);
        override_text(&mut policy.description, &spec.description);
        override_text(&mut policy.brand_primary, &spec.brand_primary);
        override_text(&mut policy.brand_secondary, &spec.brand_secondary);
        override_text(&mut policy.benefit_key, &spec.benefit_key);

        if let Some(card_type) = spec.card_type {
            policy.card_type = card_type;
        }
        if let Some(fee) = spec.annual_fee {
            policy.annual_fee = fee;
        }
        if let Some(rate) = spec.interest_rate_monthly {
            policy.interest_rate_monthly = rate;
        }
        if let Some(fee) = spec.transaction_fee {
            policy.transaction_fee = fee;
        }
        if let Some(cap) = spec.max_yearly_loans {
            policy.max_yearly_loans = cap;
        }
        if let Some(days) = spec.min_interest_days {
            policy.min_interest_days = days;
        }
        policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn card(spec: SponsorCardSpec) -> SponsorCard {
        SponsorCard {
            id: "card_1".to_string(),
            org_id: "org_9".to_string(),
            public_identifier: "elite_titanium".to_string(),
            spec,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_policy_overrides() {
        let catalog = PolicyCatalog::builtin();
        let sponsor = card(SponsorCardSpec {
            name: "Elite Titanium Card".to_string(),
            interest_rate_monthly: Some(dec!(15)),
            max_yearly_loans: Some(dec!(10000)),
            ..Default::default()
        });

        let policy = sponsor.effective_policy(&catalog);
        assert_eq!(policy.id, "elite_titanium");
        assert_eq!(policy.name, "Elite Titanium Card");
        assert_eq!(policy.interest_rate_monthly, dec!(15));
        assert_eq!(policy.max_yearly_loans, dec!(10000));
        // Inherited from the default policy
        assert_eq!(policy.transaction_fee, dec!(5));
        assert_eq!(policy.min_interest_days, 5);
    }

    #[test]
    fn test_effective_policy_uses_named_base() {
        let catalog = PolicyCatalog::builtin();
        let sponsor = card(SponsorCardSpec {
            policy_id: Some("gold-credit".to_string()),
            ..Default::default()
        });

        let policy = sponsor.effective_policy(&catalog);
        assert_eq!(policy.name, "Gold Credit Card");
        assert_eq!(policy.card_type, CardType::Credit);
        assert_eq!(policy.max_yearly_loans, dec!(2000));
    }
}
