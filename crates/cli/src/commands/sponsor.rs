//! Sponsor card program commands

use anyhow::Result;
use rcard_business::{RcardApi, SponsorService};
use rcard_core::SponsorCardSpec;
use serde_json::json;

use super::print_json;
use crate::SponsorAction;

pub async fn handle(api: &RcardApi, action: &SponsorAction) -> Result<()> {
    let sponsors = SponsorService::new(api.context());

    match action {
        SponsorAction::Create {
            org,
            name,
            policy,
            public_id,
            annual_fee,
            rate,
            cap,
            min_days,
            description,
        } => {
            let spec = SponsorCardSpec {
                name: name.clone(),
                policy_id: policy.clone(),
                public_identifier: public_id.clone(),
                annual_fee: *annual_fee,
                interest_rate_monthly: *rate,
                max_yearly_loans: *cap,
                min_interest_days: *min_days,
                description: description.clone(),
                ..SponsorCardSpec::default()
            };
            let card = sponsors.create(org, spec).await?;
            println!("Created sponsor card {} (public id {})", card.id, card.public_identifier);
        }
        SponsorAction::Show { public_id } => {
            let card = sponsors.get_by_public_id(public_id).await?;
            let policy = card.effective_policy(api.context().catalog());
            print_json(&json!({ "card": card, "effective_policy": policy }))?;
        }
        SponsorAction::List { org } => {
            for card in sponsors.list_by_org(org).await? {
                println!("{:<38} {:<24} {}", card.id, card.public_identifier, card.spec.name);
            }
        }
        SponsorAction::Delete { org, card_id } => {
            sponsors.delete(org, card_id).await?;
            println!("Deleted sponsor card {}", card_id);
        }
    }
    Ok(())
}
