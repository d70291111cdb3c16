//! Card grant commands

use anyhow::{Context, Result};
use rcard_business::{CardGrantRequest, RcardApi};

use crate::app;
use crate::CardAction;

pub async fn handle(api: &RcardApi, action: &CardAction) -> Result<()> {
    match action {
        CardAction::Apply {
            card_id,
            identifier,
            r#type,
            auth,
        } => {
            let session = app::login(api, auth).await?;
            let request = CardGrantRequest {
                id: card_id.clone(),
                card_identifier: identifier.clone(),
                card_type: r#type.to_core_type().as_str().to_string(),
            };
            let grant = api
                .apply_card(&session, request)
                .await
                .context("Card application failed")?;
            let policy = api.context().catalog().lookup(&grant.id);
            println!("Granted card {} ({})", grant.id, grant.card_type);
            println!("   Policy: {}", policy);
        }
        CardAction::List { auth } => {
            let session = app::login(api, auth).await?;
            let cards = api.list_cards(&session).await?;
            if cards.is_empty() {
                println!("No cards");
            }
            for card in cards {
                println!(
                    "{:<18} {:<20} {:<9} {}",
                    card.id,
                    card.card_identifier,
                    card.card_type,
                    card.applied_at.format("%Y-%m-%d")
                );
            }
        }
    }
    Ok(())
}
