//! Sponsor card programs
//!
//! Organizations publish card specs layered over a catalog policy.

use crate::error::{BusinessError, BusinessResult};
use crate::services::{ServiceContext, SYSTEM_USER_ID};
use rcard_core::{EventType, Policy, SponsorCard, SponsorCardSpec};
use rcard_persistence::SponsorCardRepo;
use tracing::{info, warn};
use uuid::Uuid;

pub struct SponsorService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> SponsorService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Publish a card. A public identifier is generated when the spec has none.
    pub async fn create(&self, org_id: &str, spec: SponsorCardSpec) -> BusinessResult<SponsorCard> {
        let org_id = org_id.trim();
        if org_id.is_empty() {
            return Err(BusinessError::InvalidInput("organization id is required".to_string()));
        }
        if spec.name.trim().is_empty() {
            return Err(BusinessError::InvalidInput("card name is required".to_string()));
        }
        if let Some(min_days) = spec.min_interest_days {
            if min_days == 0 {
                return Err(BusinessError::InvalidInput(
                    "min_interest_days must be at least 1".to_string(),
                ));
            }
        }

        let public_identifier = match spec.public_identifier.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("pub_{}", Uuid::new_v4().simple()),
        };

        let card = SponsorCard {
            id: format!("card_{}", Uuid::new_v4().simple()),
            org_id: org_id.to_string(),
            public_identifier,
            spec,
            created_at: self.ctx.now(),
        };

        // the merged policy must itself be valid
        card.effective_policy(self.ctx.catalog()).validate()?;

        SponsorCardRepo::insert(self.ctx.pool(), &card)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    warn!(org_id, public_id = %card.public_identifier, "sponsor card rejected: public id taken");
                    BusinessError::DuplicateCard(card.public_identifier.clone())
                } else {
                    e.into()
                }
            })?;

        info!(org_id, card_id = %card.id, public_id = %card.public_identifier, "sponsor card created");
        self.ctx.record(
            &self
                .ctx
                .event(EventType::SponsorCardCreated, SYSTEM_USER_ID)
                .with_card(&card.public_identifier)
                .with_description(org_id),
        );

        Ok(card)
    }

    pub async fn get_by_public_id(&self, public_identifier: &str) -> BusinessResult<SponsorCard> {
        SponsorCardRepo::get_by_public_id(self.ctx.pool(), public_identifier)
            .await?
            .ok_or_else(|| BusinessError::CardNotFound(public_identifier.to_string()))
    }

    pub async fn list_by_org(&self, org_id: &str) -> BusinessResult<Vec<SponsorCard>> {
        Ok(SponsorCardRepo::list_by_org(self.ctx.pool(), org_id).await?)
    }

    pub async fn delete(&self, org_id: &str, card_id: &str) -> BusinessResult<()> {
        SponsorCardRepo::delete(self.ctx.pool(), org_id, card_id)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    BusinessError::CardNotFound(card_id.to_string())
                } else {
                    e.into()
                }
            })?;
        info!(org_id, card_id, "sponsor card deleted");
        Ok(())
    }

    /// Catalog policy merged with the card's overrides
    pub async fn effective_policy(&self, public_identifier: &str) -> BusinessResult<Policy> {
        let card = self.get_by_public_id(public_identifier).await?;
        Ok(card.effective_policy(self.ctx.catalog()))
    }
}
