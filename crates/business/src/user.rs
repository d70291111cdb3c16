//! User accounts and card grants
//!
//! Registration, login, and the cards a user holds.

use crate::auth::Principal;
use crate::error::{BusinessError, BusinessResult};
use crate::rate_limit::RateAction;
use crate::services::ServiceContext;
use rcard_core::user::{USERNAME_MAX_LEN, USERNAME_MIN_LEN};
use rcard_core::{CardGrant, EventType, User, UserId, CENTRAL_WALLET};
use rcard_persistence::{load_user, BalanceRepo, CardGrantRepo, UserRepo};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Card application submitted by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardGrantRequest {
    /// Policy or sponsor card id
    pub id: String,
    pub card_identifier: String,
    pub card_type: String,
}

/// User Service - registration, login, cards
pub struct UserService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new user with the configured starting wallet balance
    pub async fn register(&self, username: &str, password: &str) -> BusinessResult<User> {
        let username = username.trim();
        if !User::is_valid_username(username) {
            return Err(BusinessError::InvalidInput(format!(
                "username must be {}-{} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            )));
        }
        let min_len = self.ctx.config().min_password_len;
        if password.chars().count() < min_len {
            return Err(BusinessError::InvalidInput(format!(
                "password must be at least {} characters",
                min_len
            )));
        }

        if UserRepo::get_by_username(self.ctx.pool(), username).await?.is_some() {
            warn!(username, "registration rejected: username taken");
            return Err(BusinessError::UsernameTaken(username.to_string()));
        }

        let now = self.ctx.now();
        let password_hash = self.ctx.hasher().hash(password);
        let initial = self.ctx.config().initial_wallet_balance;

        let mut tx = self.ctx.pool().begin().await?;
        let user_id = UserRepo::insert(&mut *tx, username, &password_hash, now)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    BusinessError::UsernameTaken(username.to_string())
                } else {
                    e.into()
                }
            })?;
        BalanceRepo::set(&mut *tx, user_id, CENTRAL_WALLET, initial, now).await?;
        tx.commit().await?;

        info!(user_id, username, "user registered");
        self.ctx
            .record(&self.ctx.event(EventType::UserRegistered, user_id).with_amount(initial));

        self.get_user(user_id).await
    }

    /// Check credentials. Attempts are rate limited per username.
    pub async fn authenticate(&self, username: &str, password: &str) -> BusinessResult<Principal> {
        let username = username.trim();
        self.ctx.rate_limit(username, RateAction::Login)?;

        let row = UserRepo::get_by_username(self.ctx.pool(), username).await?;
        let row = match row {
            Some(row) if self.ctx.hasher().verify(password, &row.password_hash) => row,
            _ => {
                warn!(username, "login failed");
                return Err(BusinessError::InvalidCredentials);
            }
        };

        UserRepo::update_last_login(self.ctx.pool(), row.id, self.ctx.now()).await?;
        self.ctx.limiter().reset(username, RateAction::Login);

        info!(user_id = row.id, username, "user logged in");
        self.ctx.record(&self.ctx.event(EventType::UserLoggedIn, row.id));

        Ok(Principal {
            user_id: row.id,
            username: row.username,
        })
    }

    /// Full user document (cards and balances included)
    pub async fn get_user(&self, user_id: UserId) -> BusinessResult<User> {
        let mut conn = self.ctx.pool().acquire().await?;
        load_user(&mut conn, user_id)
            .await?
            .ok_or(BusinessError::UserNotFound(user_id))
    }

    /// Grant a card to a user. A user holds each card id at most once.
    pub async fn grant_card(
        &self,
        user_id: UserId,
        request: CardGrantRequest,
    ) -> BusinessResult<CardGrant> {
        let id = request.id.trim();
        let card_identifier = request.card_identifier.trim();
        if id.is_empty() || card_identifier.is_empty() {
            return Err(BusinessError::InvalidInput(
                "card id and card identifier are required".to_string(),
            ));
        }

        let _guard = self.ctx.lock_user(user_id).await;
        let user = self.get_user(user_id).await?;
        if user.has_card(id) {
            warn!(user_id, card_id = id, "card grant rejected: already held");
            return Err(BusinessError::DuplicateCard(id.to_string()));
        }

        let grant = CardGrant {
            id: id.to_string(),
            card_identifier: card_identifier.to_string(),
            card_type: request.card_type.trim().to_string(),
            applied_at: self.ctx.now(),
        };
        CardGrantRepo::insert(self.ctx.pool(), user_id, &grant)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    BusinessError::DuplicateCard(grant.id.clone())
                } else {
                    e.into()
                }
            })?;

        info!(user_id, card_id = %grant.id, card_type = %grant.card_type, "card granted");
        self.ctx
            .record(&self.ctx.event(EventType::CardGranted, user_id).with_card(&grant.id));

        Ok(grant)
    }

    /// Cards in the order they were granted
    pub async fn list_cards(&self, user_id: UserId) -> BusinessResult<Vec<CardGrant>> {
        self.ctx.ensure_user(self.ctx.pool(), user_id).await?;
        Ok(CardGrantRepo::list_by_user(self.ctx.pool(), user_id).await?)
    }
}
